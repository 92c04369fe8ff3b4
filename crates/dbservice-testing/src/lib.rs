//! # dbservice-testing
//!
//! A scriptable in-memory [`Driver`] for exercising [`dbservice`] without a
//! database.
//!
//! [`MockDriver`] is cheaply cloneable; keep one clone in the test to adjust
//! behavior at runtime and to read its counters after handing the other to a
//! [`Database`](dbservice::Database).
//!
//! ## Statement behavior
//!
//! | Statement | Result |
//! |-----------|--------|
//! | starts with `FAIL` | [`Error::Query`] with code `MOCK-0001` |
//! | starts with `SELECT` / `WITH` | one row: column `value`, the first bound parameter (or `1`) |
//! | anything else | one row affected |
//!
//! ## Example
//!
//! ```rust,ignore
//! use dbservice::{Config, Database};
//! use dbservice_testing::MockDriver;
//! use std::time::Duration;
//!
//! let driver = MockDriver::new().connect_delay(Duration::from_millis(50));
//! let db = Database::new(driver.clone(), Config::new().database("mock"));
//!
//! db.ensure_initialized().await?;
//! assert_eq!(driver.open_sessions(), 2);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dbservice::{
    Column, Config, Driver, DriverConnection, Error, ExecOptions, KillHandle, Params, QueryResult,
    Result,
};
use dbservice_types::SqlValue;
use parking_lot::Mutex;
use tokio::sync::Notify;

/// Adjustable behavior shared by the driver and its sessions.
#[derive(Debug, Clone, Default)]
struct Behavior {
    connect_delay: Duration,
    connect_error: Option<Error>,
    statement_delay: Duration,
    fail_ping: bool,
}

#[derive(Debug, Default)]
struct MockState {
    behavior: Mutex<Behavior>,
    connects: AtomicU64,
    failed_connects: AtomicU64,
    open_sessions: AtomicI64,
    statements: AtomicU64,
    pings: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
    executed: Mutex<Vec<(String, Params)>>,
}

/// An in-memory driver with scripted latency and failures.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    state: Arc<MockState>,
}

impl MockDriver {
    /// Create a driver that connects and answers instantly.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every connection attempt.
    #[must_use]
    pub fn connect_delay(self, delay: Duration) -> Self {
        self.state.behavior.lock().connect_delay = delay;
        self
    }

    /// Fail every connection attempt with `error`.
    #[must_use]
    pub fn fail_connect(self, error: Error) -> Self {
        self.set_connect_error(Some(error));
        self
    }

    /// Delay every statement.
    #[must_use]
    pub fn statement_delay(self, delay: Duration) -> Self {
        self.set_statement_delay(delay);
        self
    }

    /// Change the connection failure at runtime; `None` lets connects succeed.
    pub fn set_connect_error(&self, error: Option<Error>) {
        self.state.behavior.lock().connect_error = error;
    }

    /// Change the statement delay at runtime.
    pub fn set_statement_delay(&self, delay: Duration) {
        self.state.behavior.lock().statement_delay = delay;
    }

    /// Make pings fail with a connectivity error.
    pub fn set_fail_ping(&self, fail: bool) {
        self.state.behavior.lock().fail_ping = fail;
    }

    /// Successful connection attempts.
    #[must_use]
    pub fn connects(&self) -> u64 {
        self.state.connects.load(Ordering::SeqCst)
    }

    /// Failed connection attempts.
    #[must_use]
    pub fn failed_connects(&self) -> u64 {
        self.state.failed_connects.load(Ordering::SeqCst)
    }

    /// Sessions opened and not yet closed (dropped or killed).
    #[must_use]
    pub fn open_sessions(&self) -> i64 {
        self.state.open_sessions.load(Ordering::SeqCst)
    }

    /// Statements started, including failed and cancelled ones.
    #[must_use]
    pub fn statements(&self) -> u64 {
        self.state.statements.load(Ordering::SeqCst)
    }

    /// Pings received.
    #[must_use]
    pub fn pings(&self) -> u64 {
        self.state.pings.load(Ordering::SeqCst)
    }

    /// Commits that ended an open transaction.
    #[must_use]
    pub fn commits(&self) -> u64 {
        self.state.commits.load(Ordering::SeqCst)
    }

    /// Rollbacks that ended an open transaction.
    #[must_use]
    pub fn rollbacks(&self) -> u64 {
        self.state.rollbacks.load(Ordering::SeqCst)
    }

    /// Statements that completed, with their parameters, in order.
    #[must_use]
    pub fn executed(&self) -> Vec<(String, Params)> {
        self.state.executed.lock().clone()
    }

    fn behavior(&self) -> Behavior {
        self.state.behavior.lock().clone()
    }
}

#[async_trait]
impl Driver for MockDriver {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn connect(&self, config: &Config) -> Result<Box<dyn DriverConnection>> {
        let behavior = self.behavior();
        if !behavior.connect_delay.is_zero() {
            tokio::time::sleep(behavior.connect_delay).await;
        }

        if let Some(err) = behavior.connect_error {
            self.state.failed_connects.fetch_add(1, Ordering::SeqCst);
            return Err(err);
        }

        self.state.connects.fetch_add(1, Ordering::SeqCst);
        self.state.open_sessions.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(endpoint = %config.endpoint(), "mock session opened");

        Ok(Box::new(MockConnection {
            state: Arc::clone(&self.state),
            session: Arc::new(MockSession::default()),
            in_transaction: false,
            in_flight: AtomicBool::new(false),
        }))
    }
}

/// Open/closed flag of one session, shared with its kill handle.
#[derive(Debug, Default)]
struct MockSession {
    closed: AtomicBool,
    killed: Notify,
}

impl MockSession {
    /// Mark the session closed; true only for the first caller.
    fn close(&self, state: &MockState) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        state.open_sessions.fetch_sub(1, Ordering::SeqCst);
        true
    }

    fn check(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::connectivity("mock session was terminated"));
        }
        Ok(())
    }
}

/// One mock session.
#[derive(Debug)]
pub struct MockConnection {
    state: Arc<MockState>,
    session: Arc<MockSession>,
    in_transaction: bool,
    /// Set while a statement is running; left set if the caller gave up.
    in_flight: AtomicBool,
}

impl MockConnection {
    /// Sleep for `delay`, failing early if the session is killed.
    async fn pause(&self, delay: Duration) -> Result<()> {
        let killed = self.session.killed.notified();
        tokio::pin!(killed);
        killed.as_mut().enable();
        self.session.check()?;

        if delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            () = tokio::time::sleep(delay) => Ok(()),
            () = &mut killed => self.session.check(),
        }
    }

    fn end_transaction(&mut self, counter: &AtomicU64) {
        if self.in_transaction {
            self.in_transaction = false;
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl DriverConnection for MockConnection {
    async fn execute(
        &mut self,
        sql: &str,
        params: &Params,
        options: &ExecOptions,
    ) -> Result<QueryResult> {
        self.state.statements.fetch_add(1, Ordering::SeqCst);
        let delay = self.state.behavior.lock().statement_delay;

        self.in_flight.store(true, Ordering::SeqCst);
        let paused = self.pause(delay).await;
        self.in_flight.store(false, Ordering::SeqCst);
        paused?;

        let keyword = sql
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();

        if keyword == "FAIL" {
            return Err(Error::query(
                Some("MOCK-0001".into()),
                format!("statement rejected: {sql}"),
            ));
        }

        if !options.auto_commit {
            self.in_transaction = true;
        }
        self.state
            .executed
            .lock()
            .push((sql.to_string(), params.clone()));

        if keyword == "SELECT" || keyword == "WITH" {
            let value = match params {
                Params::Positional(values) => values.first().cloned(),
                Params::Named(pairs) => pairs.first().map(|(_, v)| v.clone()),
                Params::None => None,
            }
            .unwrap_or(SqlValue::Int(1));

            return Ok(QueryResult::new(
                vec![Column::new("value", 0, Some(value.type_name().to_string()))],
                vec![vec![value]],
                0,
            ));
        }

        Ok(QueryResult::affected(1))
    }

    async fn ping(&mut self) -> Result<()> {
        self.state.pings.fetch_add(1, Ordering::SeqCst);
        self.session.check()?;
        if self.state.behavior.lock().fail_ping {
            return Err(Error::connectivity("mock server stopped answering"));
        }
        Ok(())
    }

    async fn begin(&mut self) -> Result<()> {
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let state = Arc::clone(&self.state);
        self.end_transaction(&state.commits);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        let state = Arc::clone(&self.state);
        self.end_transaction(&state.rollbacks);
        Ok(())
    }

    fn is_broken(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) || self.session.closed.load(Ordering::SeqCst)
    }

    fn kill_handle(&self) -> Option<KillHandle> {
        let state = Arc::clone(&self.state);
        let session = Arc::clone(&self.session);
        Some(KillHandle::new(move || {
            if session.close(&state) {
                session.killed.notify_waiters();
                tracing::trace!("mock session killed");
            }
        }))
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.session.close(&self.state);
    }
}
