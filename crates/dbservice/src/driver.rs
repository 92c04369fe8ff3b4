//! The seam between the service and a concrete database backend.
//!
//! A backend implements [`Driver`] (how to open a session and shape
//! vendor-specific SQL) and [`DriverConnection`] (one open session). The
//! service never speaks a wire protocol itself.

use std::sync::Arc;

use async_trait::async_trait;
use dbservice_pool::{BoxError, ConnectionLifecycle, HealthCheckResult, KillHandle};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::query::Params;
use crate::row::QueryResult;

/// Per-statement execution options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOptions {
    /// Commit right after the statement unless an explicit transaction is open.
    pub auto_commit: bool,
    /// Cap on fetched rows. Zero means no cap.
    pub max_rows: usize,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            auto_commit: true,
            max_rows: 0,
        }
    }
}

/// A database backend.
#[async_trait]
pub trait Driver: Send + Sync + 'static {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Open one physical session.
    ///
    /// Unreachable hosts and rejected logins are [`Error::Connectivity`];
    /// unusable settings are [`Error::Config`].
    async fn connect(&self, config: &Config) -> Result<Box<dyn DriverConnection>>;

    /// Wrap `sql` so that it returns one page of rows.
    fn paginate(&self, sql: &str, limit: u64, offset: u64) -> String {
        format!("SELECT * FROM ({sql}) paged LIMIT {limit} OFFSET {offset}")
    }

    /// Wrap `sql` so that it returns its row count in a single column.
    fn count(&self, sql: &str) -> String {
        format!("SELECT COUNT(*) AS total FROM ({sql}) counted")
    }
}

/// One open database session.
///
/// Statements on one session run in the order issued. Outside an explicit
/// transaction each statement with `auto_commit` set commits on its own; a
/// statement with `auto_commit` cleared leaves its work pending until
/// [`commit`](Self::commit) or [`rollback`](Self::rollback).
#[async_trait]
pub trait DriverConnection: Send {
    /// Run one statement with bound parameters.
    ///
    /// Rejected statements are [`Error::Query`]; a lost session is
    /// [`Error::Connectivity`] and should also make
    /// [`is_broken`](Self::is_broken) return `true`.
    async fn execute(
        &mut self,
        sql: &str,
        params: &Params,
        options: &ExecOptions,
    ) -> Result<QueryResult>;

    /// Trivial round trip that touches no schema.
    async fn ping(&mut self) -> Result<()>;

    /// Open an explicit transaction.
    async fn begin(&mut self) -> Result<()>;

    /// Commit pending work.
    async fn commit(&mut self) -> Result<()>;

    /// Discard pending work.
    async fn rollback(&mut self) -> Result<()>;

    /// Clear session state before the session is reused by another lease.
    async fn reset(&mut self) -> Result<()> {
        self.rollback().await
    }

    /// Whether the session is known to be unusable.
    fn is_broken(&self) -> bool {
        false
    }

    /// A handle that terminates this session from another task.
    ///
    /// Firing it must abort a running statement (which then fails with
    /// [`Error::Connectivity`]), close the physical session, and make
    /// [`is_broken`](Self::is_broken) return `true`. The service fires it
    /// for leases still held when a close outlasts its grace period.
    fn kill_handle(&self) -> Option<KillHandle> {
        None
    }

    /// Close the session.
    async fn close(self: Box<Self>) {}
}

/// Adapts a [`Driver`] to the pool's lifecycle hooks.
pub(crate) struct DriverLifecycle {
    driver: Arc<dyn Driver>,
    config: Arc<Config>,
}

impl DriverLifecycle {
    pub(crate) fn new(driver: Arc<dyn Driver>, config: Arc<Config>) -> Self {
        Self { driver, config }
    }

    async fn open(&self) -> Result<Box<dyn DriverConnection>> {
        let connect = self.driver.connect(&self.config);
        let mut conn = tokio::time::timeout(self.config.connect_timeout, connect)
            .await
            .map_err(|_| {
                Error::connectivity(format!(
                    "connecting to {} timed out after {:?}",
                    self.config.endpoint(),
                    self.config.connect_timeout
                ))
            })??;

        for sql in &self.config.session_init {
            if let Err(e) = conn
                .execute(sql, &Params::None, &ExecOptions::default())
                .await
            {
                tracing::warn!(
                    driver = self.driver.name(),
                    statement = %sql,
                    error = %e,
                    "session initialization statement failed (ignoring)"
                );
            }
        }

        Ok(conn)
    }
}

#[async_trait]
impl ConnectionLifecycle for DriverLifecycle {
    type Connection = Box<dyn DriverConnection>;

    async fn connect(&self) -> std::result::Result<Self::Connection, BoxError> {
        self.open().await.map_err(|e| Box::new(e) as BoxError)
    }

    async fn health_check(&self, conn: &mut Self::Connection) -> HealthCheckResult {
        match conn.ping().await {
            Ok(()) => HealthCheckResult::Healthy,
            Err(e) => HealthCheckResult::Unhealthy(e.to_string()),
        }
    }

    async fn reset(&self, conn: &mut Self::Connection) -> std::result::Result<(), BoxError> {
        conn.reset().await.map_err(|e| Box::new(e) as BoxError)
    }

    fn is_broken(&self, conn: &Self::Connection) -> bool {
        conn.is_broken()
    }

    fn kill_handle(&self, conn: &Self::Connection) -> Option<KillHandle> {
        conn.kill_handle()
    }

    async fn close(&self, conn: Self::Connection) {
        conn.close().await;
    }
}
