//! The database service: lifecycle control plus query execution.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dbservice_pool::{CloseReport, Pool, PoolMetrics, PoolStatus};
use dbservice_types::ToSql;
use parking_lot::Mutex;
use tokio::sync::{Notify, watch};

use crate::config::Config;
use crate::connection::Connection;
use crate::driver::{Driver, DriverLifecycle};
use crate::error::{Error, Result};
use crate::query::{Params, Query};
use crate::row::{Page, QueryResult};
use crate::state::LifecycleState;

/// Outcome published to callers waiting on an in-flight initialization.
type InitOutcome = Option<Result<()>>;

#[derive(Clone)]
struct ReadyPool {
    pool: Pool<DriverLifecycle>,
    config: Arc<Config>,
}

enum Slot {
    Uninitialized,
    Initializing(watch::Receiver<InitOutcome>),
    Ready(ReadyPool),
    Closing(ReadyPool),
    Closed,
    Failed(Error),
}

impl Slot {
    fn state(&self) -> LifecycleState {
        match self {
            Self::Uninitialized => LifecycleState::Uninitialized,
            Self::Initializing(_) => LifecycleState::Initializing,
            Self::Ready(_) => LifecycleState::Ready,
            Self::Closing(_) => LifecycleState::Closing,
            Self::Closed => LifecycleState::Closed,
            Self::Failed(_) => LifecycleState::Failed,
        }
    }
}

struct DatabaseInner {
    driver: Arc<dyn Driver>,
    /// Configuration used by the next initialization.
    config: Mutex<Arc<Config>>,
    slot: Mutex<Slot>,
    /// Signalled on every slot transition.
    state_changed: Notify,
    pools_created: AtomicU64,
    init_attempts: AtomicU64,
}

impl DatabaseInner {
    fn set_slot(&self, next: Slot) {
        let previous = std::mem::replace(&mut *self.slot.lock(), next);
        drop(previous);
        self.state_changed.notify_waiters();
    }
}

/// A pooled database service.
///
/// `Database` is an explicitly constructed handle; clones share one pool and
/// one lifecycle, while separately constructed instances are fully isolated.
///
/// # Lifecycle
///
/// - [`initialize`](Self::initialize) / [`ensure_initialized`](Self::ensure_initialized)
///   build the pool exactly once; concurrent callers wait for the same
///   attempt and observe the same outcome.
/// - [`execute_query`](Self::execute_query) initializes on first use when
///   [`Config::lazy_init`] is set and the service has never been initialized.
///   After [`close`](Self::close) it fails with [`Error::Lifecycle`] until the
///   service is explicitly initialized again.
/// - [`close`](Self::close) drains leases for [`Config::close_grace`], then
///   terminates the rest.
///
/// # Example
///
/// ```rust,ignore
/// let db = Database::new(SqliteDriver::new(), Config::from_env()?);
/// db.ensure_initialized().await?;
///
/// let result = db
///     .execute_query("SELECT name FROM users WHERE id = ?", &[&42])
///     .await?;
/// for row in &result {
///     let name: String = row.get_by_name("name")?;
///     println!("User: {name}");
/// }
///
/// db.close().await;
/// ```
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

/// Snapshot of the service for health endpoints.
#[derive(Debug, Clone)]
pub struct ServiceStatus {
    /// Current lifecycle state.
    pub state: LifecycleState,
    /// Pool occupancy while the pool exists.
    pub pool: Option<PoolStatus>,
    /// Failure of the last initialization attempt, while in `Failed`.
    pub last_error: Option<Error>,
}

impl ServiceStatus {
    /// Whether the service accepts statements.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == LifecycleState::Ready
    }
}

/// Result of a connectivity probe.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    /// Whether a round trip succeeded.
    pub reachable: bool,
    /// Round-trip time, including lease acquisition.
    pub latency: Option<Duration>,
    /// Classified failure when unreachable.
    pub error: Option<Error>,
}

enum InitStep {
    Build(watch::Sender<InitOutcome>),
    Join(watch::Receiver<InitOutcome>),
    AwaitClose,
}

enum CloseStep {
    Close(ReadyPool),
    AwaitInit(watch::Receiver<InitOutcome>),
    AwaitClose,
}

/// Puts the service back to `Uninitialized` if an initializing future is
/// dropped before it publishes an outcome.
struct InitGuard<'a> {
    inner: &'a DatabaseInner,
    armed: bool,
}

impl Drop for InitGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut slot = self.inner.slot.lock();
        if matches!(*slot, Slot::Initializing(_)) {
            *slot = Slot::Uninitialized;
            drop(slot);
            self.inner.state_changed.notify_waiters();
            tracing::warn!("initialization cancelled before completion");
        }
    }
}

/// Moves the service to `Closed` once closing ends, even if the closing
/// future is dropped during the drain.
struct ClosingGuard<'a> {
    inner: &'a DatabaseInner,
}

impl Drop for ClosingGuard<'_> {
    fn drop(&mut self) {
        self.inner.set_slot(Slot::Closed);
    }
}

impl Database {
    /// Create an uninitialized service around a driver.
    pub fn new<D: Driver>(driver: D, config: Config) -> Self {
        Self::with_driver(Arc::new(driver), config)
    }

    /// Create an uninitialized service around a shared driver.
    pub fn with_driver(driver: Arc<dyn Driver>, config: Config) -> Self {
        Self {
            inner: Arc::new(DatabaseInner {
                driver,
                config: Mutex::new(Arc::new(config)),
                slot: Mutex::new(Slot::Uninitialized),
                state_changed: Notify::new(),
                pools_created: AtomicU64::new(0),
                init_attempts: AtomicU64::new(0),
            }),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.inner.slot.lock().state()
    }

    /// The configuration the service was (or will be) initialized with.
    #[must_use]
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.inner.config.lock())
    }

    /// Initialize the service with `config`.
    ///
    /// From `Uninitialized`, `Closed` or `Failed` this builds a new pool and
    /// checks connectivity. From `Ready` it returns immediately and `config`
    /// is ignored. While another caller is initializing it waits for that
    /// attempt and returns its outcome.
    ///
    /// Configuration and connectivity failures are returned as is; they are
    /// not retried.
    pub async fn initialize(&self, config: Config) -> Result<()> {
        self.start_or_join(Some(config), "initialize").await
    }

    /// Initialize with the stored configuration unless already `Ready`.
    pub async fn ensure_initialized(&self) -> Result<()> {
        self.start_or_join(None, "ensure_initialized").await
    }

    /// Close and re-initialize with the stored configuration.
    pub async fn reconnect(&self) -> Result<()> {
        tracing::info!("reconnecting database service");
        self.close().await;
        self.start_or_join(None, "reconnect").await
    }

    /// Whether a trivial round trip succeeds within the probe timeout.
    ///
    /// Never fails: every error, including calling it on a service that is
    /// not `Ready`, reports `false`.
    pub async fn test_connection(&self) -> bool {
        self.probe().await.reachable
    }

    /// Connectivity probe with the classified failure.
    ///
    /// Does not change the lifecycle state and does not initialize the
    /// service.
    pub async fn probe(&self) -> ProbeReport {
        let Some(ready) = self.ready_pool() else {
            return ProbeReport {
                reachable: false,
                latency: None,
                error: Some(Error::Lifecycle {
                    state: self.state(),
                    operation: "test_connection",
                }),
            };
        };

        match probe_pool(&ready.pool, ready.config.probe_timeout).await {
            Ok(latency) => {
                tracing::debug!(
                    latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                    "connectivity probe succeeded"
                );
                ProbeReport {
                    reachable: true,
                    latency: Some(latency),
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, kind = ?e.kind(), "connectivity probe failed");
                ProbeReport {
                    reachable: false,
                    latency: None,
                    error: Some(e),
                }
            }
        }
    }

    /// Lease a connection for multi-statement work.
    ///
    /// The lease ends when the [`Connection`] is dropped or passed to
    /// [`release`](Self::release).
    pub async fn get_connection(&self) -> Result<Connection> {
        self.lease("get_connection").await
    }

    /// Return a lease explicitly.
    ///
    /// Fails with [`Error::Pool`] for a connection leased from another
    /// service instance or one already terminated by [`close`](Self::close).
    /// The connection is returned to its own pool (or closed) either way.
    pub fn release(&self, conn: Connection) -> Result<()> {
        let pool = match &*self.inner.slot.lock() {
            Slot::Ready(ready) | Slot::Closing(ready) => Some(ready.pool.clone()),
            _ => None,
        };

        match pool {
            Some(pool) => pool
                .release(conn.into_pooled())
                .map_err(|e| Error::from_pool(e, "release")),
            None => Err(Error::Pool(format!(
                "connection {} is not leased from an open pool",
                conn.id()
            ))),
        }
    }

    /// Run a statement with positional parameters on a pooled connection.
    ///
    /// The connection is returned on every exit path. SELECT statements
    /// fill [`QueryResult::rows`]; DML reports
    /// [`QueryResult::rows_affected`].
    pub async fn execute_query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<QueryResult> {
        let params = Params::positional(params)?;
        self.execute(Query::with_params(sql, params)).await
    }

    /// Run a statement with named (`:name`) parameters.
    pub async fn execute_named(
        &self,
        sql: &str,
        params: &[(&str, &(dyn ToSql + Sync))],
    ) -> Result<QueryResult> {
        let params = Params::named(params)?;
        self.execute(Query::with_params(sql, params)).await
    }

    /// Run a prepared [`Query`].
    pub async fn execute(&self, query: Query) -> Result<QueryResult> {
        query.check()?;
        let mut conn = self.lease("execute_query").await?;
        conn.execute_query(&query).await
    }

    /// Run `queries` in one transaction on one connection.
    ///
    /// Commits when every statement succeeds; otherwise rolls back and
    /// returns the first failure.
    pub async fn execute_transaction(&self, queries: Vec<Query>) -> Result<Vec<QueryResult>> {
        for query in &queries {
            query.check()?;
        }

        let mut conn = self.lease("execute_transaction").await?;
        let mut tx = conn.begin().await?;
        let mut results = Vec::with_capacity(queries.len());

        for (index, query) in queries.iter().enumerate() {
            match tx.execute_query(query).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    if let Err(rollback_err) = tx.rollback().await {
                        tracing::warn!(error = %rollback_err, "rollback after failed statement failed");
                    }
                    tracing::warn!(
                        statement = index + 1,
                        error = %e,
                        "transaction rolled back"
                    );
                    return Err(e);
                }
            }
        }

        tx.commit().await?;
        tracing::debug!(statements = results.len(), "transaction committed");
        Ok(results)
    }

    /// Run a SELECT one page at a time.
    ///
    /// `page` is 1-based. The total comes from a count over the same
    /// statement and parameters, on the same connection.
    pub async fn execute_paginated(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
        page: u64,
        limit: u64,
    ) -> Result<Page> {
        if page == 0 || limit == 0 {
            return Err(Error::Parameter(
                "page and limit must both be at least 1".into(),
            ));
        }
        let params = Params::positional(params)?;
        let offset = (page - 1).saturating_mul(limit);

        let mut conn = self.lease("execute_paginated").await?;

        let count_sql = self.inner.driver.count(sql);
        let total: i64 = conn.run(&count_sql, &params, true).await?.scalar()?;
        let total = u64::try_from(total).unwrap_or(0);

        let page_sql = self.inner.driver.paginate(sql, limit, offset);
        let rows = conn.run(&page_sql, &params, true).await?.into_rows();

        Ok(Page {
            rows,
            total,
            page,
            limit,
            pages: total.div_ceil(limit),
        })
    }

    /// Close the service.
    ///
    /// No-op unless the service is `Ready` (an in-flight initialization is
    /// waited for first). New leases are refused at once, leases in use get
    /// [`Config::close_grace`] to finish, and the rest are terminated through
    /// the driver's [`KillHandle`](crate::KillHandle), which aborts running
    /// statements and closes the sessions. Always ends in `Closed`.
    pub async fn close(&self) -> CloseReport {
        loop {
            let step = {
                let mut slot = self.inner.slot.lock();
                match &*slot {
                    Slot::Ready(ready) => {
                        let ready = ready.clone();
                        *slot = Slot::Closing(ready.clone());
                        CloseStep::Close(ready)
                    }
                    Slot::Initializing(rx) => CloseStep::AwaitInit(rx.clone()),
                    Slot::Closing(_) => CloseStep::AwaitClose,
                    Slot::Uninitialized | Slot::Closed | Slot::Failed(_) => {
                        return CloseReport::default();
                    }
                }
            };

            match step {
                CloseStep::Close(ready) => {
                    self.inner.state_changed.notify_waiters();
                    let grace = ready.config.close_grace;
                    tracing::info!(
                        grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
                        "closing database service"
                    );

                    let guard = ClosingGuard { inner: &self.inner };
                    let report = ready.pool.close(grace).await;
                    drop(guard);

                    tracing::info!(
                        idle_closed = report.idle_closed,
                        drained = report.drained,
                        force_closed = report.force_closed,
                        "database service closed"
                    );
                    return report;
                }
                CloseStep::AwaitInit(mut rx) => {
                    // A cancelled attempt closes the channel; re-check the slot either way.
                    let _ = rx.wait_for(Option::is_some).await;
                }
                CloseStep::AwaitClose => self.wait_while_closing().await,
            }
        }
    }

    /// Current state and pool occupancy.
    #[must_use]
    pub fn status(&self) -> ServiceStatus {
        let slot = self.inner.slot.lock();
        let pool = match &*slot {
            Slot::Ready(ready) | Slot::Closing(ready) => Some(ready.pool.status()),
            _ => None,
        };
        let last_error = match &*slot {
            Slot::Failed(e) => Some(e.clone()),
            _ => None,
        };
        ServiceStatus {
            state: slot.state(),
            pool,
            last_error,
        }
    }

    /// Pool counters, while a pool exists.
    #[must_use]
    pub fn pool_metrics(&self) -> Option<PoolMetrics> {
        self.ready_or_closing().map(|ready| ready.pool.metrics())
    }

    /// Whether the service is `Ready` with an open pool.
    #[must_use]
    pub fn is_pool_active(&self) -> bool {
        self.ready_pool().is_some_and(|ready| !ready.pool.is_closed())
    }

    /// Number of pools this instance has built.
    #[must_use]
    pub fn pools_created(&self) -> u64 {
        self.inner.pools_created.load(Ordering::SeqCst)
    }

    /// Number of initialization attempts started (successful or not).
    #[must_use]
    pub fn init_attempts(&self) -> u64 {
        self.inner.init_attempts.load(Ordering::SeqCst)
    }

    fn ready_pool(&self) -> Option<ReadyPool> {
        match &*self.inner.slot.lock() {
            Slot::Ready(ready) => Some(ready.clone()),
            _ => None,
        }
    }

    fn ready_or_closing(&self) -> Option<ReadyPool> {
        match &*self.inner.slot.lock() {
            Slot::Ready(ready) | Slot::Closing(ready) => Some(ready.clone()),
            _ => None,
        }
    }

    async fn lease(&self, operation: &'static str) -> Result<Connection> {
        let ready = self.pool_for(operation).await?;
        let started = Instant::now();

        let pooled = ready
            .pool
            .get()
            .await
            .map_err(|e| Error::from_pool(e, operation))?;

        tracing::trace!(
            operation,
            connection_id = pooled.id(),
            wait_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "connection leased"
        );

        Ok(Connection::new(pooled, ready.config))
    }

    /// The open pool, initializing lazily when allowed.
    async fn pool_for(&self, operation: &'static str) -> Result<ReadyPool> {
        loop {
            {
                let slot = self.inner.slot.lock();
                match &*slot {
                    Slot::Ready(ready) => return Ok(ready.clone()),
                    Slot::Initializing(_) => {}
                    Slot::Uninitialized if self.inner.config.lock().lazy_init => {}
                    other => {
                        return Err(Error::Lifecycle {
                            state: other.state(),
                            operation,
                        });
                    }
                }
            }

            tracing::debug!(operation, "waiting for initialization on first use");
            self.start_or_join(None, operation).await?;
        }
    }

    async fn start_or_join(&self, mut config: Option<Config>, operation: &'static str) -> Result<()> {
        loop {
            let step = {
                let mut slot = self.inner.slot.lock();
                match &*slot {
                    Slot::Ready(_) => {
                        if config.is_some() {
                            tracing::debug!(operation, "already initialized; ignoring new configuration");
                        }
                        return Ok(());
                    }
                    Slot::Initializing(rx) => InitStep::Join(rx.clone()),
                    Slot::Closing(_) => InitStep::AwaitClose,
                    Slot::Uninitialized | Slot::Closed | Slot::Failed(_) => {
                        if let Some(config) = config.take() {
                            *self.inner.config.lock() = Arc::new(config);
                        }
                        let (tx, rx) = watch::channel(None);
                        *slot = Slot::Initializing(rx);
                        InitStep::Build(tx)
                    }
                }
            };

            match step {
                InitStep::Build(tx) => return self.build(tx).await,
                InitStep::Join(mut rx) => {
                    let outcome = match rx.wait_for(Option::is_some).await {
                        Ok(value) => (*value).clone(),
                        Err(_) => None,
                    };
                    if let Some(outcome) = outcome {
                        return outcome;
                    }
                    // The building caller was cancelled; start over.
                }
                InitStep::AwaitClose => self.wait_while_closing().await,
            }
        }
    }

    async fn build(&self, tx: watch::Sender<InitOutcome>) -> Result<()> {
        let config = self.config();
        let attempt = self.inner.init_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let mut guard = InitGuard {
            inner: &self.inner,
            armed: true,
        };

        tracing::info!(
            driver = self.inner.driver.name(),
            endpoint = %config.endpoint(),
            min = config.min_connections,
            max = config.max_connections,
            attempt,
            "initializing database service"
        );

        let result = self.create_pool(Arc::clone(&config)).await;
        guard.armed = false;

        let outcome = match result {
            Ok(pool) => {
                self.inner.set_slot(Slot::Ready(ReadyPool { pool, config }));
                tracing::info!("database service ready");
                Ok(())
            }
            Err(e) => {
                self.inner.set_slot(Slot::Failed(e.clone()));
                tracing::error!(error = %e, kind = ?e.kind(), "database service initialization failed");
                Err(e)
            }
        };

        tx.send_replace(Some(outcome.clone()));
        outcome
    }

    async fn create_pool(&self, config: Arc<Config>) -> Result<Pool<DriverLifecycle>> {
        config.validate()?;

        let lifecycle = DriverLifecycle::new(Arc::clone(&self.inner.driver), Arc::clone(&config));
        let pool = Pool::new(config.pool_config(), lifecycle)
            .await
            .map_err(|e| Error::from_pool(e, "initialize"))?;
        self.inner.pools_created.fetch_add(1, Ordering::SeqCst);

        if let Err(e) = probe_pool(&pool, config.probe_timeout).await {
            pool.close(Duration::ZERO).await;
            return Err(e);
        }

        Ok(pool)
    }

    async fn wait_while_closing(&self) {
        loop {
            let notified = self.inner.state_changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if !matches!(*self.inner.slot.lock(), Slot::Closing(_)) {
                return;
            }
            notified.await;
        }
    }
}

/// Lease a connection and ping it, bounded by `timeout`.
async fn probe_pool(pool: &Pool<DriverLifecycle>, timeout: Duration) -> Result<Duration> {
    let started = Instant::now();
    let round_trip = async {
        let mut conn = pool
            .get()
            .await
            .map_err(|e| Error::from_pool(e, "test_connection"))?;
        if let Err(e) = conn.ping().await {
            conn.discard();
            return Err(e);
        }
        Ok(())
    };

    match tokio::time::timeout(timeout, round_trip).await {
        Ok(Ok(())) => Ok(started.elapsed()),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(Error::Timeout {
            operation: "connectivity probe",
            elapsed: timeout,
        }),
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("driver", &self.inner.driver.name())
            .field("endpoint", &self.config().endpoint())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::driver::DriverConnection;
    use crate::error::ErrorKind;
    use async_trait::async_trait;

    /// A driver whose host never answers.
    struct Unreachable;

    #[async_trait]
    impl Driver for Unreachable {
        fn name(&self) -> &'static str {
            "unreachable"
        }

        async fn connect(&self, config: &Config) -> Result<Box<dyn DriverConnection>> {
            Err(Error::connectivity(format!(
                "no route to {}",
                config.endpoint()
            )))
        }
    }

    fn config() -> Config {
        Config::new().database("test").pool_size(1, 2)
    }

    #[tokio::test]
    async fn test_new_service_is_uninitialized() {
        let db = Database::new(Unreachable, config());
        assert_eq!(db.state(), LifecycleState::Uninitialized);
        assert!(!db.is_pool_active());
        assert!(db.pool_metrics().is_none());
        assert_eq!(db.pools_created(), 0);
    }

    #[tokio::test]
    async fn test_invalid_config_fails_initialize() {
        let db = Database::new(Unreachable, Config::new());
        let err = tokio_test::assert_err!(db.ensure_initialized().await);
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(db.state(), LifecycleState::Failed);
        assert!(db.status().last_error.is_some());
    }

    #[tokio::test]
    async fn test_unreachable_host_fails_initialize() {
        let db = Database::new(Unreachable, config());
        let err = tokio_test::assert_err!(db.ensure_initialized().await);
        assert_eq!(err.kind(), ErrorKind::Connectivity);
        assert_eq!(db.pools_created(), 0);
        assert_eq!(db.init_attempts(), 1);
    }

    #[tokio::test]
    async fn test_test_connection_false_when_not_ready() {
        let db = Database::new(Unreachable, config());
        assert!(!db.test_connection().await);
        let report = db.probe().await;
        assert_eq!(
            report.error.map(|e| e.kind()),
            Some(ErrorKind::Lifecycle)
        );
        // The probe does not initialize.
        assert_eq!(db.state(), LifecycleState::Uninitialized);
    }

    #[tokio::test]
    async fn test_execute_without_lazy_init_fails_fast() {
        let db = Database::new(Unreachable, config().lazy_init(false));
        let err = db.execute_query("SELECT 1", &[]).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Lifecycle {
                state: LifecycleState::Uninitialized,
                ..
            }
        ));
        assert_eq!(db.init_attempts(), 0);
    }

    #[tokio::test]
    async fn test_close_uninitialized_is_noop() {
        let db = Database::new(Unreachable, config());
        assert_eq!(db.close().await, CloseReport::default());
        assert_eq!(db.state(), LifecycleState::Uninitialized);
    }

    #[tokio::test]
    async fn test_parameter_errors_do_not_touch_the_pool() {
        let db = Database::new(Unreachable, config());
        let err = db.execute_query("SELECT ?", &[&u64::MAX]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Query);
        assert_eq!(db.init_attempts(), 0);
    }

    #[tokio::test]
    async fn test_pagination_rejects_page_zero() {
        let db = Database::new(Unreachable, config());
        let err = db
            .execute_paginated("SELECT 1", &[], 0, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Parameter(_)));
    }
}
