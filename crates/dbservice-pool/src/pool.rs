//! Connection pool implementation.
//!
//! Leases are bounded by a semaphore with one permit per allowed connection.
//! The free set and the leased set live together under one mutex, so a
//! connection is always in exactly one of them. Returned connections are
//! flagged for reset and cleaned up by the next checkout, which keeps
//! [`Drop`] of a lease synchronous.

use std::collections::{HashMap, VecDeque};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::lifecycle::{ConnectionLifecycle, ConnectionMetadata, ConnectionState, KillHandle};

/// A bounded pool of connections managed by a [`ConnectionLifecycle`].
///
/// The handle is cheap to clone; all clones share the same connections.
///
/// # Example
///
/// ```rust,ignore
/// let pool = Pool::builder(manager)
///     .max_connections(20)
///     .build()
///     .await?;
///
/// let conn = pool.get().await?;
/// // Use connection...
/// ```
pub struct Pool<M: ConnectionLifecycle> {
    inner: Arc<PoolInner<M>>,
}

impl<M: ConnectionLifecycle> Clone for Pool<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct PoolInner<M: ConnectionLifecycle> {
    /// Pool configuration.
    config: PoolConfig,

    /// Opens, checks and closes physical connections.
    manager: M,

    /// Free and leased bookkeeping.
    state: Mutex<PoolState<M::Connection>>,

    /// One permit per allowed lease.
    semaphore: Arc<Semaphore>,

    /// Whether the pool is closed.
    closed: AtomicBool,

    /// Counter for generating connection IDs.
    next_connection_id: AtomicU64,

    /// Signalled whenever a lease ends.
    released: Notify,

    /// When the pool was created.
    created_at: Instant,

    /// Pool metrics.
    metrics: Mutex<PoolMetricsInner>,
}

struct PoolState<C> {
    /// Free connections, most recently returned at the back.
    idle: VecDeque<IdleConnection<C>>,
    /// Connections currently leased, with the handle that can terminate each.
    leased: HashMap<u64, Option<KillHandle>>,
}

struct IdleConnection<C> {
    conn: C,
    metadata: ConnectionMetadata,
    needs_reset: bool,
}

/// Internal metrics tracking.
#[derive(Debug, Default)]
struct PoolMetricsInner {
    connections_created: u64,
    connections_closed: u64,
    checkouts_successful: u64,
    checkouts_failed: u64,
    checkouts_timed_out: u64,
    health_checks_performed: u64,
    health_checks_failed: u64,
    resets_performed: u64,
    resets_failed: u64,
    idle_reaped: u64,
    force_closed: u64,
}

impl<M: ConnectionLifecycle> Pool<M> {
    /// Create a new pool builder around a lifecycle manager.
    #[must_use]
    pub fn builder(manager: M) -> PoolBuilder<M> {
        PoolBuilder::new(manager)
    }

    /// Create a new pool, eagerly opening `min_connections` connections.
    ///
    /// Fails if the configuration is invalid or any of the initial
    /// connections cannot be opened; nothing is left running in that case.
    pub async fn new(config: PoolConfig, manager: M) -> Result<Self, PoolError> {
        config.validate()?;

        let inner = Arc::new(PoolInner {
            semaphore: Arc::new(Semaphore::new(config.max_connections as usize)),
            state: Mutex::new(PoolState {
                idle: VecDeque::with_capacity(config.max_connections as usize),
                leased: HashMap::new(),
            }),
            config: config.clone(),
            manager,
            closed: AtomicBool::new(false),
            next_connection_id: AtomicU64::new(1),
            released: Notify::new(),
            created_at: Instant::now(),
            metrics: Mutex::new(PoolMetricsInner::default()),
        });

        for _ in 0..config.min_connections {
            match inner.open_connection().await {
                Ok((conn, metadata)) => {
                    inner.state.lock().idle.push_back(IdleConnection {
                        conn,
                        metadata,
                        needs_reset: false,
                    });
                }
                Err(e) => {
                    let opened: Vec<_> = inner.state.lock().idle.drain(..).collect();
                    for entry in opened {
                        inner.discard(entry.conn, &entry.metadata).await;
                    }
                    return Err(e);
                }
            }
        }

        if !config.reaper_interval.is_zero() {
            spawn_reaper(&inner);
        }

        tracing::info!(
            min = config.min_connections,
            max = config.max_connections,
            "connection pool created"
        );

        Ok(Self { inner })
    }

    /// Get a connection from the pool.
    ///
    /// This will either return an existing idle connection or open a new one
    /// if the pool is not at capacity. If all connections are in use and the
    /// pool is at capacity, this waits until a connection is returned or the
    /// acquisition timeout elapses.
    pub async fn get(&self) -> Result<PooledConnection<M>, PoolError> {
        if self.is_closed() {
            return Err(PoolError::PoolClosed);
        }

        let started = Instant::now();
        let timeout = self.inner.config.connection_timeout;
        let acquire = Arc::clone(&self.inner.semaphore).acquire_owned();

        let permit = match tokio::time::timeout(timeout, acquire).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => {
                self.inner.metrics.lock().checkouts_failed += 1;
                return Err(PoolError::PoolClosed);
            }
            Err(_) => {
                {
                    let mut metrics = self.inner.metrics.lock();
                    metrics.checkouts_failed += 1;
                    metrics.checkouts_timed_out += 1;
                }
                tracing::warn!(
                    waited_ms = started.elapsed().as_millis() as u64,
                    max = self.inner.config.max_connections,
                    "connection pool exhausted"
                );
                return Err(PoolError::Timeout {
                    waited: started.elapsed(),
                    max_connections: self.inner.config.max_connections,
                });
            }
        };

        tracing::trace!("acquiring connection from pool");

        loop {
            let (candidate, expired) = self.inner.pop_idle();
            for stale in expired {
                self.inner.discard(stale.conn, &stale.metadata).await;
            }

            let Some(mut idle) = candidate else {
                break;
            };

            if idle.needs_reset && self.inner.config.reset_on_return {
                self.inner.metrics.lock().resets_performed += 1;
                if let Err(e) = self.inner.manager.reset(&mut idle.conn).await {
                    self.inner.metrics.lock().resets_failed += 1;
                    tracing::warn!(
                        connection_id = idle.metadata.id,
                        error = %e,
                        "connection reset failed; discarding"
                    );
                    self.inner.discard(idle.conn, &idle.metadata).await;
                    continue;
                }
            }

            if self.inner.config.test_on_checkout {
                self.inner.metrics.lock().health_checks_performed += 1;
                let health = self.inner.manager.health_check(&mut idle.conn).await;
                if !health.is_healthy() {
                    self.inner.metrics.lock().health_checks_failed += 1;
                    tracing::debug!(
                        connection_id = idle.metadata.id,
                        result = ?health,
                        "idle connection failed health check"
                    );
                    self.inner.discard(idle.conn, &idle.metadata).await;
                    continue;
                }
            }

            if self.inner.manager.is_broken(&idle.conn) {
                self.inner.discard(idle.conn, &idle.metadata).await;
                continue;
            }

            return self.inner.lease(idle.conn, idle.metadata, permit);
        }

        match self.inner.open_connection().await {
            Ok((conn, metadata)) => self.inner.lease(conn, metadata, permit),
            Err(e) => {
                self.inner.metrics.lock().checkouts_failed += 1;
                Err(e)
            }
        }
    }

    /// Return a lease to the pool explicitly.
    ///
    /// Dropping a [`PooledConnection`] has the same effect; this method
    /// additionally reports protocol violations. Handing back a connection
    /// that was leased from another pool fails with
    /// [`PoolError::ForeignConnection`] (the connection still goes back to
    /// its own pool), and one that this pool no longer tracks, because
    /// [`close`](Self::close) terminated it, fails with
    /// [`PoolError::NotLeased`].
    pub fn release(&self, conn: PooledConnection<M>) -> Result<(), PoolError> {
        let id = conn.metadata.id;

        if !Arc::ptr_eq(&self.inner, &conn.pool) {
            return Err(PoolError::ForeignConnection { id });
        }

        if !self.inner.state.lock().leased.contains_key(&id) {
            return Err(PoolError::NotLeased { id });
        }

        drop(conn);
        Ok(())
    }

    /// Close the pool.
    ///
    /// New acquisitions fail immediately with [`PoolError::PoolClosed`] and
    /// idle connections are closed. Leases still in use get `grace` to come
    /// back; whatever is still out after that is terminated: the pool stops
    /// tracking it and fires its [`KillHandle`], which aborts any running
    /// statement and closes the session. The holder keeps the lease value,
    /// but every further use of the session fails.
    /// Calling `close` on a closed pool does nothing.
    pub async fn close(&self, grace: Duration) -> CloseReport {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return CloseReport::default();
        }

        self.inner.semaphore.close();

        let idle: Vec<_> = self.inner.state.lock().idle.drain(..).collect();
        let idle_closed = idle.len();
        for entry in idle {
            self.inner.discard(entry.conn, &entry.metadata).await;
        }

        let deadline = tokio::time::Instant::now() + grace;
        let mut drained = 0usize;
        loop {
            let notified = self.inner.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let outstanding = self.inner.state.lock().leased.len();
            if outstanding == 0 {
                break;
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                break;
            }
            drained += outstanding - self.inner.state.lock().leased.len().min(outstanding);
        }

        let terminated: Vec<(u64, Option<KillHandle>)> =
            self.inner.state.lock().leased.drain().collect();
        if !terminated.is_empty() {
            self.inner.metrics.lock().force_closed += terminated.len() as u64;
            let ids: Vec<u64> = terminated.iter().map(|(id, _)| *id).collect();
            tracing::warn!(
                connections = ?ids,
                grace_ms = grace.as_millis() as u64,
                "terminating leases still in use after grace period"
            );
        }
        for (id, kill) in &terminated {
            match kill {
                Some(kill) => kill.kill(),
                None => tracing::debug!(
                    connection_id = id,
                    "connection has no kill handle; it closes when its holder drops it"
                ),
            }
        }

        tracing::info!(
            idle_closed,
            drained,
            force_closed = terminated.len(),
            "connection pool closed"
        );

        CloseReport {
            idle_closed,
            drained,
            force_closed: terminated.len(),
        }
    }

    /// Check if the pool is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Get the current pool status.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let state = self.inner.state.lock();
        let available = state.idle.len() as u32;
        let in_use = state.leased.len() as u32;
        PoolStatus {
            available,
            in_use,
            total: available + in_use,
            max: self.inner.config.max_connections,
        }
    }

    /// Get pool metrics.
    #[must_use]
    pub fn metrics(&self) -> PoolMetrics {
        let inner = self.inner.metrics.lock();
        PoolMetrics {
            connections_created: inner.connections_created,
            connections_closed: inner.connections_closed,
            checkouts_successful: inner.checkouts_successful,
            checkouts_failed: inner.checkouts_failed,
            checkouts_timed_out: inner.checkouts_timed_out,
            health_checks_performed: inner.health_checks_performed,
            health_checks_failed: inner.health_checks_failed,
            resets_performed: inner.resets_performed,
            resets_failed: inner.resets_failed,
            idle_reaped: inner.idle_reaped,
            force_closed: inner.force_closed,
            uptime: self.inner.created_at.elapsed(),
        }
    }

    /// Get the pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Get the lifecycle manager.
    #[must_use]
    pub fn manager(&self) -> &M {
        &self.inner.manager
    }

    /// Run one idle-housekeeping pass immediately.
    ///
    /// Returns how many connections were closed. The background reaper calls
    /// this on every tick.
    pub async fn reap_idle(&self) -> usize {
        self.inner.reap_idle().await
    }
}

impl<M: ConnectionLifecycle> PoolInner<M> {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn open_connection(&self) -> Result<(M::Connection, ConnectionMetadata), PoolError> {
        let conn = self
            .manager
            .connect()
            .await
            .map_err(PoolError::Connection)?;

        let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        self.metrics.lock().connections_created += 1;
        tracing::debug!(connection_id = id, "opened new connection");

        Ok((conn, ConnectionMetadata::new(id)))
    }

    /// Pop the most recently returned connection, collecting expired ones.
    #[allow(clippy::type_complexity)]
    fn pop_idle(
        &self,
    ) -> (
        Option<IdleConnection<M::Connection>>,
        Vec<IdleConnection<M::Connection>>,
    ) {
        let mut state = self.state.lock();
        let mut expired = Vec::new();

        while let Some(entry) = state.idle.pop_back() {
            if entry.metadata.is_expired(self.config.max_lifetime) {
                expired.push(entry);
                continue;
            }
            return (Some(entry), expired);
        }

        (None, expired)
    }

    fn lease(
        self: &Arc<Self>,
        conn: M::Connection,
        mut metadata: ConnectionMetadata,
        permit: OwnedSemaphorePermit,
    ) -> Result<PooledConnection<M>, PoolError> {
        let kill = self.manager.kill_handle(&conn);
        {
            let mut state = self.state.lock();
            // close() may have run while this checkout was opening or resetting.
            if self.is_closed() {
                drop(state);
                self.metrics.lock().checkouts_failed += 1;
                self.count_closed();
                return Err(PoolError::PoolClosed);
            }
            state.leased.insert(metadata.id, kill);
        }

        metadata.state = ConnectionState::InUse;
        metadata.checkout_count += 1;
        self.metrics.lock().checkouts_successful += 1;

        tracing::trace!(connection_id = metadata.id, "connection leased");

        Ok(PooledConnection {
            conn: Some(conn),
            metadata,
            pool: Arc::clone(self),
            discard: false,
            _permit: permit,
        })
    }

    /// Take a lease back. Synchronous so it can run from `Drop`.
    fn return_connection(&self, conn: M::Connection, mut metadata: ConnectionMetadata, discard: bool) {
        let mut state = self.state.lock();

        if state.leased.remove(&metadata.id).is_none() {
            // Terminated by close(); the pool no longer owns a slot for it.
            drop(state);
            drop(conn);
            self.count_closed();
            tracing::debug!(
                connection_id = metadata.id,
                "terminated connection closed on return"
            );
            return;
        }

        let reusable = !discard
            && !self.is_closed()
            && !self.manager.is_broken(&conn)
            && !metadata.is_expired(self.config.max_lifetime);

        if reusable {
            metadata.state = ConnectionState::Idle;
            metadata.last_used = Instant::now();
            state.idle.push_back(IdleConnection {
                conn,
                metadata,
                needs_reset: true,
            });
            drop(state);
            tracing::trace!("connection returned to pool");
        } else {
            drop(state);
            drop(conn);
            self.count_closed();
            tracing::debug!(
                connection_id = metadata.id,
                discard,
                "connection closed instead of returned"
            );
        }

        self.released.notify_waiters();
    }

    /// Detach a lease from the pool without returning the connection.
    fn forget_lease(&self, id: u64) {
        let was_leased = self.state.lock().leased.remove(&id).is_some();
        if was_leased {
            self.released.notify_waiters();
        }
        self.count_closed();
    }

    async fn discard(&self, conn: M::Connection, metadata: &ConnectionMetadata) {
        tracing::debug!(
            connection_id = metadata.id,
            age_ms = metadata.age().as_millis() as u64,
            "closing connection"
        );
        self.manager.close(conn).await;
        self.count_closed();
    }

    fn count_closed(&self) {
        self.metrics.lock().connections_closed += 1;
    }

    async fn reap_idle(&self) -> usize {
        let reaped: Vec<_> = {
            let mut state = self.state.lock();
            let mut total = state.idle.len() + state.leased.len();
            let min = self.config.min_connections as usize;
            let mut keep = VecDeque::with_capacity(state.idle.len());
            let mut reaped = Vec::new();

            // Oldest returns sit at the front.
            while let Some(entry) = state.idle.pop_front() {
                let idle_expired = entry.metadata.idle_time() > self.config.idle_timeout;
                let lifetime_expired = entry.metadata.is_expired(self.config.max_lifetime);
                if total > min && (idle_expired || lifetime_expired) {
                    total -= 1;
                    reaped.push(entry);
                } else {
                    keep.push_back(entry);
                }
            }
            state.idle = keep;
            reaped
        };

        let count = reaped.len();
        if count > 0 {
            self.metrics.lock().idle_reaped += count as u64;
            tracing::debug!(count, "reaping idle connections");
        }
        for entry in reaped {
            self.discard(entry.conn, &entry.metadata).await;
        }
        count
    }
}

fn spawn_reaper<M: ConnectionLifecycle>(inner: &Arc<PoolInner<M>>) {
    let weak = Arc::downgrade(inner);
    let interval = inner.config.reaper_interval;

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(inner) = weak.upgrade() else {
                break;
            };
            if inner.is_closed() {
                break;
            }
            inner.reap_idle().await;
        }

        tracing::trace!("idle reaper stopped");
    });
}

/// Builder for creating a connection pool.
///
/// # Example
///
/// ```rust,ignore
/// let pool = Pool::builder(manager)
///     .pool_config(pool_config)
///     .build()
///     .await?;
/// ```
pub struct PoolBuilder<M: ConnectionLifecycle> {
    manager: M,
    pool_config: PoolConfig,
}

impl<M: ConnectionLifecycle> PoolBuilder<M> {
    /// Create a new pool builder with default settings.
    pub fn new(manager: M) -> Self {
        Self {
            manager,
            pool_config: PoolConfig::default(),
        }
    }

    /// Set the pool configuration.
    #[must_use]
    pub fn pool_config(mut self, config: PoolConfig) -> Self {
        self.pool_config = config;
        self
    }

    /// Set the minimum number of connections.
    #[must_use]
    pub fn min_connections(mut self, count: u32) -> Self {
        self.pool_config.min_connections = count;
        self
    }

    /// Set the maximum number of connections.
    #[must_use]
    pub fn max_connections(mut self, count: u32) -> Self {
        self.pool_config.max_connections = count;
        self
    }

    /// Set the connection acquisition timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.pool_config.connection_timeout = timeout;
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_config.idle_timeout = timeout;
        self
    }

    /// Enable or disable session reset of returned connections.
    #[must_use]
    pub fn reset_on_return(mut self, enabled: bool) -> Self {
        self.pool_config.reset_on_return = enabled;
        self
    }

    /// Build the pool.
    pub async fn build(self) -> Result<Pool<M>, PoolError> {
        Pool::new(self.pool_config, self.manager).await
    }
}

/// Status information about the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Number of idle connections available.
    pub available: u32,
    /// Number of connections currently in use.
    pub in_use: u32,
    /// Total number of connections.
    pub total: u32,
    /// Maximum allowed connections.
    pub max: u32,
}

impl PoolStatus {
    /// Percentage of the maximum currently leased.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        if self.max == 0 {
            return 0.0;
        }
        (self.in_use as f64 / self.max as f64) * 100.0
    }

    /// Whether every allowed connection is leased.
    #[must_use]
    pub fn is_at_capacity(&self) -> bool {
        self.in_use >= self.max
    }
}

/// What [`Pool::close`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloseReport {
    /// Idle connections closed immediately.
    pub idle_closed: usize,
    /// Leases that came back during the grace period.
    pub drained: usize,
    /// Leases terminated after the grace period.
    pub force_closed: usize,
}

/// Metrics collected by the pool.
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    /// Total connections created since pool start.
    pub connections_created: u64,
    /// Total connections closed since pool start.
    pub connections_closed: u64,
    /// Successful connection checkouts.
    pub checkouts_successful: u64,
    /// Failed connection checkouts (timeouts, pool closed, connect errors).
    pub checkouts_failed: u64,
    /// Checkouts that gave up after the acquisition timeout.
    pub checkouts_timed_out: u64,
    /// Health checks performed.
    pub health_checks_performed: u64,
    /// Health checks that failed.
    pub health_checks_failed: u64,
    /// Connection resets performed.
    pub resets_performed: u64,
    /// Connection resets that failed.
    pub resets_failed: u64,
    /// Idle connections closed by housekeeping.
    pub idle_reaped: u64,
    /// Leases terminated by close after the grace period.
    pub force_closed: u64,
    /// Time since pool creation.
    pub uptime: Duration,
}

impl PoolMetrics {
    /// Calculate checkout success rate (0.0 to 1.0).
    #[must_use]
    pub fn checkout_success_rate(&self) -> f64 {
        let total = self.checkouts_successful + self.checkouts_failed;
        if total == 0 {
            return 1.0;
        }
        self.checkouts_successful as f64 / total as f64
    }

    /// Calculate health check success rate (0.0 to 1.0).
    #[must_use]
    pub fn health_check_success_rate(&self) -> f64 {
        if self.health_checks_performed == 0 {
            return 1.0;
        }
        let successful = self.health_checks_performed - self.health_checks_failed;
        successful as f64 / self.health_checks_performed as f64
    }
}

/// A connection leased from the pool.
///
/// Dereferences to the physical connection. When dropped, the connection is
/// returned to the pool (or closed, if it was marked for discard, is broken,
/// or the pool has closed).
pub struct PooledConnection<M: ConnectionLifecycle> {
    /// Taken in `Drop` or `detach`.
    conn: Option<M::Connection>,
    metadata: ConnectionMetadata,
    pool: Arc<PoolInner<M>>,
    discard: bool,
    _permit: OwnedSemaphorePermit,
}

impl<M: ConnectionLifecycle> PooledConnection<M> {
    /// Get the connection metadata.
    #[must_use]
    pub fn metadata(&self) -> &ConnectionMetadata {
        &self.metadata
    }

    /// The connection identifier.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.metadata.id
    }

    /// Close the connection instead of returning it when the lease ends.
    ///
    /// Use this when the session state is uncertain, e.g. after a statement
    /// timeout.
    pub fn discard(&mut self) {
        self.discard = true;
    }

    /// Whether the lease will be closed instead of returned.
    #[must_use]
    pub fn is_discarded(&self) -> bool {
        self.discard
    }

    /// Whether the pool terminated this lease while closing.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        !self.pool.state.lock().leased.contains_key(&self.metadata.id)
    }

    /// Detach the connection from the pool.
    ///
    /// The pool frees the slot and stops tracking the connection; the caller
    /// owns it from now on.
    pub fn detach(mut self) -> Option<M::Connection> {
        let conn = self.conn.take();
        self.pool.forget_lease(self.metadata.id);
        conn
    }
}

impl<M: ConnectionLifecycle> Deref for PooledConnection<M> {
    type Target = M::Connection;

    fn deref(&self) -> &Self::Target {
        match self.conn.as_ref() {
            Some(conn) => conn,
            None => unreachable!("connection is only taken by drop or detach"),
        }
    }
}

impl<M: ConnectionLifecycle> DerefMut for PooledConnection<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self.conn.as_mut() {
            Some(conn) => conn,
            None => unreachable!("connection is only taken by drop or detach"),
        }
    }
}

impl<M: ConnectionLifecycle> Drop for PooledConnection<M> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::trace!(
                connection_id = self.metadata.id,
                "returning connection to pool"
            );
            self.pool
                .return_connection(conn, self.metadata.clone(), self.discard);
        }
    }
}

impl<M: ConnectionLifecycle> std::fmt::Debug for PooledConnection<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("id", &self.metadata.id)
            .field("checkout_count", &self.metadata.checkout_count)
            .field("discard", &self.discard)
            .finish()
    }
}
