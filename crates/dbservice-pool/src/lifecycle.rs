//! Connection lifecycle hooks and per-connection metadata.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::BoxError;

/// Driver-side operations the pool needs to manage physical connections.
///
/// The pool never inspects a connection itself; it only calls these hooks.
#[async_trait]
pub trait ConnectionLifecycle: Send + Sync + 'static {
    /// The physical connection type.
    type Connection: Send + 'static;

    /// Open a new physical connection.
    async fn connect(&self) -> Result<Self::Connection, BoxError>;

    /// Check that an idle connection is still usable.
    async fn health_check(&self, conn: &mut Self::Connection) -> HealthCheckResult;

    /// Clear session state (open transactions, temporary settings) before reuse.
    async fn reset(&self, conn: &mut Self::Connection) -> Result<(), BoxError>;

    /// Whether the connection is known to be unusable and must not be pooled.
    fn is_broken(&self, _conn: &Self::Connection) -> bool {
        false
    }

    /// A handle that terminates `conn` while another task holds it.
    ///
    /// Taken when the connection is leased. [`Pool::close`](crate::Pool::close)
    /// fires it for every lease still out after the grace period. `None`
    /// leaves the session open until its holder drops the lease.
    fn kill_handle(&self, _conn: &Self::Connection) -> Option<KillHandle> {
        None
    }

    /// Close a connection that is leaving the pool.
    async fn close(&self, conn: Self::Connection) {
        drop(conn);
    }
}

/// Terminates a leased connection from outside the lease.
///
/// Firing it must abort any statement running on the session, close the
/// physical session, and leave the connection reporting itself broken.
/// It may be fired more than once.
#[derive(Clone)]
pub struct KillHandle(Arc<dyn Fn() + Send + Sync>);

impl KillHandle {
    /// Wrap the termination routine.
    pub fn new<F>(kill: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self(Arc::new(kill))
    }

    /// Terminate the session.
    pub fn kill(&self) {
        (self.0)();
    }
}

impl fmt::Debug for KillHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KillHandle")
    }
}

/// Outcome of a health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthCheckResult {
    /// The connection answered.
    Healthy,
    /// The connection failed the check.
    Unhealthy(String),
}

impl HealthCheckResult {
    /// Whether the check passed.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Where a connection currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Sitting in the free set.
    Idle,
    /// Leased to exactly one caller.
    InUse,
    /// Removed from the pool.
    Closed,
}

/// Bookkeeping attached to every pooled connection.
#[derive(Debug, Clone)]
pub struct ConnectionMetadata {
    /// Identifier unique within the pool.
    pub id: u64,
    /// When the physical connection was opened.
    pub created_at: Instant,
    /// When the connection was last returned (or opened).
    pub last_used: Instant,
    /// Number of times the connection has been leased.
    pub checkout_count: u64,
    /// Current lifecycle state.
    pub state: ConnectionState,
}

impl ConnectionMetadata {
    pub(crate) fn new(id: u64) -> Self {
        let now = Instant::now();
        Self {
            id,
            created_at: now,
            last_used: now,
            checkout_count: 0,
            state: ConnectionState::Idle,
        }
    }

    /// Time since the connection was opened.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Time since the connection was last returned.
    #[must_use]
    pub fn idle_time(&self) -> Duration {
        self.last_used.elapsed()
    }

    /// Whether the connection outlived `max_lifetime`.
    #[must_use]
    pub fn is_expired(&self, max_lifetime: Option<Duration>) -> bool {
        max_lifetime.is_some_and(|max| self.age() > max)
    }
}
