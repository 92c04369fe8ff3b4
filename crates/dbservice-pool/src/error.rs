//! Pool error types.

use std::time::Duration;

use thiserror::Error;

/// Boxed error produced by a [`ConnectionLifecycle`](crate::ConnectionLifecycle)
/// implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by the connection pool.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PoolError {
    /// The pool has been closed; no new leases are handed out.
    #[error("connection pool is closed")]
    PoolClosed,

    /// Every connection stayed in use for the whole acquisition timeout.
    #[error("timed out after {waited:?} waiting for a connection (pool max {max_connections})")]
    Timeout {
        /// How long the caller waited.
        waited: Duration,
        /// Configured pool maximum.
        max_connections: u32,
    },

    /// Opening a new physical connection failed.
    #[error("failed to open connection: {0}")]
    Connection(#[source] BoxError),

    /// The pool configuration is invalid.
    #[error("invalid pool configuration: {0}")]
    Configuration(String),

    /// A connection leased from a different pool was handed back.
    #[error("connection {id} does not belong to this pool")]
    ForeignConnection {
        /// Connection identifier.
        id: u64,
    },

    /// The connection is not currently leased (already returned or terminated).
    #[error("connection {id} is not leased from this pool")]
    NotLeased {
        /// Connection identifier.
        id: u64,
    },
}

impl PoolError {
    /// Whether retrying the acquisition later can succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Connection(_))
    }
}
