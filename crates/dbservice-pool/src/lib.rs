//! # dbservice-pool
//!
//! Bounded async connection pool with explicit lease bookkeeping.
//!
//! The pool is generic over a [`ConnectionLifecycle`] implementation, which
//! knows how to open, validate, reset and close one physical connection.
//! Everything else (bounding, waiting, leasing, returning, draining on close
//! and idle housekeeping) lives here.
//!
//! ## Features
//!
//! - Semaphore-bounded leases: at most `max_connections` connections exist
//! - Acquisition timeout producing [`PoolError::Timeout`] instead of a hang
//! - RAII leases: [`PooledConnection`] returns itself to the pool on drop
//! - Reset-before-reuse of returned connections
//! - Idle reaper honoring the `min_connections` watermark
//! - Drain-with-grace on [`Pool::close`], then forced termination through
//!   each lease's [`KillHandle`]
//! - Metrics for observability
//!
//! ## Example
//!
//! ```rust,ignore
//! use dbservice_pool::{Pool, PoolConfig};
//! use std::time::Duration;
//!
//! let pool = Pool::builder(manager)
//!     .min_connections(2)
//!     .max_connections(10)
//!     .connection_timeout(Duration::from_secs(5))
//!     .build()
//!     .await?;
//!
//! let conn = pool.get().await?;
//! // Use connection...
//! drop(conn); // returned to the pool
//!
//! let status = pool.status();
//! println!("Pool utilization: {:.1}%", status.utilization());
//!
//! pool.close(Duration::from_secs(10)).await;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod pool;

// Configuration
pub use config::PoolConfig;

// Error types
pub use error::{BoxError, PoolError};

// Pool types
pub use pool::{CloseReport, Pool, PoolBuilder, PoolMetrics, PoolStatus, PooledConnection};

// Lifecycle management
pub use lifecycle::{
    ConnectionLifecycle, ConnectionMetadata, ConnectionState, HealthCheckResult, KillHandle,
};
