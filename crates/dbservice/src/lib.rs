//! # dbservice
//!
//! Pooled database connectivity and query execution with explicit lifecycle
//! control.
//!
//! A [`Database`] owns one bounded connection pool built by a pluggable
//! [`Driver`]. It initializes at most once per lifecycle (concurrent callers
//! share the attempt), executes parameterized statements on pooled
//! connections, returns every lease on every exit path and drains leases on
//! shutdown.
//!
//! ## Features
//!
//! - **Explicit lifecycle**: `Uninitialized → Initializing → Ready → Closing → Closed`,
//!   with `Failed` for init errors
//! - **Lazy initialization**: the first statement initializes the service
//! - **Bounded pool**: acquisition fails with [`Error::PoolExhausted`] after the
//!   configured timeout instead of hanging
//! - **Statement timeouts**: an overrunning statement is abandoned and its
//!   connection discarded
//! - **Transactions**: [`Database::execute_transaction`] or a
//!   [`Transaction`] guard on a leased [`Connection`]
//! - **Classified errors**: [`ErrorKind`] separates configuration,
//!   connectivity, pool, query, lifecycle and timeout failures
//!
//! ## Example
//!
//! ```rust,ignore
//! use dbservice::{Config, Database};
//! use dbservice_sqlite::SqliteDriver;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_connection_string("Database=app.db;Max Pool Size=4")?;
//!     let db = Database::new(SqliteDriver::new(), config);
//!
//!     db.ensure_initialized().await?;
//!
//!     let result = db
//!         .execute_query("SELECT id, name FROM users WHERE id = ?", &[&1])
//!         .await?;
//!
//!     for row in &result {
//!         let name: String = row.get_by_name("name")?;
//!         println!("User: {name}");
//!     }
//!
//!     db.close().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod connection;
pub mod driver;
pub mod error;
pub mod instrumentation;
pub mod naming;
pub mod query;
pub mod row;
pub mod service;
pub mod state;
pub mod transaction;

// Re-export commonly used types
pub use config::{Config, Credentials};
pub use connection::Connection;
pub use dbservice_pool::{CloseReport, KillHandle, PoolMetrics, PoolStatus};
pub use dbservice_types::{FromSql, SqlValue, ToSql, TypeError};
pub use driver::{Driver, DriverConnection, ExecOptions};
pub use error::{Error, ErrorKind, Result};
pub use instrumentation::SanitizationConfig;
pub use naming::KeyCase;
pub use query::{Params, Query};
pub use row::{Column, Page, QueryResult, Row};
pub use service::{Database, ProbeReport, ServiceStatus};
pub use state::LifecycleState;
pub use transaction::Transaction;
