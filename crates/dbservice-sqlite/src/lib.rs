//! # dbservice-sqlite
//!
//! Embedded SQLite driver for [`dbservice`].
//!
//! Each pooled connection is one SQLite session on the file named by
//! [`Config::database`](dbservice::Config::database). Statements run on
//! Tokio's blocking thread pool so they never stall the async runtime.
//!
//! ## Example
//!
//! ```rust,ignore
//! use dbservice::{Config, Database};
//! use dbservice_sqlite::SqliteDriver;
//!
//! let config = Config::new().database("app.db").pool_size(1, 4);
//! let db = Database::new(SqliteDriver::new(), config);
//!
//! db.execute_query("CREATE TABLE IF NOT EXISTS kv (k TEXT PRIMARY KEY, v TEXT)", &[])
//!     .await?;
//! db.execute_named(
//!     "INSERT INTO kv (k, v) VALUES (:k, :v)",
//!     &[("k", &"greeting"), ("v", &"hello")],
//! )
//! .await?;
//! ```
//!
//! ## Type Mappings
//!
//! | SQLite storage class | [`SqlValue`](dbservice::SqlValue) |
//! |----------------------|-------------|
//! | NULL | `Null` |
//! | INTEGER | `Int` (booleans bind as 0/1) |
//! | REAL | `Float` |
//! | TEXT | `Text` (dates bind as ISO-8601 text) |
//! | BLOB | `Bytes` |

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod convert;
pub mod driver;

pub use driver::{SqliteConnection, SqliteDriver};
