//! # dbservice-types
//!
//! Database value model and conversions between Rust types and SQL values.
//!
//! This crate is driver-agnostic: every backend maps its native column
//! values into [`SqlValue`] and binds parameters from it, so result rows and
//! bind parameters look the same regardless of the database behind the pool.
//!
//! ## Type Mappings
//!
//! | SQL category | Rust type |
//! |--------------|-----------|
//! | BOOLEAN / BIT | `bool` |
//! | INTEGER family | `i16`, `i32`, `i64`, `u8`, `u16`, `u32` |
//! | REAL / FLOAT / DOUBLE | `f32`, `f64` |
//! | CHAR / VARCHAR / TEXT / CLOB | `String` |
//! | BLOB / BINARY | `Vec<u8>` |
//! | DATE | `chrono::NaiveDate` |
//! | TIMESTAMP | `chrono::NaiveDateTime` |
//! | NULL | `Option<T>` |

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod from_sql;
pub mod to_sql;
pub mod value;

pub use error::TypeError;
pub use from_sql::FromSql;
pub use to_sql::ToSql;
pub use value::SqlValue;
