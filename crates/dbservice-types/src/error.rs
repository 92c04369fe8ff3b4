//! Type conversion error types.

use thiserror::Error;

/// Errors that can occur while converting between Rust and SQL values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TypeError {
    /// A NULL was read into a non-optional Rust type.
    #[error("unexpected NULL value (expected {expected})")]
    UnexpectedNull {
        /// Rust type that was requested.
        expected: &'static str,
    },

    /// The SQL value has a different type than requested.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Rust type that was requested.
        expected: &'static str,
        /// Description of the value actually present.
        actual: String,
    },

    /// The value does not fit in the requested Rust type.
    #[error("value {value} out of range for {target}")]
    OutOfRange {
        /// Rust type that was requested.
        target: &'static str,
        /// Rendered offending value.
        value: String,
    },

    /// A textual value could not be parsed into the requested type.
    #[error("cannot parse '{value}' as {target}")]
    Parse {
        /// Rust type that was requested.
        target: &'static str,
        /// The text that failed to parse.
        value: String,
    },
}
