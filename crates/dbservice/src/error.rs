//! Service error types.
//!
//! Every failure a caller can see carries one [`ErrorKind`], so retry and
//! alerting policy can be decided without matching on messages.

use std::time::Duration;

use dbservice_pool::PoolError;
use dbservice_types::TypeError;
use thiserror::Error;

use crate::state::LifecycleState;

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the database service.
///
/// `Error` is `Clone`: all callers waiting on one initialization attempt
/// receive the same failure.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed or missing connection parameters.
    #[error("configuration error: {0}")]
    Config(String),

    /// The database could not be reached or rejected the session.
    #[error("connectivity error: {message}")]
    Connectivity {
        /// Driver-supplied description.
        message: String,
    },

    /// No connection became free within the acquisition timeout.
    #[error("connection pool exhausted: waited {waited:?} with all {max_connections} connections in use")]
    PoolExhausted {
        /// How long the caller waited.
        waited: Duration,
        /// Configured pool maximum.
        max_connections: u32,
    },

    /// The database rejected the statement.
    #[error("query failed{}: {message}", render_code(.code))]
    Query {
        /// Vendor error code, if the driver reports one.
        code: Option<String>,
        /// Driver-supplied description.
        message: String,
        /// Sanitized statement text.
        sql: Option<String>,
    },

    /// A bind parameter could not be converted or does not match the statement.
    #[error("invalid parameter: {0}")]
    Parameter(String),

    /// The operation is not valid in the current lifecycle state.
    #[error("cannot {operation} while the service is {state}")]
    Lifecycle {
        /// State observed when the call was rejected.
        state: LifecycleState,
        /// Rejected operation.
        operation: &'static str,
    },

    /// A statement or probe ran past its timeout.
    #[error("{operation} timed out after {elapsed:?}")]
    Timeout {
        /// What timed out.
        operation: &'static str,
        /// Configured limit.
        elapsed: Duration,
    },

    /// A row value could not be read as requested.
    #[error("column {column}: {source}")]
    Column {
        /// Column name or index.
        column: String,
        /// Underlying conversion failure.
        #[source]
        source: TypeError,
    },

    /// A lease was handed back incorrectly.
    #[error("connection release rejected: {0}")]
    Pool(String),
}

fn render_code(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| format!(" [{c}]"))
        .unwrap_or_default()
}

/// Classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Fatal; fix the configuration.
    Configuration,
    /// Transient; the caller decides whether to retry.
    Connectivity,
    /// The pool is saturated; the database may be healthy.
    PoolExhaustion,
    /// The statement was rejected; retrying cannot succeed.
    Query,
    /// Programming error: wrong lifecycle state.
    Lifecycle,
    /// Statement or probe timeout.
    Timeout,
    /// Row access failure.
    Column,
    /// Release protocol violation.
    Pool,
}

impl Error {
    /// The classified kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Connectivity { .. } => ErrorKind::Connectivity,
            Self::PoolExhausted { .. } => ErrorKind::PoolExhaustion,
            Self::Query { .. } | Self::Parameter(_) => ErrorKind::Query,
            Self::Lifecycle { .. } => ErrorKind::Lifecycle,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Column { .. } => ErrorKind::Column,
            Self::Pool(_) => ErrorKind::Pool,
        }
    }

    /// Whether a later retry of the same call can succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Connectivity | ErrorKind::PoolExhaustion | ErrorKind::Timeout
        )
    }

    /// Vendor error code of a query failure.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Query { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Create a connectivity error.
    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::Connectivity {
            message: message.into(),
        }
    }

    /// Create a query error without statement text.
    pub fn query(code: Option<String>, message: impl Into<String>) -> Self {
        Self::Query {
            code,
            message: message.into(),
            sql: None,
        }
    }

    /// Attach sanitized statement text to a query error.
    #[must_use]
    pub(crate) fn with_sql(self, sanitized: impl FnOnce() -> String) -> Self {
        match self {
            Self::Query {
                code,
                message,
                sql: None,
            } => Self::Query {
                code,
                message,
                sql: Some(sanitized()),
            },
            other => other,
        }
    }

    /// Map a pool failure seen while performing `operation`.
    pub(crate) fn from_pool(err: PoolError, operation: &'static str) -> Self {
        match err {
            PoolError::PoolClosed => Self::Lifecycle {
                state: LifecycleState::Closing,
                operation,
            },
            PoolError::Timeout {
                waited,
                max_connections,
            } => Self::PoolExhausted {
                waited,
                max_connections,
            },
            PoolError::Connection(source) => match source.downcast::<Error>() {
                Ok(err) => *err,
                Err(other) => Self::connectivity(other.to_string()),
            },
            PoolError::Configuration(message) => Self::Config(message),
            other => Self::Pool(other.to_string()),
        }
    }
}
