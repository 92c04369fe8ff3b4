//! Service lifecycle states.

use std::fmt;

/// Where a [`Database`](crate::Database) is in its lifecycle.
///
/// ```text
/// Uninitialized ──► Initializing ──► Ready ──► Closing ──► Closed
///                        │                                    │
///                        └──► Failed ◄── (re-initialize) ◄────┘
/// ```
///
/// `Closed` and `Failed` both allow a fresh [`initialize`](crate::Database::initialize).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// No pool has been built yet.
    Uninitialized,
    /// A pool is being built; concurrent callers wait for the outcome.
    Initializing,
    /// The pool is open and leases are handed out.
    Ready,
    /// The pool is draining leases before it shuts down.
    Closing,
    /// The pool has been shut down.
    Closed,
    /// The last initialization attempt failed.
    Failed,
}

impl LifecycleState {
    /// Lower-case name used in logs and error messages.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Failed => "failed",
        }
    }

    /// Whether `initialize` may start a new attempt from this state.
    #[must_use]
    pub fn can_initialize(&self) -> bool {
        matches!(self, Self::Uninitialized | Self::Closed | Self::Failed)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
