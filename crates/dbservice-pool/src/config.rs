//! Pool configuration.

use std::time::Duration;

use crate::error::PoolError;

/// Configuration for a connection pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Connections opened eagerly and kept through idle housekeeping.
    pub min_connections: u32,

    /// Upper bound on open connections (idle plus leased).
    pub max_connections: u32,

    /// How long [`Pool::get`](crate::Pool::get) waits for a free slot.
    pub connection_timeout: Duration,

    /// Idle connections above the minimum are closed after this long.
    pub idle_timeout: Duration,

    /// Connections older than this are recycled instead of reused.
    pub max_lifetime: Option<Duration>,

    /// How often the idle reaper runs. Zero disables the reaper.
    pub reaper_interval: Duration,

    /// Run a health check before handing out an idle connection.
    pub test_on_checkout: bool,

    /// Reset session state of returned connections before their next lease.
    pub reset_on_return: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 1,
            max_connections: 10,
            connection_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Some(Duration::from_secs(1800)),
            reaper_interval: Duration::from_secs(30),
            test_on_checkout: false,
            reset_on_return: true,
        }
    }
}

impl PoolConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum number of connections.
    #[must_use]
    pub fn min_connections(mut self, count: u32) -> Self {
        self.min_connections = count;
        self
    }

    /// Set the maximum number of connections.
    #[must_use]
    pub fn max_connections(mut self, count: u32) -> Self {
        self.max_connections = count;
        self
    }

    /// Set the acquisition timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the idle timeout.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the maximum connection lifetime.
    #[must_use]
    pub fn max_lifetime(mut self, lifetime: Option<Duration>) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Set the idle reaper interval.
    #[must_use]
    pub fn reaper_interval(mut self, interval: Duration) -> Self {
        self.reaper_interval = interval;
        self
    }

    /// Enable or disable health checks on checkout.
    #[must_use]
    pub fn test_on_checkout(mut self, enabled: bool) -> Self {
        self.test_on_checkout = enabled;
        self
    }

    /// Enable or disable session reset of returned connections.
    #[must_use]
    pub fn reset_on_return(mut self, enabled: bool) -> Self {
        self.reset_on_return = enabled;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_connections == 0 {
            return Err(PoolError::Configuration(
                "max_connections must be greater than zero".into(),
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(PoolError::Configuration(format!(
                "min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }

        if self.connection_timeout.is_zero() {
            return Err(PoolError::Configuration(
                "connection_timeout must be non-zero".into(),
            ));
        }

        Ok(())
    }
}
