//! Service configuration.

use std::fmt;
use std::time::Duration;

use dbservice_pool::PoolConfig;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::instrumentation::SanitizationConfig;

/// EZConnect-style `[user[/password]@]host[:port][/service]`.
static EZCONNECT: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?P<user>[^/@]+)(?:/(?P<password>.*))?@)?(?P<host>[^:/@]+)(?::(?P<port>\d+))?(?:/(?P<service>[^/]+))?$",
    )
    .ok()
});

/// Database login.
///
/// The password never appears in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Create credentials from a user name and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The user name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password. Drivers read it when opening a session; never log it.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Configuration for a [`Database`](crate::Database).
///
/// Immutable once handed to the service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server hostname or IP address.
    pub host: String,

    /// Server port. `None` lets the driver use its default.
    pub port: Option<u16>,

    /// Service or database name. File-backed drivers treat it as a path.
    pub database: String,

    /// Login credentials.
    pub credentials: Credentials,

    /// Application name reported to the server where supported.
    pub application_name: String,

    /// Timeout for opening one physical connection.
    pub connect_timeout: Duration,

    /// Connections opened at initialization and kept by idle housekeeping.
    pub min_connections: u32,

    /// Maximum open connections.
    pub max_connections: u32,

    /// Maximum wait for a free connection before failing with
    /// [`Error::PoolExhausted`].
    pub acquire_timeout: Duration,

    /// Free connections above the minimum are closed after this long.
    pub idle_timeout: Duration,

    /// Connections older than this are recycled.
    pub max_lifetime: Option<Duration>,

    /// Per-statement timeout. `None` disables it.
    pub statement_timeout: Option<Duration>,

    /// Bound on the connectivity probe, separate from the statement timeout.
    pub probe_timeout: Duration,

    /// How long `close` waits for leases in use before terminating them.
    pub close_grace: Duration,

    /// Whether `execute_query` may initialize an uninitialized service.
    pub lazy_init: bool,

    /// Statements run on every new physical connection.
    pub session_init: Vec<String>,

    /// Cap on rows fetched per statement. Zero means no cap.
    pub max_rows: usize,

    /// Check idle connections before handing them out.
    pub test_on_checkout: bool,

    /// How statement text is rendered in logs and errors.
    pub sanitization: SanitizationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: None,
            database: String::new(),
            credentials: Credentials::default(),
            application_name: "dbservice".to_string(),
            connect_timeout: Duration::from_secs(30),
            min_connections: 2,
            max_connections: 10,
            acquire_timeout: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(60),
            max_lifetime: None,
            statement_timeout: None,
            probe_timeout: Duration::from_secs(5),
            close_grace: Duration::from_secs(10),
            lazy_init: true,
            session_init: Vec::new(),
            max_rows: 0,
            test_on_checkout: false,
            sanitization: SanitizationConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a connection string into configuration.
    ///
    /// Supports ADO-style key/value strings:
    /// ```text
    /// Host=db.internal;Port=1521;Service Name=xe;User Id=app;Password=secret;
    /// ```
    /// and EZConnect strings:
    /// ```text
    /// app/secret@db.internal:1521/xe
    /// ```
    pub fn from_connection_string(conn_str: &str) -> Result<Self> {
        let mut config = Self::default();
        config.apply_connection_string(conn_str)?;
        Ok(config)
    }

    /// Build a configuration from `DB_*` environment variables.
    ///
    /// See [`from_lookup`](Self::from_lookup) for the variables read.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from `DB_*` variables supplied by `lookup`.
    ///
    /// | Variable | Meaning |
    /// |----------|---------|
    /// | `DB_CONNECT_STRING` | connection string; host/port/service below are ignored when set |
    /// | `DB_HOST`, `DB_PORT`, `DB_SERVICE_NAME` | server address |
    /// | `DB_USER`, `DB_PASSWORD` | credentials, override the connection string |
    /// | `DB_POOL_MIN`, `DB_POOL_MAX` | pool bounds |
    /// | `DB_POOL_TIMEOUT` | idle timeout, seconds |
    /// | `DB_QUEUE_TIMEOUT` | acquisition timeout, milliseconds |
    /// | `DB_STATEMENT_TIMEOUT` | statement timeout, milliseconds |
    /// | `DB_SESSION_INIT` | `;`-separated session statements |
    /// | `DB_MAX_ROWS` | row cap per statement |
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(conn_str) = var("DB_CONNECT_STRING") {
            config.apply_connection_string(&conn_str)?;
        } else {
            if let Some(host) = var("DB_HOST") {
                config.host = host;
            }
            if let Some(port) = var("DB_PORT") {
                config.port = Some(parse_number("DB_PORT", &port)?);
            }
            if let Some(service) = var("DB_SERVICE_NAME") {
                config.database = service;
            }
        }

        if let Some(user) = var("DB_USER") {
            config.credentials.username = user;
        }
        if let Some(password) = lookup("DB_PASSWORD") {
            config.credentials.password = password;
        }
        if let Some(min) = var("DB_POOL_MIN") {
            config.min_connections = parse_number("DB_POOL_MIN", &min)?;
        }
        if let Some(max) = var("DB_POOL_MAX") {
            config.max_connections = parse_number("DB_POOL_MAX", &max)?;
        }
        if let Some(secs) = var("DB_POOL_TIMEOUT") {
            config.idle_timeout = Duration::from_secs(parse_number("DB_POOL_TIMEOUT", &secs)?);
        }
        if let Some(ms) = var("DB_QUEUE_TIMEOUT") {
            config.acquire_timeout =
                Duration::from_millis(parse_number("DB_QUEUE_TIMEOUT", &ms)?);
        }
        if let Some(ms) = var("DB_STATEMENT_TIMEOUT") {
            let ms: u64 = parse_number("DB_STATEMENT_TIMEOUT", &ms)?;
            config.statement_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(statements) = var("DB_SESSION_INIT") {
            config.session_init = statements
                .split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(max_rows) = var("DB_MAX_ROWS") {
            config.max_rows = parse_number("DB_MAX_ROWS", &max_rows)?;
        }

        Ok(config)
    }

    fn apply_connection_string(&mut self, conn_str: &str) -> Result<()> {
        let conn_str = conn_str.trim();
        if conn_str.is_empty() {
            return Err(Error::Config("empty connection string".into()));
        }

        if conn_str.contains('=') {
            self.apply_key_values(conn_str)
        } else {
            self.apply_ezconnect(conn_str)
        }
    }

    fn apply_ezconnect(&mut self, conn_str: &str) -> Result<()> {
        let captures = EZCONNECT
            .as_ref()
            .and_then(|re| re.captures(conn_str))
            .ok_or_else(|| {
                Error::Config(format!(
                    "invalid connect string: {}",
                    redact_login(conn_str)
                ))
            })?;

        if let Some(user) = captures.name("user") {
            self.credentials.username = user.as_str().to_string();
        }
        if let Some(password) = captures.name("password") {
            self.credentials.password = password.as_str().to_string();
        }
        if let Some(host) = captures.name("host") {
            self.host = host.as_str().to_string();
        }
        if let Some(port) = captures.name("port") {
            self.port = Some(parse_number("port", port.as_str())?);
        }
        if let Some(service) = captures.name("service") {
            self.database = service.as_str().to_string();
        }
        Ok(())
    }

    fn apply_key_values(&mut self, conn_str: &str) -> Result<()> {
        for (index, part) in conn_str.split(';').enumerate() {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            // The segment itself may be a mistyped password; report only its position.
            let (key, value) = part.split_once('=').ok_or_else(|| {
                Error::Config(format!(
                    "invalid key-value: segment {} has no '='",
                    index + 1
                ))
            })?;

            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "server" | "data source" | "host" => {
                    if let Some((host, port)) = value.rsplit_once(':').or(value.split_once(',')) {
                        self.host = host.to_string();
                        self.port = Some(parse_number("port", port)?);
                    } else {
                        self.host = value.to_string();
                    }
                }
                "port" => {
                    self.port = Some(parse_number("port", value)?);
                }
                "database" | "initial catalog" | "service name" | "service" => {
                    self.database = value.to_string();
                }
                "user id" | "uid" | "user" => {
                    self.credentials.username = value.to_string();
                }
                "password" | "pwd" => {
                    self.credentials.password = value.to_string();
                }
                "application name" | "app" => {
                    self.application_name = value.to_string();
                }
                "connect timeout" | "connection timeout" => {
                    self.connect_timeout = Duration::from_secs(parse_number("timeout", value)?);
                }
                "statement timeout" | "command timeout" => {
                    let secs: u64 = parse_number("timeout", value)?;
                    self.statement_timeout = (secs > 0).then(|| Duration::from_secs(secs));
                }
                "min pool size" => {
                    self.min_connections = parse_number("min pool size", value)?;
                }
                "max pool size" => {
                    self.max_connections = parse_number("max pool size", value)?;
                }
                _ => {
                    // Ignore unknown options for forward compatibility
                    tracing::debug!(key = key, "ignoring unknown connection string option");
                }
            }
        }

        Ok(())
    }

    /// Set the server host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the server port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the service or database name.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the credentials.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set the application name.
    #[must_use]
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the pool bounds.
    #[must_use]
    pub fn pool_size(mut self, min: u32, max: u32) -> Self {
        self.min_connections = min;
        self.max_connections = max;
        self
    }

    /// Set the acquisition timeout.
    #[must_use]
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
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

    /// Set the statement timeout.
    #[must_use]
    pub fn statement_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.statement_timeout = timeout;
        self
    }

    /// Set the probe timeout.
    #[must_use]
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the close grace period.
    #[must_use]
    pub fn close_grace(mut self, grace: Duration) -> Self {
        self.close_grace = grace;
        self
    }

    /// Allow or forbid implicit initialization from `execute_query`.
    #[must_use]
    pub fn lazy_init(mut self, enabled: bool) -> Self {
        self.lazy_init = enabled;
        self
    }

    /// Add a statement run on every new connection.
    #[must_use]
    pub fn session_statement(mut self, sql: impl Into<String>) -> Self {
        self.session_init.push(sql.into());
        self
    }

    /// Set the per-statement row cap.
    #[must_use]
    pub fn max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Enable or disable health checks on checkout.
    #[must_use]
    pub fn test_on_checkout(mut self, enabled: bool) -> Self {
        self.test_on_checkout = enabled;
        self
    }

    /// Set how statement text is rendered in logs and errors.
    #[must_use]
    pub fn sanitization(mut self, sanitization: SanitizationConfig) -> Self {
        self.sanitization = sanitization;
        self
    }

    /// `host[:port]/database`, safe to log.
    #[must_use]
    pub fn endpoint(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}/{}", self.host, port, self.database),
            None => format!("{}/{}", self.host, self.database),
        }
    }

    /// Pool settings derived from this configuration.
    #[must_use]
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new()
            .min_connections(self.min_connections)
            .max_connections(self.max_connections)
            .connection_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
            .max_lifetime(self.max_lifetime)
            .test_on_checkout(self.test_on_checkout)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".into()));
        }

        if self.database.trim().is_empty() {
            return Err(Error::Config("service name must not be empty".into()));
        }

        if self.max_connections == 0 {
            return Err(Error::Config(
                "max pool size must be greater than zero".into(),
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(Error::Config(format!(
                "min pool size ({}) exceeds max pool size ({})",
                self.min_connections, self.max_connections
            )));
        }

        if self.acquire_timeout.is_zero() {
            return Err(Error::Config("acquisition timeout must be non-zero".into()));
        }

        if self.probe_timeout.is_zero() {
            return Err(Error::Config("probe timeout must be non-zero".into()));
        }

        if self.statement_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::Config("statement timeout must be non-zero".into()));
        }

        Ok(())
    }
}

/// Replace the `user/password@` part of an EZConnect string.
fn redact_login(conn_str: &str) -> String {
    match conn_str.rsplit_once('@') {
        Some((_, target)) => format!("***@{target}"),
        None => conn_str.to_string(),
    }
}

fn parse_number<T: std::str::FromStr>(what: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid {what}: {value}")))
}
