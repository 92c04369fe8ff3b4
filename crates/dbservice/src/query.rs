//! Query requests and bind parameters.

use dbservice_types::{SqlValue, ToSql};

use crate::error::{Error, Result};

/// Bind parameters for one statement.
///
/// A statement uses either positional markers (`?`, `?N`) or named markers
/// (`:name`), never both. Values are always bound by the driver, never
/// spliced into the SQL text.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Params {
    /// No parameters.
    #[default]
    None,
    /// Values for `?` / `?N` markers, in order.
    Positional(Vec<SqlValue>),
    /// Values for `:name` markers. Names are stored without the colon.
    Named(Vec<(String, SqlValue)>),
}

impl Params {
    /// Convert positional values.
    pub fn positional(values: &[&(dyn ToSql + Sync)]) -> Result<Self> {
        if values.is_empty() {
            return Ok(Self::None);
        }

        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v.to_sql()
                    .map_err(|e| Error::Parameter(format!("parameter {}: {e}", i + 1)))
            })
            .collect::<Result<Vec<_>>>()
            .map(Self::Positional)
    }

    /// Convert named values. A leading `:` on a name is ignored.
    pub fn named(values: &[(&str, &(dyn ToSql + Sync))]) -> Result<Self> {
        if values.is_empty() {
            return Ok(Self::None);
        }

        let mut named = Vec::with_capacity(values.len());
        for (name, value) in values {
            let name = normalize_name(name)?;
            if named.iter().any(|(n, _): &(String, SqlValue)| *n == name) {
                return Err(Error::Parameter(format!("parameter :{name} bound twice")));
            }
            let value = value
                .to_sql()
                .map_err(|e| Error::Parameter(format!("parameter :{name}: {e}")))?;
            named.push((name, value));
        }
        Ok(Self::Named(named))
    }

    /// Number of bound values.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Positional(v) => v.len(),
            Self::Named(v) => v.len(),
        }
    }

    /// Whether no values are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<SqlValue>> for Params {
    fn from(values: Vec<SqlValue>) -> Self {
        if values.is_empty() {
            Self::None
        } else {
            Self::Positional(values)
        }
    }
}

fn normalize_name(name: &str) -> Result<String> {
    let name = name.strip_prefix(':').unwrap_or(name);
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(Error::Parameter(format!("invalid parameter name: {name:?}")));
    }
    Ok(name.to_string())
}

/// A statement plus its parameters and execution options.
///
/// Binding failures (an out-of-range value, mixing positional and named
/// markers) are kept and reported when the query is executed, so the builder
/// chain stays infallible.
///
/// ```rust,ignore
/// let query = Query::new("UPDATE users SET name = :name WHERE id = :id")
///     .bind_named("name", "Alice")
///     .bind_named("id", 7);
/// db.execute(query).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Query {
    sql: String,
    params: Params,
    auto_commit: bool,
    error: Option<Error>,
}

impl Query {
    /// Create a new query from SQL text.
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Params::None,
            auto_commit: true,
            error: None,
        }
    }

    /// Create a query with already converted parameters.
    #[must_use]
    pub fn with_params(sql: impl Into<String>, params: Params) -> Self {
        Self {
            params,
            ..Self::new(sql)
        }
    }

    /// Bind the next positional parameter.
    #[must_use]
    pub fn bind<T: ToSql>(mut self, value: T) -> Self {
        if self.error.is_some() {
            return self;
        }

        let position = self.params.len() + 1;
        let value = match value.to_sql() {
            Ok(v) => v,
            Err(e) => {
                self.error = Some(Error::Parameter(format!("parameter {position}: {e}")));
                return self;
            }
        };

        match &mut self.params {
            Params::None => self.params = Params::Positional(vec![value]),
            Params::Positional(values) => values.push(value),
            Params::Named(_) => {
                self.error = Some(mixed_markers());
            }
        }
        self
    }

    /// Bind a named parameter. A leading `:` on the name is ignored.
    #[must_use]
    pub fn bind_named<T: ToSql>(mut self, name: &str, value: T) -> Self {
        if self.error.is_some() {
            return self;
        }

        let result = normalize_name(name).and_then(|name| {
            value
                .to_sql()
                .map(|v| (name.clone(), v))
                .map_err(|e| Error::Parameter(format!("parameter :{name}: {e}")))
        });
        let (name, value) = match result {
            Ok(pair) => pair,
            Err(e) => {
                self.error = Some(e);
                return self;
            }
        };

        match &mut self.params {
            Params::None => self.params = Params::Named(vec![(name, value)]),
            Params::Named(values) => {
                if let Some(slot) = values.iter_mut().find(|(n, _)| *n == name) {
                    slot.1 = value;
                } else {
                    values.push((name, value));
                }
            }
            Params::Positional(_) => {
                self.error = Some(mixed_markers());
            }
        }
        self
    }

    /// Commit immediately after the statement (default `true`).
    ///
    /// With auto-commit off the work stays pending on the connection until
    /// an explicit commit; a lease returned with pending work is rolled back
    /// before reuse.
    #[must_use]
    pub fn auto_commit(mut self, enabled: bool) -> Self {
        self.auto_commit = enabled;
        self
    }

    /// Get the SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Get the bound parameters.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Whether the statement commits on its own.
    #[must_use]
    pub fn is_auto_commit(&self) -> bool {
        self.auto_commit
    }

    /// Report any binding failure recorded by the builder.
    pub fn check(&self) -> Result<()> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

impl From<&str> for Query {
    fn from(sql: &str) -> Self {
        Self::new(sql)
    }
}

impl From<String> for Query {
    fn from(sql: String) -> Self {
        Self::new(sql)
    }
}

fn mixed_markers() -> Error {
    Error::Parameter("positional and named parameters cannot be mixed".into())
}
