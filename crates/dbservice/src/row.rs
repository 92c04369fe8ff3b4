//! Row representation for query results.

use std::collections::HashMap;
use std::sync::Arc;

use dbservice_types::{FromSql, SqlValue, TypeError};

use crate::error::{Error, Result};
#[cfg(feature = "json")]
use crate::naming::KeyCase;

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name as reported by the database.
    pub name: String,
    /// Column index.
    pub index: usize,
    /// Declared SQL type, if the driver knows it.
    pub type_name: Option<String>,
}

impl Column {
    /// Create column metadata.
    pub fn new(name: impl Into<String>, index: usize, type_name: Option<String>) -> Self {
        Self {
            name: name.into(),
            index,
            type_name,
        }
    }
}

/// A row from a query result.
///
/// Values are addressable by position or by column name (case-insensitive).
/// Every accessor returns a `Result`; a missing column, NULL in a
/// non-optional target or a type mismatch is an [`Error::Column`].
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<[Column]>,
    values: Vec<SqlValue>,
}

impl Row {
    pub(crate) fn new(columns: Arc<[Column]>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    /// Get a value by column index.
    pub fn get<T: FromSql>(&self, index: usize) -> Result<T> {
        let value = self.values.get(index).ok_or_else(|| Error::Column {
            column: index.to_string(),
            source: TypeError::TypeMismatch {
                expected: "valid column index",
                actual: format!("index {index} out of bounds ({} columns)", self.values.len()),
            },
        })?;

        T::from_sql(value).map_err(|source| Error::Column {
            column: self.column_label(index),
            source,
        })
    }

    /// Get a value by column name.
    pub fn get_by_name<T: FromSql>(&self, name: &str) -> Result<T> {
        let index = self.position(name).ok_or_else(|| Error::Column {
            column: name.to_string(),
            source: TypeError::TypeMismatch {
                expected: "valid column name",
                actual: format!("column '{name}' not found"),
            },
        })?;

        self.get(index)
    }

    /// Try to get a value by column index, returning None if NULL or not found.
    pub fn try_get<T: FromSql>(&self, index: usize) -> Option<T> {
        self.values
            .get(index)
            .and_then(|v| T::from_sql_nullable(v).ok().flatten())
    }

    /// Try to get a value by column name, returning None if NULL or not found.
    pub fn try_get_by_name<T: FromSql>(&self, name: &str) -> Option<T> {
        self.try_get(self.position(name)?)
    }

    /// Get the raw SQL value by index.
    #[must_use]
    pub fn get_raw(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// Get the raw SQL value by column name.
    #[must_use]
    pub fn get_raw_by_name(&self, name: &str) -> Option<&SqlValue> {
        self.position(name).and_then(|i| self.values.get(i))
    }

    /// Get the number of columns in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the column metadata.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The row's values in column order.
    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Iterate over (column, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Column, &SqlValue)> {
        self.columns.iter().zip(self.values.iter())
    }

    /// The row as a map keyed by column name.
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, SqlValue> {
        self.iter()
            .map(|(c, v)| (c.name.clone(), v.clone()))
            .collect()
    }

    /// The row as a JSON object with keys rendered in `case`.
    #[cfg(feature = "json")]
    #[must_use]
    pub fn to_json(&self, case: KeyCase) -> serde_json::Value {
        let object = self
            .iter()
            .map(|(c, v)| {
                let value = serde_json::to_value(v).unwrap_or(serde_json::Value::Null);
                (case.apply(&c.name), value)
            })
            .collect();
        serde_json::Value::Object(object)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    fn column_label(&self, index: usize) -> String {
        self.columns
            .get(index)
            .map_or_else(|| index.to_string(), |c| c.name.clone())
    }
}

impl IntoIterator for Row {
    type Item = SqlValue;
    type IntoIter = std::vec::IntoIter<SqlValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a SqlValue;
    type IntoIter = std::slice::Iter<'a, SqlValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// The outcome of one statement.
///
/// SELECT-like statements fill [`rows`](Self::rows); DML and DDL report
/// [`rows_affected`](Self::rows_affected).
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    columns: Option<Arc<[Column]>>,
    rows: Vec<Row>,
    rows_affected: u64,
    truncated: bool,
}

impl QueryResult {
    /// Build a result from driver output.
    ///
    /// Every value vector must be in column order.
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<SqlValue>>, rows_affected: u64) -> Self {
        let columns: Arc<[Column]> = columns.into();
        let rows = rows
            .into_iter()
            .map(|values| Row::new(Arc::clone(&columns), values))
            .collect();
        Self {
            columns: Some(columns),
            rows,
            rows_affected,
            truncated: false,
        }
    }

    /// A result with only an affected-row count.
    #[must_use]
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            ..Self::default()
        }
    }

    /// Mark the row set as cut off by the row cap.
    #[must_use]
    pub fn truncated(mut self, truncated: bool) -> Self {
        self.truncated = truncated;
        self
    }

    /// Result rows.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Take ownership of the rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// The first row, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Column metadata. Empty for statements that return no row set.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        self.columns.as_deref().unwrap_or(&[])
    }

    /// Rows changed by a DML statement.
    #[must_use]
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    /// Whether more rows existed than the configured row cap.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the result has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Read a single value from the first row.
    pub fn scalar<T: FromSql>(&self) -> Result<T> {
        let row = self.first().ok_or_else(|| Error::Column {
            column: "0".into(),
            source: TypeError::TypeMismatch {
                expected: "a row",
                actual: "empty result".into(),
            },
        })?;
        row.get(0)
    }

    /// All rows as a JSON array of objects.
    #[cfg(feature = "json")]
    #[must_use]
    pub fn to_json(&self, case: KeyCase) -> serde_json::Value {
        serde_json::Value::Array(self.rows.iter().map(|r| r.to_json(case)).collect())
    }
}

impl IntoIterator for QueryResult {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// One page of a paginated query.
#[derive(Debug, Clone)]
pub struct Page {
    /// Rows on this page.
    pub rows: Vec<Row>,
    /// Rows matched by the unpaginated query.
    pub total: u64,
    /// 1-based page number.
    pub page: u64,
    /// Page size.
    pub limit: u64,
    /// Number of pages.
    pub pages: u64,
}
