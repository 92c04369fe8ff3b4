//! Mapping between SQLite values and errors and their service counterparts.

use dbservice::Error;
use dbservice_types::SqlValue;
use rusqlite::ErrorCode;
use rusqlite::types::{Value, ValueRef};

/// Convert a bind parameter into an owned SQLite value.
pub(crate) fn to_sqlite(value: &SqlValue) -> Result<Value, Error> {
    Ok(match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => Value::Integer(i64::from(*b)),
        SqlValue::Int(i) => Value::Integer(*i),
        SqlValue::Float(f) => Value::Real(*f),
        SqlValue::Text(s) => Value::Text(s.clone()),
        SqlValue::Bytes(b) => Value::Blob(b.clone()),
        // SQLite has no date type; ISO-8601 text sorts and compares correctly.
        SqlValue::Date(d) => Value::Text(d.to_string()),
        SqlValue::DateTime(dt) => Value::Text(dt.to_string()),
        other => {
            return Err(Error::Parameter(format!(
                "{} values cannot be bound to SQLite",
                other.type_name()
            )));
        }
    })
}

/// Convert a column value into the driver-neutral model.
pub(crate) fn from_sqlite(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Int(i),
        ValueRef::Real(f) => SqlValue::Float(f),
        ValueRef::Text(bytes) => SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => SqlValue::Bytes(bytes.to_vec()),
    }
}

/// Whether an error means the session itself is unusable.
fn is_session_error(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(
                e.code,
                ErrorCode::CannotOpen
                    | ErrorCode::NotADatabase
                    | ErrorCode::DatabaseCorrupt
                    | ErrorCode::SystemIoFailure
                    | ErrorCode::PermissionDenied
            )
    )
}

/// Classify a SQLite error.
pub(crate) fn map_error(err: rusqlite::Error) -> Error {
    if is_session_error(&err) {
        return Error::connectivity(err.to_string());
    }

    match err {
        rusqlite::Error::SqliteFailure(e, message) => Error::query(
            Some(format!("SQLITE_{}", e.extended_code)),
            message.unwrap_or_else(|| e.to_string()),
        ),
        rusqlite::Error::InvalidParameterCount(given, expected) => Error::Parameter(format!(
            "statement expects {expected} parameters, {given} given"
        )),
        rusqlite::Error::InvalidParameterName(name) => {
            Error::Parameter(format!("statement has no parameter named {name}"))
        }
        other => Error::query(None, other.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use dbservice::ErrorKind;

    #[test]
    fn test_bool_binds_as_integer() {
        assert_eq!(to_sqlite(&SqlValue::Bool(true)).unwrap(), Value::Integer(1));
        assert_eq!(to_sqlite(&SqlValue::Bool(false)).unwrap(), Value::Integer(0));
    }

    #[test]
    fn test_date_binds_as_iso_text() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(
            to_sqlite(&SqlValue::Date(date)).unwrap(),
            Value::Text("2024-01-15".into())
        );
    }

    #[test]
    fn test_text_round_trips_from_sqlite() {
        assert_eq!(
            from_sqlite(ValueRef::Text(b"hello")),
            SqlValue::Text("hello".into())
        );
        assert_eq!(from_sqlite(ValueRef::Null), SqlValue::Null);
    }

    #[test]
    fn test_cannot_open_is_connectivity() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
            None,
        );
        assert_eq!(map_error(err).kind(), ErrorKind::Connectivity);
    }

    #[test]
    fn test_constraint_is_query_with_code() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE),
            Some("UNIQUE constraint failed: users.email".into()),
        );
        let err = map_error(err);
        assert_eq!(err.kind(), ErrorKind::Query);
        assert_eq!(err.code(), Some("SQLITE_2067"));
    }
}
