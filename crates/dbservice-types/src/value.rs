//! The driver-neutral SQL value.

use std::fmt;

/// A single SQL value as carried in result rows and bind parameters.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer (covers every integer column width).
    Int(i64),
    /// Double precision float.
    Float(f64),
    /// Character data.
    Text(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Calendar date without time zone.
    #[cfg(feature = "chrono")]
    Date(chrono::NaiveDate),
    /// Timestamp without time zone.
    #[cfg(feature = "chrono")]
    DateTime(chrono::NaiveDateTime),
}

impl SqlValue {
    /// Check whether this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Name of the value's type, used in conversion errors.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "BOOL",
            Self::Int(_) => "INT",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
            Self::Bytes(_) => "BYTES",
            #[cfg(feature = "chrono")]
            Self::Date(_) => "DATE",
            #[cfg(feature = "chrono")]
            Self::DateTime(_) => "DATETIME",
        }
    }

    /// Borrow the value as a string slice, if it is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer, if it is one.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Get the value as a float, widening integers.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Short description used in mismatch errors: type plus a bounded preview.
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Text(s) if s.chars().count() > 32 => {
                let head: String = s.chars().take(32).collect();
                format!("TEXT '{head}...'")
            }
            Self::Bytes(b) => format!("BYTES ({} bytes)", b.len()),
            Self::Null => "NULL".to_string(),
            other => format!("{} {other}", other.type_name()),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "'{s}'"),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            #[cfg(feature = "chrono")]
            Self::Date(d) => write!(f, "{d}"),
            #[cfg(feature = "chrono")]
            Self::DateTime(dt) => write!(f, "{dt}"),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for SqlValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(v) => serializer.serialize_i64(*v),
            Self::Float(v) => serializer.serialize_f64(*v),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Bytes(b) => serializer.serialize_bytes(b),
            #[cfg(feature = "chrono")]
            Self::Date(d) => serializer.collect_str(d),
            #[cfg(feature = "chrono")]
            Self::DateTime(dt) => serializer.collect_str(&dt.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}
