//! Conversions from result values into Rust types.

use crate::error::TypeError;
use crate::value::SqlValue;

/// A Rust type that can be read out of a result column.
pub trait FromSql: Sized {
    /// Convert a non-NULL SQL value. NULL yields [`TypeError::UnexpectedNull`].
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError>;

    /// Convert a value that may be NULL.
    fn from_sql_nullable(value: &SqlValue) -> Result<Option<Self>, TypeError> {
        if value.is_null() {
            Ok(None)
        } else {
            Self::from_sql(value).map(Some)
        }
    }
}

fn mismatch(expected: &'static str, value: &SqlValue) -> TypeError {
    if value.is_null() {
        TypeError::UnexpectedNull { expected }
    } else {
        TypeError::TypeMismatch {
            expected,
            actual: value.describe(),
        }
    }
}

impl FromSql for SqlValue {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        Ok(value.clone())
    }

    fn from_sql_nullable(value: &SqlValue) -> Result<Option<Self>, TypeError> {
        Ok(Some(value.clone()))
    }
}

impl<T: FromSql> FromSql for Option<T> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        T::from_sql_nullable(value)
    }
}

impl FromSql for i64 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        value.as_i64().ok_or_else(|| mismatch("i64", value))
    }
}

macro_rules! narrow_int_from_sql {
    ($($ty:ty),*) => {
        $(
            impl FromSql for $ty {
                fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
                    let wide = value
                        .as_i64()
                        .ok_or_else(|| mismatch(stringify!($ty), value))?;
                    <$ty>::try_from(wide).map_err(|_| TypeError::OutOfRange {
                        target: stringify!($ty),
                        value: wide.to_string(),
                    })
                }
            }
        )*
    };
}

narrow_int_from_sql!(i16, i32, u8, u16, u32, u64);

impl FromSql for f64 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        value.as_f64().ok_or_else(|| mismatch("f64", value))
    }
}

impl FromSql for f32 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        f64::from_sql(value).map(|v| v as f32)
    }
}

impl FromSql for bool {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Bool(b) => Ok(*b),
            // Databases without a native boolean store 0/1.
            SqlValue::Int(0) => Ok(false),
            SqlValue::Int(1) => Ok(true),
            other => Err(mismatch("bool", other)),
        }
    }
}

impl FromSql for String {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Text(s) => Ok(s.clone()),
            other => Err(mismatch("String", other)),
        }
    }
}

impl FromSql for Vec<u8> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Bytes(b) => Ok(b.clone()),
            other => Err(mismatch("Vec<u8>", other)),
        }
    }
}

#[cfg(feature = "chrono")]
impl FromSql for chrono::NaiveDate {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Date(d) => Ok(*d),
            SqlValue::DateTime(dt) => Ok(dt.date()),
            SqlValue::Text(s) => chrono::NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|_| TypeError::Parse {
                    target: "NaiveDate",
                    value: s.clone(),
                }),
            other => Err(mismatch("NaiveDate", other)),
        }
    }
}

#[cfg(feature = "chrono")]
impl FromSql for chrono::NaiveDateTime {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        const FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

        match value {
            SqlValue::DateTime(dt) => Ok(*dt),
            SqlValue::Date(d) => Ok(d.and_time(chrono::NaiveTime::MIN)),
            SqlValue::Text(s) => FORMATS
                .iter()
                .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(s.trim(), fmt).ok())
                .ok_or_else(|| TypeError::Parse {
                    target: "NaiveDateTime",
                    value: s.clone(),
                }),
            other => Err(mismatch("NaiveDateTime", other)),
        }
    }
}
