//! Conversions from Rust values into bind parameters.

use crate::error::TypeError;
use crate::value::SqlValue;

/// A Rust value that can be bound as a SQL parameter.
pub trait ToSql {
    /// Convert this value into a [`SqlValue`].
    fn to_sql(&self) -> Result<SqlValue, TypeError>;
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(self.clone())
    }
}

impl<T: ToSql + ?Sized> ToSql for &T {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        (**self).to_sql()
    }
}

impl<T: ToSql> ToSql for Option<T> {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        match self {
            Some(v) => v.to_sql(),
            None => Ok(SqlValue::Null),
        }
    }
}

macro_rules! int_to_sql {
    ($($ty:ty),*) => {
        $(
            impl ToSql for $ty {
                fn to_sql(&self) -> Result<SqlValue, TypeError> {
                    Ok(SqlValue::Int(i64::from(*self)))
                }
            }
        )*
    };
}

int_to_sql!(i8, i16, i32, i64, u8, u16, u32);

impl ToSql for u64 {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        i64::try_from(*self)
            .map(SqlValue::Int)
            .map_err(|_| TypeError::OutOfRange {
                target: "i64",
                value: self.to_string(),
            })
    }
}

impl ToSql for usize {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        i64::try_from(*self)
            .map(SqlValue::Int)
            .map_err(|_| TypeError::OutOfRange {
                target: "i64",
                value: self.to_string(),
            })
    }
}

impl ToSql for f32 {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Float(f64::from(*self)))
    }
}

impl ToSql for f64 {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Float(*self))
    }
}

impl ToSql for bool {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Bool(*self))
    }
}

impl ToSql for str {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Text(self.to_string()))
    }
}

impl ToSql for String {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Text(self.clone()))
    }
}

impl ToSql for [u8] {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Bytes(self.to_vec()))
    }
}

impl ToSql for Vec<u8> {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Bytes(self.clone()))
    }
}

#[cfg(feature = "chrono")]
impl ToSql for chrono::NaiveDate {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Date(*self))
    }
}

#[cfg(feature = "chrono")]
impl ToSql for chrono::NaiveDateTime {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::DateTime(*self))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_integers_widen() {
        assert_eq!(7i32.to_sql().unwrap(), SqlValue::Int(7));
        assert_eq!(7u8.to_sql().unwrap(), SqlValue::Int(7));
    }

    #[test]
    fn test_u64_overflow_rejected() {
        assert!(matches!(
            u64::MAX.to_sql(),
            Err(TypeError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_option_none_is_null() {
        let none: Option<i32> = None;
        assert_eq!(none.to_sql().unwrap(), SqlValue::Null);
        assert_eq!(Some("a").to_sql().unwrap(), SqlValue::Text("a".into()));
    }
}
