//! Fuzz conversions out of SQL values.
//!
//! Every `FromSql` conversion must return a value or a `TypeError`, never panic.

#![no_main]

use arbitrary::Arbitrary;
use dbservice_types::{FromSql, SqlValue};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Input {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl From<Input> for SqlValue {
    fn from(input: Input) -> Self {
        match input {
            Input::Null => SqlValue::Null,
            Input::Bool(b) => SqlValue::Bool(b),
            Input::Int(i) => SqlValue::Int(i),
            Input::Float(f) => SqlValue::Float(f),
            Input::Text(s) => SqlValue::Text(s),
            Input::Bytes(b) => SqlValue::Bytes(b),
        }
    }
}

fuzz_target!(|input: Input| {
    let value = SqlValue::from(input);

    let _ = bool::from_sql(&value);
    let _ = i16::from_sql(&value);
    let _ = i32::from_sql(&value);
    let _ = i64::from_sql(&value);
    let _ = u8::from_sql(&value);
    let _ = f32::from_sql(&value);
    let _ = f64::from_sql(&value);
    let _ = String::from_sql(&value);
    let _ = Vec::<u8>::from_sql(&value);
    let _ = Option::<i64>::from_sql(&value);
    let _ = chrono::NaiveDate::from_sql(&value);
    let _ = chrono::NaiveDateTime::from_sql(&value);
    let _ = value.to_string();
});
