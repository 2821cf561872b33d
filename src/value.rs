use rusqlite::types::{ToSql, ToSqlOutput, Type, ValueRef};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Core value types for SQLite operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Boolean(bool),
}

impl Value {
    /// Name of the variant, used in type mismatch errors
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
            Value::Boolean(_) => "boolean",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Copy a column value out of SQLite. TEXT that is not valid UTF-8 is
    /// rejected the way rusqlite rejects it for `String`.
    pub(crate) fn from_sql_ref(column: usize, value: ValueRef<'_>) -> rusqlite::Result<Self> {
        Ok(match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => match std::str::from_utf8(t) {
                Ok(text) => Value::Text(text.to_string()),
                Err(err) => {
                    return Err(rusqlite::Error::FromSqlConversionFailure(
                        column,
                        Type::Text,
                        Box::new(err),
                    ))
                }
            },
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        })
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Borrowed(ValueRef::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            Value::Boolean(b) => ToSqlOutput::Borrowed(ValueRef::Integer(i64::from(*b))),
        })
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Blob(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A failed cast out of a [`Value`]: the name of the requested type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastError {
    pub expected: &'static str,
}

/// Explicit, fallible conversion out of a dynamically typed [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, CastError>;
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, CastError> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, CastError> {
        match value {
            Value::Integer(i) => Ok(*i),
            Value::Boolean(b) => Ok(i64::from(*b)),
            _ => Err(CastError { expected: "integer" }),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self, CastError> {
        let wide = i64::from_value(value).map_err(|_| CastError { expected: "i32" })?;
        i32::try_from(wide).map_err(|_| CastError { expected: "i32" })
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, CastError> {
        match value {
            Value::Real(f) => Ok(*f),
            // SQLite hands back whole-number REAL columns as integers
            Value::Integer(i) => Ok(*i as f64),
            _ => Err(CastError { expected: "real" }),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, CastError> {
        match value {
            Value::Boolean(b) => Ok(*b),
            Value::Integer(i) => Ok(*i != 0),
            _ => Err(CastError { expected: "boolean" }),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, CastError> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            _ => Err(CastError { expected: "text" }),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self, CastError> {
        match value {
            Value::Blob(b) => Ok(b.clone()),
            Value::Text(s) => Ok(s.as_bytes().to_vec()),
            _ => Err(CastError { expected: "blob" }),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, CastError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Composite dedup key built from row values.
///
/// `Value` holds reals, so it cannot be `Eq`; `RowKey` compares reals by bit
/// pattern, which is enough for identity keys.
#[derive(Debug, Clone)]
pub struct RowKey(pub Vec<Value>);

impl RowKey {
    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

impl PartialEq for RowKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().zip(&other.0).all(|(a, b)| key_eq(a, b))
    }
}

impl Eq for RowKey {}

impl Hash for RowKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.len().hash(state);
        for value in &self.0 {
            std::mem::discriminant(value).hash(state);
            match value {
                Value::Null => {}
                Value::Integer(i) => i.hash(state),
                Value::Real(f) => f.to_bits().hash(state),
                Value::Text(s) => s.hash(state),
                Value::Blob(b) => b.hash(state),
                Value::Boolean(b) => b.hash(state),
            }
        }
    }
}

fn key_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Real(x), Value::Real(y)) => x.to_bits() == y.to_bits(),
        _ => a == b,
    }
}
