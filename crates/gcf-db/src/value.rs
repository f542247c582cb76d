//! Cell values shared by source files, SQLite rows and graph records.

use std::fmt;

use chrono::NaiveDate;
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};

use crate::schema::ColumnKind;

/// A single typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Real(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Text form used as a lookup key. `None` for NULL.
    pub fn as_key(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Text(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Convert to the declared column type.
    ///
    /// Empty text becomes NULL for every non-text kind.
    pub fn coerce(self, kind: ColumnKind) -> Result<Value, String> {
        match (kind, self) {
            (_, Value::Null) => Ok(Value::Null),
            (ColumnKind::Text, Value::Text(s)) => Ok(Value::Text(s)),
            (ColumnKind::Text, Value::Real(f)) if f.fract() == 0.0 => {
                Ok(Value::Text((f as i64).to_string()))
            }
            (ColumnKind::Text, other) => Ok(Value::Text(other.to_string())),
            (_, Value::Text(s)) if s.trim().is_empty() => Ok(Value::Null),

            (ColumnKind::Integer, Value::Integer(i)) => Ok(Value::Integer(i)),
            (ColumnKind::Integer, Value::Real(f)) if f.fract() == 0.0 => {
                Ok(Value::Integer(f as i64))
            }
            (ColumnKind::Integer, Value::Boolean(b)) => Ok(Value::Integer(b as i64)),
            (ColumnKind::Integer, Value::Text(s)) => parse_integer(&s),

            (ColumnKind::Real, Value::Real(f)) => Ok(Value::Real(f)),
            (ColumnKind::Real, Value::Integer(i)) => Ok(Value::Real(i as f64)),
            (ColumnKind::Real, Value::Text(s)) => s
                .trim()
                .replace(',', "")
                .parse::<f64>()
                .map(Value::Real)
                .map_err(|_| format!("'{}' is not a number", s)),

            (ColumnKind::Boolean, Value::Boolean(b)) => Ok(Value::Boolean(b)),
            (ColumnKind::Boolean, Value::Integer(i)) => Ok(Value::Boolean(i != 0)),
            (ColumnKind::Boolean, Value::Text(s)) => parse_boolean(&s),

            (ColumnKind::Date, Value::Text(s)) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map(|d| Value::Text(d.format("%Y-%m-%d").to_string()))
                .map_err(|_| format!("'{}' is not an ISO date", s)),

            (kind, other) => Err(format!("cannot store {:?} as {:?}", other, kind)),
        }
    }

    /// Read a SQLite cell, restoring booleans from their integer storage.
    pub fn from_sql(value: ValueRef<'_>, kind: ColumnKind) -> Value {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) if kind == ColumnKind::Boolean => Value::Boolean(i != 0),
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                Value::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }
}

fn parse_integer(s: &str) -> Result<Value, String> {
    let trimmed = s.trim().replace(',', "");
    if let Ok(i) = trimmed.parse::<i64>() {
        return Ok(Value::Integer(i));
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 => Ok(Value::Integer(f as i64)),
        _ => Err(format!("'{}' is not an integer", s)),
    }
}

fn parse_boolean(s: &str) -> Result<Value, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(Value::Boolean(true)),
        "false" | "f" | "no" | "n" | "0" => Ok(Value::Boolean(false)),
        _ => Err(format!("'{}' is not a boolean", s)),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<Option<i64>> for Value {
    fn from(v: Option<i64>) -> Self {
        v.map_or(Value::Null, Value::Integer)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Boolean(b) => ToSqlOutput::Owned(SqlValue::Integer(*b as i64)),
        })
    }
}
