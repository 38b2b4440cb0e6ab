#![forbid(unsafe_code)]

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

const TIMESTAMP_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Declared kind of a column; drives comparison and profiling semantics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Number,
    #[default]
    Text,
    Timestamp,
    Category,
    /// Non-missing values of more than one kind (e.g. numbers plus a text fallback).
    Mixed,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Number)
    }

    /// Dataframe-style dtype label reported to clients.
    pub fn dtype_name(self) -> &'static str {
        match self {
            ColumnType::Number => "float64",
            ColumnType::Text | ColumnType::Mixed => "object",
            ColumnType::Timestamp => "datetime64[ns]",
            ColumnType::Category => "category",
        }
    }

    /// Infer the narrowest kind that describes every non-missing value.
    ///
    /// An all-missing column is reported as `Number` (a column of NaNs).
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> ColumnType {
        let mut seen: Option<ValueKind> = None;
        for value in values {
            let Some(kind) = value.kind() else {
                continue;
            };
            match seen {
                None => seen = Some(kind),
                Some(prev) if prev == kind => {}
                Some(_) => return ColumnType::Mixed,
            }
        }

        match seen {
            None | Some(ValueKind::Number) => ColumnType::Number,
            Some(ValueKind::Text) => ColumnType::Text,
            Some(ValueKind::Timestamp) => ColumnType::Timestamp,
        }
    }
}

/// Kind of a non-missing [`Value`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Number,
    Text,
    Timestamp,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Number => "number",
            ValueKind::Text => "text",
            ValueKind::Timestamp => "timestamp",
        })
    }
}

/// A single cell.
///
/// `Number` never holds NaN: constructors normalize NaN to [`Value::Missing`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    #[default]
    Missing,
    Number(f64),
    Text(String),
    /// Milliseconds since the Unix epoch (UTC).
    Timestamp(i64),
}

impl Value {
    pub fn number(n: f64) -> Self {
        if n.is_nan() {
            Value::Missing
        } else {
            Value::Number(n)
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Missing => None,
            Value::Number(_) => Some(ValueKind::Number),
            Value::Text(_) => Some(ValueKind::Text),
            Value::Timestamp(_) => Some(ValueKind::Timestamp),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Decode a JSON request value (e.g. an `ifNotFound` fallback).
    ///
    /// Booleans and nested values degrade to their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Missing,
            serde_json::Value::Number(n) => n.as_f64().map(Value::number).unwrap_or_default(),
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Bool(b) => Value::Text(if *b { "True" } else { "False" }.to_string()),
            other => Value::Text(other.to_string()),
        }
    }

    /// JSON rendering used by dataset previews: numeric columns emit numbers,
    /// every other column emits display strings.
    pub fn to_preview_json(&self, column_type: ColumnType) -> serde_json::Value {
        match self {
            Value::Missing => serde_json::Value::Null,
            Value::Number(n) if column_type.is_numeric() => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            other => serde_json::Value::String(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Text(s) => f.write_str(s),
            Value::Timestamp(ms) => match DateTime::from_timestamp_millis(*ms) {
                Some(dt) => write!(f, "{}", dt.naive_utc().format(TIMESTAMP_DISPLAY_FORMAT)),
                None => write!(f, "{ms}"),
            },
        }
    }
}

/// Integral values print without a fractional part so `10.0` round-trips as `10`.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Missing)
    }
}
