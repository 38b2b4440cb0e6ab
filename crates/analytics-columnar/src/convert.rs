#![forbid(unsafe_code)]

use crate::clean::TransformError;
use crate::parse::{parse_number, parse_timestamp_millis, DateOrder};
use crate::table::{Column, Dataset};
use crate::types::{ColumnType, Value};
use std::str::FromStr;

const NANOS_PER_MILLI: f64 = 1_000_000.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversionTarget {
    String,
    Numeric,
    Datetime,
    Categorical,
}

impl FromStr for ConversionTarget {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" | "str" | "text" => Ok(ConversionTarget::String),
            "numeric" | "number" => Ok(ConversionTarget::Numeric),
            "datetime" => Ok(ConversionTarget::Datetime),
            "categorical" | "category" => Ok(ConversionTarget::Categorical),
            _ => Err(TransformError::UnknownTarget(s.to_string())),
        }
    }
}

/// Convert `column` in place; cells that cannot be converted become missing.
pub fn convert_column(
    dataset: &Dataset,
    column: &str,
    target: ConversionTarget,
) -> Result<Dataset, TransformError> {
    let source = dataset
        .column(column)
        .ok_or_else(|| TransformError::ColumnNotFound(column.to_string()))?;

    let converted = match target {
        ConversionTarget::String => Column::new(
            column,
            ColumnType::Text,
            map_values(source, |v| Value::Text(v.to_string())),
        ),
        ConversionTarget::Numeric => Column::new(column, ColumnType::Number, map_values(source, to_number)),
        ConversionTarget::Datetime => {
            Column::new(column, ColumnType::Timestamp, map_values(source, to_timestamp))
        }
        ConversionTarget::Categorical => {
            Column::new(column, ColumnType::Category, source.values().to_vec())
        }
    };

    let lost = converted.missing_count().saturating_sub(source.missing_count());
    if lost > 0 {
        log::warn!("{lost} values in {column} could not be converted to {target:?}");
    }
    Ok(dataset.with_column(converted)?)
}

fn map_values(column: &Column, f: impl Fn(&Value) -> Value) -> Vec<Value> {
    column
        .values()
        .iter()
        .map(|v| if v.is_missing() { Value::Missing } else { f(v) })
        .collect()
}

fn to_number(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(*n),
        Value::Text(s) => parse_number(s).map(Value::Number).unwrap_or_default(),
        Value::Timestamp(ms) => Value::Number(*ms as f64 * NANOS_PER_MILLI),
        Value::Missing => Value::Missing,
    }
}

fn to_timestamp(value: &Value) -> Value {
    match value {
        Value::Timestamp(ms) => Value::Timestamp(*ms),
        // Bare numbers are read as nanoseconds since the epoch.
        Value::Number(n) => Value::Timestamp((n / NANOS_PER_MILLI).floor() as i64),
        Value::Text(s) => parse_timestamp_millis(s, DateOrder::default())
            .map(Value::Timestamp)
            .unwrap_or_default(),
        Value::Missing => Value::Missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dataset() -> Dataset {
        Dataset::new(vec![
            Column::from_values("a", vec!["1".into(), "x".into(), Value::Missing, "2.5".into()]),
            Column::from_values(
                "d",
                vec!["2024-01-02".into(), "bad".into(), Value::Missing, "2024-01-03".into()],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn numeric_coerces_failures_to_missing() {
        let ds = convert_column(&dataset(), "a", ConversionTarget::Numeric).unwrap();
        let column = ds.column("a").unwrap();
        assert_eq!(column.column_type(), ColumnType::Number);
        assert_eq!(
            column.values(),
            &[Value::Number(1.0), Value::Missing, Value::Missing, Value::Number(2.5)]
        );
        assert_eq!(ds.column_names().collect::<Vec<_>>(), vec!["a", "d"]);
    }

    #[test]
    fn datetime_parses_text_and_nanosecond_numbers() {
        let ds = convert_column(&dataset(), "d", ConversionTarget::Datetime).unwrap();
        let column = ds.column("d").unwrap();
        assert_eq!(column.column_type().dtype_name(), "datetime64[ns]");
        assert_eq!(column.values()[0].to_string(), "2024-01-02 00:00:00");
        assert_eq!(column.values()[1], Value::Missing);

        let ds = Dataset::new(vec![Column::from_values("n", vec![86_400_000_000_000i64.into()])]).unwrap();
        let ds = convert_column(&ds, "n", ConversionTarget::Datetime).unwrap();
        assert_eq!(ds.value(0, "n"), Some(&Value::Timestamp(86_400_000)));
    }

    #[test]
    fn string_and_categorical_keep_missing() {
        let ds = convert_column(&dataset(), "a", ConversionTarget::Numeric).unwrap();
        let ds = convert_column(&ds, "a", ConversionTarget::String).unwrap();
        assert_eq!(ds.value(0, "a"), Some(&Value::from("1")));
        assert_eq!(ds.value(2, "a"), Some(&Value::Missing));

        let ds = convert_column(&ds, "a", ConversionTarget::Categorical).unwrap();
        assert_eq!(ds.column("a").unwrap().column_type(), ColumnType::Category);
    }

    #[test]
    fn unknown_column_and_target() {
        assert_eq!(
            convert_column(&dataset(), "zz", ConversionTarget::String),
            Err(TransformError::ColumnNotFound("zz".into()))
        );
        assert_eq!(
            "boolean".parse::<ConversionTarget>(),
            Err(TransformError::UnknownTarget("boolean".into()))
        );
    }
}
