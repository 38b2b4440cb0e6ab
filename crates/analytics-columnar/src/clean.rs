#![forbid(unsafe_code)]

use crate::parse::parse_number;
use crate::profile::{median, mode};
use crate::table::{Column, Dataset, DatasetError};
use crate::types::{ColumnType, Value};
use statrs::statistics::Statistics;
use std::str::FromStr;
use thiserror::Error;

/// Input errors shared by the cleaning, outlier and conversion transforms.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("unknown method: {0}")]
    UnknownMethod(String),
    #[error("custom cleaning requires a fill value")]
    MissingFillValue,
    #[error("column {0} not found")]
    ColumnNotFound(String),
    #[error("column {0} is not numeric")]
    NotNumeric(String),
    #[error("unknown target type: {0}")]
    UnknownTarget(String),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// How [`clean_missing`] treats missing cells.
#[derive(Clone, Debug, PartialEq)]
pub enum CleanMethod {
    /// Drop every row with at least one missing cell.
    Drop,
    Mean,
    Median,
    /// Fill every column with its most frequent value.
    Mode,
    Zero,
    /// Fill every missing cell with a user supplied value.
    Custom(String),
}

impl CleanMethod {
    pub fn from_parts(method: &str, fill_value: Option<&str>) -> Result<Self, TransformError> {
        match method.parse::<CleanMethodName>()? {
            CleanMethodName::Custom => fill_value
                .map(|v| CleanMethod::Custom(v.to_string()))
                .ok_or(TransformError::MissingFillValue),
            CleanMethodName::Drop => Ok(CleanMethod::Drop),
            CleanMethodName::Mean => Ok(CleanMethod::Mean),
            CleanMethodName::Median => Ok(CleanMethod::Median),
            CleanMethodName::Mode => Ok(CleanMethod::Mode),
            CleanMethodName::Zero => Ok(CleanMethod::Zero),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CleanMethod::Drop => "drop",
            CleanMethod::Mean => "mean",
            CleanMethod::Median => "median",
            CleanMethod::Mode => "mode",
            CleanMethod::Zero => "zero",
            CleanMethod::Custom(_) => "custom",
        }
    }
}

enum CleanMethodName {
    Drop,
    Mean,
    Median,
    Mode,
    Zero,
    Custom,
}

impl FromStr for CleanMethodName {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "drop" => CleanMethodName::Drop,
            "mean" => CleanMethodName::Mean,
            "median" => CleanMethodName::Median,
            "mode" => CleanMethodName::Mode,
            "zero" => CleanMethodName::Zero,
            "custom" => CleanMethodName::Custom,
            _ => return Err(TransformError::UnknownMethod(s.to_string())),
        })
    }
}

pub fn clean_missing(dataset: &Dataset, method: &CleanMethod) -> Result<Dataset, TransformError> {
    if let CleanMethod::Drop = method {
        let cleaned = dataset.filter_rows(|row| {
            dataset
                .columns()
                .all(|c| c.get(row).is_some_and(|v| !v.is_missing()))
        });
        log::debug!(
            "dropped {} rows with missing values",
            dataset.row_count() - cleaned.row_count()
        );
        return Ok(cleaned);
    }

    let mut out = dataset.clone();
    for column in dataset.columns() {
        if column.missing_count() == 0 {
            continue;
        }
        let Some(fill) = fill_value_for(column, method) else {
            continue;
        };
        out = out.with_column(fill_missing(column, &fill))?;
    }
    Ok(out)
}

fn fill_value_for(column: &Column, method: &CleanMethod) -> Option<Value> {
    let numeric = column.column_type().is_numeric();
    match method {
        CleanMethod::Drop => None,
        CleanMethod::Mean if numeric => {
            let values = column.numbers();
            (!values.is_empty()).then(|| Value::number(values.iter().mean()))
        }
        CleanMethod::Median if numeric => median(&column.numbers()).map(Value::Number),
        CleanMethod::Zero if numeric => Some(Value::Number(0.0)),
        CleanMethod::Mean | CleanMethod::Median | CleanMethod::Zero => None,
        CleanMethod::Mode => mode(column),
        CleanMethod::Custom(text) => Some(match parse_number(text) {
            Some(n) if numeric => Value::Number(n),
            _ => Value::Text(text.clone()),
        }),
    }
}

fn fill_missing(column: &Column, fill: &Value) -> Column {
    let values: Vec<Value> = column
        .values()
        .iter()
        .map(|v| if v.is_missing() { fill.clone() } else { v.clone() })
        .collect();
    match column.column_type() {
        ColumnType::Category => Column::new(column.name(), ColumnType::Category, values),
        _ => Column::from_values(column.name(), values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::DatasetBuilder;
    use pretty_assertions::assert_eq;

    fn dataset() -> Dataset {
        let mut builder = DatasetBuilder::new(vec!["n", "s"]);
        builder.push_row(vec![1.into(), "x".into()]).unwrap();
        builder.push_row(vec![Value::Missing, "y".into()]).unwrap();
        builder.push_row(vec![5.into(), Value::Missing]).unwrap();
        builder.push_row(vec![6.into(), "x".into()]).unwrap();
        builder.finish().unwrap()
    }

    #[test]
    fn parses_method_names() {
        assert_eq!(CleanMethod::from_parts("Mean", None), Ok(CleanMethod::Mean));
        assert_eq!(
            CleanMethod::from_parts("custom", Some("n/a")),
            Ok(CleanMethod::Custom("n/a".into()))
        );
        assert_eq!(
            CleanMethod::from_parts("custom", None),
            Err(TransformError::MissingFillValue)
        );
        assert_eq!(
            CleanMethod::from_parts("interpolate", None),
            Err(TransformError::UnknownMethod("interpolate".into()))
        );
    }

    #[test]
    fn drop_keeps_row_ids_of_complete_rows() {
        let cleaned = clean_missing(&dataset(), &CleanMethod::Drop).unwrap();
        assert_eq!(cleaned.row_ids(), &[0, 3]);
    }

    #[test]
    fn mean_and_median_only_touch_numeric_columns() {
        let cleaned = clean_missing(&dataset(), &CleanMethod::Mean).unwrap();
        assert_eq!(cleaned.value(1, "n"), Some(&Value::Number(4.0)));
        assert_eq!(cleaned.value(2, "s"), Some(&Value::Missing));

        let cleaned = clean_missing(&dataset(), &CleanMethod::Median).unwrap();
        assert_eq!(cleaned.value(1, "n"), Some(&Value::Number(5.0)));
    }

    #[test]
    fn mode_fills_every_column() {
        let cleaned = clean_missing(&dataset(), &CleanMethod::Mode).unwrap();
        assert_eq!(cleaned.value(2, "s"), Some(&Value::from("x")));
        // All numbers tie at one occurrence; the smallest wins.
        assert_eq!(cleaned.value(1, "n"), Some(&Value::Number(1.0)));
        assert_eq!(cleaned.missing_count(), 0);
    }

    #[test]
    fn custom_text_in_numeric_column_makes_it_mixed() {
        let cleaned = clean_missing(&dataset(), &CleanMethod::Custom("unknown".into())).unwrap();
        assert_eq!(cleaned.column("n").unwrap().column_type(), ColumnType::Mixed);
        assert_eq!(cleaned.value(2, "s"), Some(&Value::from("unknown")));

        let cleaned = clean_missing(&dataset(), &CleanMethod::Custom("7".into())).unwrap();
        assert_eq!(cleaned.column("n").unwrap().column_type(), ColumnType::Number);
        assert_eq!(cleaned.value(1, "n"), Some(&Value::Number(7.0)));
    }
}
