#![forbid(unsafe_code)]

use crate::table::{Column, Dataset};
use crate::types::Value;
use serde::Serialize;
use statrs::statistics::{Data, Median, Statistics};
use std::collections::{HashMap, HashSet};

pub const DEFAULT_PREVIEW_ROWS: usize = 10;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BasicInfo {
    pub rows: usize,
    pub columns: usize,
    pub file_size: String,
    pub missing_values: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub dtype: &'static str,
    pub missing_count: usize,
    pub unique_count: usize,
    #[serde(flatten)]
    pub summary: ColumnSummary,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnSummary {
    Numeric {
        mean: Option<f64>,
        std: Option<f64>,
        min: Option<f64>,
        max: Option<f64>,
    },
    Categorical {
        top_value: Option<String>,
    },
}

pub type PreviewRow = serde_json::Map<String, serde_json::Value>;

/// Everything a client needs to render a dataset summary.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DatasetProfile {
    pub basic_info: BasicInfo,
    pub column_info: Vec<ColumnInfo>,
    pub preview: Vec<PreviewRow>,
}

pub fn profile(dataset: &Dataset, preview_rows: usize) -> DatasetProfile {
    DatasetProfile {
        basic_info: basic_info(dataset),
        column_info: column_info(dataset),
        preview: preview(dataset, preview_rows),
    }
}

pub fn basic_info(dataset: &Dataset) -> BasicInfo {
    BasicInfo {
        rows: dataset.row_count(),
        columns: dataset.column_count(),
        file_size: format!("{:.1} KB", dataset.estimated_size_bytes() as f64 / 1024.0),
        missing_values: dataset.missing_count(),
    }
}

pub fn column_info(dataset: &Dataset) -> Vec<ColumnInfo> {
    dataset
        .columns()
        .map(|column| ColumnInfo {
            name: column.name().to_string(),
            dtype: column.column_type().dtype_name(),
            missing_count: column.missing_count(),
            unique_count: unique_count(column),
            summary: summarize(column),
        })
        .collect()
}

pub fn preview(dataset: &Dataset, rows: usize) -> Vec<PreviewRow> {
    (0..dataset.row_count().min(rows))
        .map(|row| {
            dataset
                .columns()
                .map(|column| {
                    let value = column.get(row).unwrap_or(&Value::Missing);
                    (
                        column.name().to_string(),
                        value.to_preview_json(column.column_type()),
                    )
                })
                .collect()
        })
        .collect()
}

fn summarize(column: &Column) -> ColumnSummary {
    if column.column_type().is_numeric() {
        let values = column.numbers();
        ColumnSummary::Numeric {
            mean: finite(values.iter().mean()),
            std: finite(values.iter().std_dev()),
            min: finite(Statistics::min(values.iter())),
            max: finite(Statistics::max(values.iter())),
        }
    } else {
        ColumnSummary::Categorical {
            top_value: mode(column).map(|v| v.to_string()),
        }
    }
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// Number of distinct non-missing values.
pub fn unique_count(column: &Column) -> usize {
    column
        .values()
        .iter()
        .filter(|v| !v.is_missing())
        .map(distinct_key)
        .collect::<HashSet<_>>()
        .len()
}

/// Most frequent non-missing value; ties resolve to the smallest value.
pub fn mode(column: &Column) -> Option<Value> {
    let mut counts: HashMap<DistinctKey, (usize, &Value)> = HashMap::new();
    for value in column.values().iter().filter(|v| !v.is_missing()) {
        counts.entry(distinct_key(value)).or_insert((0, value)).0 += 1;
    }

    counts
        .into_values()
        .max_by(|(ca, va), (cb, vb)| ca.cmp(cb).then_with(|| compare_values(vb, va)))
        .map(|(_, v)| v.clone())
}

/// Median of the non-missing numbers, if any.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    finite(Data::new(values.to_vec()).median())
}

/// Quantile with linear interpolation between the closest ranks.
///
/// `statrs` quantiles use a different estimator; outlier fences must match the
/// usual dataframe definition.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum DistinctKey {
    Number(u64),
    Text(String),
    Timestamp(i64),
    Missing,
}

fn distinct_key(value: &Value) -> DistinctKey {
    match value {
        // Fold -0.0 into 0.0 so both count once.
        Value::Number(n) => DistinctKey::Number((n + 0.0).to_bits()),
        Value::Text(s) => DistinctKey::Text(s.clone()),
        Value::Timestamp(ms) => DistinctKey::Timestamp(*ms),
        Value::Missing => DistinctKey::Missing,
    }
}

/// Total order used for tie-breaking: numbers < timestamps < text.
fn compare_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Number(_) => 0,
            Value::Timestamp(_) => 1,
            Value::Text(_) => 2,
            Value::Missing => 3,
        }
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.total_cmp(y),
        (Value::Timestamp(x), Value::Timestamp(y)) => x.cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::DatasetBuilder;
    use pretty_assertions::assert_eq;

    fn dataset() -> Dataset {
        let mut builder = DatasetBuilder::new(vec!["n", "s"]);
        builder.push_row(vec![1.into(), "b".into()]).unwrap();
        builder.push_row(vec![2.into(), "a".into()]).unwrap();
        builder.push_row(vec![Value::Missing, "b".into()]).unwrap();
        builder.push_row(vec![3.into(), "a".into()]).unwrap();
        builder.finish().unwrap()
    }

    #[test]
    fn numeric_summary_uses_sample_std() {
        let info = column_info(&dataset());
        assert_eq!(info[0].dtype, "float64");
        assert_eq!(info[0].missing_count, 1);
        assert_eq!(info[0].unique_count, 3);
        assert_eq!(
            info[0].summary,
            ColumnSummary::Numeric {
                mean: Some(2.0),
                std: Some(1.0),
                min: Some(1.0),
                max: Some(3.0),
            }
        );
    }

    #[test]
    fn top_value_breaks_ties_by_smallest() {
        let info = column_info(&dataset());
        assert_eq!(
            info[1].summary,
            ColumnSummary::Categorical {
                top_value: Some("a".into())
            }
        );
    }

    #[test]
    fn preview_keeps_column_order_and_types() {
        let rows = preview(&dataset(), 10);
        assert_eq!(rows.len(), 4);
        let json = serde_json::to_string(&rows[2]).unwrap();
        assert_eq!(json, r#"{"n":null,"s":"b"}"#);
        assert_eq!(rows[0]["n"], serde_json::json!(1.0));
    }

    #[test]
    fn basic_info_counts_missing() {
        let info = basic_info(&dataset());
        assert_eq!(info.rows, 4);
        assert_eq!(info.columns, 2);
        assert_eq!(info.missing_values, 1);
        assert!(info.file_size.ends_with(" KB"));
    }

    #[test]
    fn linear_quantiles() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&values, 0.25), Some(1.75));
        assert_eq!(quantile(&values, 0.5), Some(2.5));
        assert_eq!(quantile(&values, 1.0), Some(4.0));
        assert_eq!(quantile(&[], 0.5), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
    }
}
