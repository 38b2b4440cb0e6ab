#![forbid(unsafe_code)]

use crate::clean::TransformError;
use crate::isolation::{isolation_outliers, IsolationForestParams};
use crate::profile::quantile;
use crate::table::Dataset;
use statrs::statistics::Statistics;
use std::collections::HashSet;
use std::str::FromStr;

pub const DEFAULT_ZSCORE_THRESHOLD: f64 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OutlierMethod {
    ZScore { threshold: f64 },
    Iqr,
    IsolationForest(IsolationForestParams),
}

impl Default for OutlierMethod {
    fn default() -> Self {
        OutlierMethod::ZScore {
            threshold: DEFAULT_ZSCORE_THRESHOLD,
        }
    }
}

impl FromStr for OutlierMethod {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zscore" | "z-score" => Ok(OutlierMethod::default()),
            "iqr" => Ok(OutlierMethod::Iqr),
            "isolation_forest" => Ok(OutlierMethod::IsolationForest(
                IsolationForestParams::default(),
            )),
            _ => Err(TransformError::UnknownMethod(s.to_string())),
        }
    }
}

/// Row ids of the outliers in `column`, in row order. Missing cells are ignored.
pub fn detect_outliers(
    dataset: &Dataset,
    column: &str,
    method: OutlierMethod,
) -> Result<Vec<u64>, TransformError> {
    let col = dataset
        .column(column)
        .ok_or_else(|| TransformError::ColumnNotFound(column.to_string()))?;
    if !col.column_type().is_numeric() {
        return Err(TransformError::NotNumeric(column.to_string()));
    }

    let values = col.numbers();
    let flags: Vec<bool> = match method {
        OutlierMethod::ZScore { threshold } => {
            let mean = values.iter().mean();
            let std = values.iter().std_dev();
            // A constant or single-value column has no outliers.
            if !std.is_finite() || std == 0.0 {
                return Ok(Vec::new());
            }
            values
                .iter()
                .map(|v| ((v - mean) / std).abs() > threshold)
                .collect()
        }
        OutlierMethod::Iqr => {
            let (Some(q1), Some(q3)) = (quantile(&values, 0.25), quantile(&values, 0.75)) else {
                return Ok(Vec::new());
            };
            let iqr = q3 - q1;
            let (lower, upper) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
            values.iter().map(|&v| v < lower || v > upper).collect()
        }
        OutlierMethod::IsolationForest(params) => isolation_outliers(&values, params),
    };

    // `flags` runs parallel to the non-missing numbers of the column.
    let ids = dataset.row_ids();
    Ok(col
        .values()
        .iter()
        .enumerate()
        .filter(|(_, v)| v.as_number().is_some())
        .zip(flags)
        .filter_map(|((row, _), flagged)| flagged.then_some(ids[row]))
        .collect())
}

pub fn remove_outliers(
    dataset: &Dataset,
    column: &str,
    method: OutlierMethod,
) -> Result<Dataset, TransformError> {
    let outliers: HashSet<u64> = detect_outliers(dataset, column, method)?.into_iter().collect();
    log::debug!("removing {} outliers from {column}", outliers.len());
    Ok(dataset.drop_row_ids(&outliers))
}
