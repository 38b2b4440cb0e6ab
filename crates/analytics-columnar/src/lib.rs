//! In-memory columnar datasets for the analytics service.
//!
//! This crate focuses on:
//! - A small value model (`Value`, `ColumnType`) and immutable `Dataset`s with stable row ids.
//! - CSV and Excel ingestion with type inference, and CSV export.
//! - Profiling plus the cleaning, outlier (z-score, IQR, isolation forest) and type conversion
//!   transforms.

#![forbid(unsafe_code)]

mod clean;
mod convert;
mod export;
mod import;
mod isolation;
mod outliers;
mod parse;
mod profile;
mod table;
mod types;

pub use crate::clean::{clean_missing, CleanMethod, TransformError};
pub use crate::convert::{convert_column, ConversionTarget};
pub use crate::export::{export_csv, ExportError};
pub use crate::import::{
    import_csv, import_excel, import_file, CsvOptions, CsvTextEncoding, FileFormat, ImportError,
    MISSING_MARKERS,
};
pub use crate::isolation::{anomaly_scores, isolation_outliers, IsolationForestParams};
pub use crate::outliers::{detect_outliers, remove_outliers, OutlierMethod, DEFAULT_ZSCORE_THRESHOLD};
pub use crate::parse::{parse_number, parse_timestamp_millis, DateOrder};
pub use crate::profile::{
    basic_info, column_info, preview, profile, BasicInfo, ColumnInfo, ColumnSummary,
    DatasetProfile, PreviewRow, DEFAULT_PREVIEW_ROWS,
};
pub use crate::table::{Column, Dataset, DatasetBuilder, DatasetError};
pub use crate::types::{format_number, ColumnType, Value, ValueKind};
