use analytics_columnar::{Dataset, DatasetProfile};
use serde::Serialize;

/// What a persisted payload is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// A dataset uploaded as the working dataset.
    Original,
    LookupTable,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Original => "original",
            DataType::LookupTable => "lookup_table",
        }
    }
}

/// Input to [`crate::Storage::save_dataset`].
#[derive(Debug, Clone, Copy)]
pub struct NewDataset<'a> {
    pub name: &'a str,
    pub filename: &'a str,
    pub data_type: DataType,
    pub dataset: &'a Dataset,
    pub profile: &'a DatasetProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetMeta {
    pub id: i64,
    pub name: String,
    pub filename: String,
    /// Estimated in-memory size in whole kilobytes.
    pub file_size: i64,
    pub rows: i64,
    pub columns: i64,
    pub created_at: String,
}

/// Registry entry for a lookup table, as listed to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupTableSummary {
    pub id: i64,
    pub name: String,
    pub rows: i64,
    pub columns: i64,
    pub column_info: serde_json::Value,
    pub preview: serde_json::Value,
}
