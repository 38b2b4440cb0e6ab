#![forbid(unsafe_code)]

use crate::types::{ColumnType, Value};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DatasetError {
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),
    #[error("column {column} has {actual} values, expected {expected}")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[error("row has {actual} values, expected {expected}")]
    SchemaMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, DatasetError>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    column_type: ColumnType,
    values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            column_type,
            values,
        }
    }

    /// Build a column whose type is inferred from its values.
    pub fn from_values(name: impl Into<String>, values: Vec<Value>) -> Self {
        let column_type = ColumnType::infer(&values);
        Self::new(name, column_type, values)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&Value> {
        self.values.get(row)
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_missing()).count()
    }

    /// Non-missing numeric values, in row order.
    pub fn numbers(&self) -> Vec<f64> {
        self.values.iter().filter_map(Value::as_number).collect()
    }

    fn take_rows(&self, rows: &[usize]) -> Column {
        Column {
            name: self.name.clone(),
            column_type: self.column_type,
            values: rows.iter().map(|&r| self.values[r].clone()).collect(),
        }
    }

    /// Rough in-memory footprint, used for the profile's `file_size`.
    fn estimated_size_bytes(&self) -> usize {
        self.values
            .iter()
            .map(|v| match v {
                Value::Text(s) => 49 + s.len(),
                _ => 8,
            })
            .sum()
    }
}

/// An ordered, columnar dataset with stable row identity.
///
/// Columns are shared behind `Arc`, so deriving a dataset with one extra column
/// copies pointers rather than cell data. Every operation returns a new value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DatasetRepr", into = "DatasetRepr")]
pub struct Dataset {
    columns: Vec<Arc<Column>>,
    column_index: HashMap<String, usize>,
    row_ids: Vec<u64>,
}

#[derive(Serialize, Deserialize)]
struct DatasetRepr {
    columns: Vec<Arc<Column>>,
    row_ids: Vec<u64>,
}

impl TryFrom<DatasetRepr> for Dataset {
    type Error = DatasetError;

    fn try_from(repr: DatasetRepr) -> Result<Self> {
        Dataset::from_parts(repr.columns, repr.row_ids)
    }
}

impl From<Dataset> for DatasetRepr {
    fn from(dataset: Dataset) -> Self {
        DatasetRepr {
            columns: dataset.columns,
            row_ids: dataset.row_ids,
        }
    }
}

impl Dataset {
    /// Build a dataset from equally sized columns; row ids start at zero.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let rows = columns.first().map(Column::len).unwrap_or(0);
        let row_ids = (0..rows as u64).collect();
        Self::from_parts(columns.into_iter().map(Arc::new).collect(), row_ids)
    }

    fn from_parts(columns: Vec<Arc<Column>>, row_ids: Vec<u64>) -> Result<Self> {
        let mut column_index = HashMap::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            if column.len() != row_ids.len() {
                return Err(DatasetError::ColumnLengthMismatch {
                    column: column.name.clone(),
                    expected: row_ids.len(),
                    actual: column.len(),
                });
            }
            if column_index.insert(column.name.clone(), idx).is_some() {
                return Err(DatasetError::DuplicateColumn(column.name.clone()));
            }
        }

        Ok(Self {
            columns,
            column_index,
            row_ids,
        })
    }

    pub fn row_count(&self) -> usize {
        self.row_ids.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_ids.is_empty()
    }

    pub fn row_ids(&self) -> &[u64] {
        &self.row_ids
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name())
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().map(|c| c.as_ref())
    }

    pub fn contains_column(&self, name: &str) -> bool {
        self.column_index.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        let idx = self.column_index.get(name)?;
        self.columns.get(*idx).map(|c| c.as_ref())
    }

    /// Like [`Dataset::column`] but reports the missing name as an error.
    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| DatasetError::UnknownColumn(name.to_string()))
    }

    pub fn column_at(&self, idx: usize) -> Option<&Column> {
        self.columns.get(idx).map(|c| c.as_ref())
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        self.column(column)?.get(row)
    }

    /// Append `column`, or replace the column with the same name in place.
    pub fn with_column(&self, column: Column) -> Result<Dataset> {
        let actual = column.len();
        if actual != self.row_count() {
            return Err(DatasetError::ColumnLengthMismatch {
                column: column.name,
                expected: self.row_count(),
                actual,
            });
        }

        let mut out = self.clone();
        match out.column_index.get(column.name()) {
            Some(&idx) => out.columns[idx] = Arc::new(column),
            None => {
                out.column_index.insert(column.name.clone(), out.columns.len());
                out.columns.push(Arc::new(column));
            }
        }
        Ok(out)
    }

    /// Keep rows for which `keep(row_index)` holds, preserving their row ids.
    pub fn filter_rows(&self, mut keep: impl FnMut(usize) -> bool) -> Dataset {
        let rows: Vec<usize> = (0..self.row_count()).filter(|&r| keep(r)).collect();
        self.take_rows(&rows)
    }

    /// Drop every row whose id is in `row_ids`.
    pub fn drop_row_ids(&self, row_ids: &HashSet<u64>) -> Dataset {
        let ids = &self.row_ids;
        self.filter_rows(|r| !row_ids.contains(&ids[r]))
    }

    /// First `n` rows (fewer if the dataset is shorter).
    pub fn head(&self, n: usize) -> Dataset {
        let rows: Vec<usize> = (0..self.row_count().min(n)).collect();
        self.take_rows(&rows)
    }

    fn take_rows(&self, rows: &[usize]) -> Dataset {
        Dataset {
            columns: self
                .columns
                .iter()
                .map(|c| Arc::new(c.take_rows(rows)))
                .collect(),
            column_index: self.column_index.clone(),
            row_ids: rows.iter().map(|&r| self.row_ids[r]).collect(),
        }
    }

    pub fn missing_count(&self) -> usize {
        self.columns.iter().map(|c| c.missing_count()).sum()
    }

    pub fn estimated_size_bytes(&self) -> usize {
        let index_bytes = 8 * self.row_count() + 128;
        index_bytes
            + self
                .columns
                .iter()
                .map(|c| c.estimated_size_bytes())
                .sum::<usize>()
    }
}

/// Row-oriented builder; column types are inferred when the dataset is finished.
///
/// The spreadsheet importer feeds decoded cell rows through this.
#[derive(Clone, Debug)]
pub struct DatasetBuilder {
    names: Vec<String>,
    columns: Vec<Vec<Value>>,
}

impl DatasetBuilder {
    pub fn new(names: Vec<impl Into<String>>) -> Self {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let width = names.len();
        Self {
            names,
            columns: vec![Vec::new(); width],
        }
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.names.len() {
            return Err(DatasetError::SchemaMismatch {
                expected: self.names.len(),
                actual: row.len(),
            });
        }
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.push(value);
        }
        Ok(())
    }

    /// True until the first row is pushed.
    pub fn is_empty(&self) -> bool {
        self.columns.first().map_or(true, Vec::is_empty)
    }

    pub fn finish(self) -> Result<Dataset> {
        let columns = self
            .names
            .into_iter()
            .zip(self.columns)
            .map(|(name, values)| Column::from_values(name, values))
            .collect();
        Dataset::new(columns)
    }
}
