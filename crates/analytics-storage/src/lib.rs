//! SQLite-backed persistence for uploaded datasets and lookup tables.
//!
//! Exposes:
//! - SQLite schema creation
//! - Saving a dataset together with its preview and column metadata
//! - The lookup table registry (list, summarize, load, delete)
//! - Retrieval of the most recently uploaded original dataset

mod schema;
pub mod storage;
mod types;

pub use storage::{Storage, StorageError};
pub use types::{DataType, DatasetMeta, LookupTableSummary, NewDataset};
