use analytics_columnar::{DatasetError, ValueKind};
use std::fmt;
use thiserror::Error;

/// Which table a lookup request referred to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableSide {
    /// The working dataset whose rows are probed.
    Source,
    /// The lookup table the association is built from.
    Lookup,
}

impl fmt::Display for TableSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TableSide::Source => "main dataset",
            TableSide::Lookup => "lookup table",
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("column '{column}' not found in {side}")]
    ColumnNotFound { column: String, side: TableSide },

    #[error("lookup table has no columns")]
    EmptyLookupTable,

    #[error("cannot order {left} values against {right} keys")]
    IncomparableKeys { left: ValueKind, right: ValueKind },

    #[error("approximate match requires numeric keys, found {0} keys")]
    NonNumericKey(ValueKind),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

impl LookupError {
    pub(crate) fn column_not_found(column: &str, side: TableSide) -> Self {
        LookupError::ColumnNotFound {
            column: column.to_string(),
            side,
        }
    }
}
