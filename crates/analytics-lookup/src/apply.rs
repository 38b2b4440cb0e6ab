use crate::association::Association;
use crate::error::{LookupError, TableSide};
use crate::filter::{self, FilterPredicate};
use crate::matcher::{MatchMode, Matcher};
use analytics_columnar::{Column, Dataset, Value};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// How each source row is resolved.
#[derive(Clone, Debug, PartialEq)]
pub enum MatchSemantics {
    /// Probe the association with the row's `source_column` value.
    Keyed {
        source_column: String,
        mode: MatchMode,
    },
    /// One value per call: the first lookup row matching every filter,
    /// broadcast to every source row.
    FilteredFirst { filters: Vec<FilterPredicate> },
}

/// Everything needed to derive one column from a lookup table.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchRequest {
    pub return_column: String,
    pub result_column: String,
    pub if_not_found: Value,
    pub semantics: MatchSemantics,
}

impl MatchRequest {
    pub fn keyed(
        source_column: impl Into<String>,
        return_column: impl Into<String>,
        result_column: impl Into<String>,
        mode: MatchMode,
    ) -> Self {
        Self {
            return_column: return_column.into(),
            result_column: result_column.into(),
            if_not_found: Value::default(),
            semantics: MatchSemantics::Keyed {
                source_column: source_column.into(),
                mode,
            },
        }
    }

    pub fn filtered_first(
        return_column: impl Into<String>,
        result_column: impl Into<String>,
        filters: Vec<FilterPredicate>,
    ) -> Self {
        Self {
            return_column: return_column.into(),
            result_column: result_column.into(),
            if_not_found: Value::default(),
            semantics: MatchSemantics::FilteredFirst { filters },
        }
    }

    pub fn with_fallback(mut self, if_not_found: impl Into<Value>) -> Self {
        self.if_not_found = if_not_found.into();
        self
    }
}

/// Compute the derived column for `request` without touching either table.
///
/// All column references are validated before any row is evaluated; a row
/// error aborts the whole computation.
pub fn lookup_column(
    source: &Dataset,
    lookup: &Dataset,
    request: &MatchRequest,
) -> Result<Column, LookupError> {
    let values = match &request.semantics {
        MatchSemantics::Keyed {
            source_column,
            mode,
        } => {
            let probes = source
                .column(source_column)
                .ok_or_else(|| LookupError::column_not_found(source_column, TableSide::Source))?;
            let association = Association::build(lookup, &request.return_column)?;
            let matcher = Matcher::new(&association, *mode);
            resolve_rows(probes.values(), |probe| matcher.query(probe, &request.if_not_found))?
        }
        MatchSemantics::FilteredFirst { filters } => {
            let value = filter::lookup_value(
                lookup,
                &request.return_column,
                filters,
                &request.if_not_found,
            )?;
            vec![value; source.row_count()]
        }
    };

    Ok(Column::from_values(request.result_column.clone(), values))
}

/// Add (or replace in place) `request.result_column` on a copy of `source`.
pub fn apply(source: &Dataset, lookup: &Dataset, request: &MatchRequest) -> Result<Dataset, LookupError> {
    let column = lookup_column(source, lookup, request)?;
    log::debug!(
        "lookup produced {} ({} rows, {} missing)",
        request.result_column,
        column.len(),
        column.missing_count()
    );
    Ok(source.with_column(column)?)
}

#[cfg(feature = "parallel")]
fn resolve_rows<F>(probes: &[Value], resolve: F) -> Result<Vec<Value>, LookupError>
where
    F: Fn(&Value) -> Result<Value, LookupError> + Send + Sync,
{
    probes.par_iter().map(resolve).collect()
}

#[cfg(not(feature = "parallel"))]
fn resolve_rows<F>(probes: &[Value], resolve: F) -> Result<Vec<Value>, LookupError>
where
    F: Fn(&Value) -> Result<Value, LookupError>,
{
    probes.iter().map(resolve).collect()
}
