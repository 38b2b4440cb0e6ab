use crate::error::{LookupError, TableSide};
use analytics_columnar::{parse_number, ColumnType, Dataset, Value};
use serde::{Deserialize, Serialize};

/// A literal from a filter request: a JSON number or string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredicateLiteral {
    Number(f64),
    Text(String),
}

impl From<f64> for PredicateLiteral {
    fn from(value: f64) -> Self {
        PredicateLiteral::Number(value)
    }
}

impl From<&str> for PredicateLiteral {
    fn from(value: &str) -> Self {
        PredicateLiteral::Text(value.to_string())
    }
}

/// `column == value`, as requested by a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterPredicate {
    pub column: String,
    pub value: PredicateLiteral,
}

impl FilterPredicate {
    pub fn new(column: impl Into<String>, value: impl Into<PredicateLiteral>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// A literal after coercion against the column it is compared with.
#[derive(Clone, Debug, PartialEq)]
pub enum CoercedLiteral {
    Numeric(f64),
    /// Compared with the cell's display string.
    Textual(String),
}

impl CoercedLiteral {
    /// Missing cells never match.
    pub fn matches(&self, cell: &Value) -> bool {
        match (self, cell) {
            (_, Value::Missing) => false,
            (CoercedLiteral::Numeric(n), Value::Number(v)) => v == n,
            (CoercedLiteral::Numeric(_), _) => false,
            (CoercedLiteral::Textual(s), cell) => cell.to_string() == *s,
        }
    }
}

/// Numeric columns compare numerically when the literal is, or parses as, a number.
/// Everything else compares textually.
pub fn coerce_literal(literal: &PredicateLiteral, column_type: ColumnType) -> CoercedLiteral {
    match (literal, column_type.is_numeric()) {
        (PredicateLiteral::Number(n), true) => CoercedLiteral::Numeric(*n),
        (PredicateLiteral::Text(s), true) => match parse_number(s) {
            Some(n) => CoercedLiteral::Numeric(n),
            None => CoercedLiteral::Textual(s.clone()),
        },
        (PredicateLiteral::Number(n), false) => {
            CoercedLiteral::Textual(Value::Number(*n).to_string())
        }
        (PredicateLiteral::Text(s), false) => CoercedLiteral::Textual(s.clone()),
    }
}

/// Ensure `return_column` and every filter column exist in `lookup`.
pub(crate) fn validate(
    lookup: &Dataset,
    return_column: &str,
    filters: &[FilterPredicate],
) -> Result<(), LookupError> {
    if !lookup.contains_column(return_column) {
        return Err(LookupError::column_not_found(return_column, TableSide::Lookup));
    }
    match filters.iter().find(|f| !lookup.contains_column(&f.column)) {
        Some(missing) => Err(LookupError::column_not_found(&missing.column, TableSide::Lookup)),
        None => Ok(()),
    }
}

/// The `return_column` value of the first row satisfying every predicate, or
/// `fallback`. An empty predicate list selects the first row.
pub fn lookup_value(
    lookup: &Dataset,
    return_column: &str,
    filters: &[FilterPredicate],
    fallback: &Value,
) -> Result<Value, LookupError> {
    validate(lookup, return_column, filters)?;

    let mut compiled = Vec::with_capacity(filters.len());
    for filter in filters {
        let column = lookup.require_column(&filter.column)?;
        compiled.push((column, coerce_literal(&filter.value, column.column_type())));
    }

    let first = (0..lookup.row_count()).find(|&row| {
        compiled
            .iter()
            .all(|(column, literal)| column.get(row).is_some_and(|cell| literal.matches(cell)))
    });

    Ok(match first {
        Some(row) => lookup
            .value(row, return_column)
            .cloned()
            .unwrap_or_default(),
        None => fallback.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics_columnar::Column;
    use pretty_assertions::assert_eq;

    fn lookup() -> Dataset {
        Dataset::new(vec![
            Column::from_values("region", vec!["East".into(), "West".into(), "East".into()]),
            Column::from_values("year", vec![2023.into(), 2024.into(), 2024.into()]),
            Column::from_values("target", vec![100.into(), 200.into(), 300.into()]),
        ])
        .unwrap()
    }

    #[test]
    fn coercion_is_explicit() {
        assert_eq!(
            coerce_literal(&"2024".into(), ColumnType::Number),
            CoercedLiteral::Numeric(2024.0)
        );
        assert_eq!(
            coerce_literal(&"soon".into(), ColumnType::Number),
            CoercedLiteral::Textual("soon".into())
        );
        assert_eq!(
            coerce_literal(&5.0.into(), ColumnType::Text),
            CoercedLiteral::Textual("5".into())
        );
        assert!(!CoercedLiteral::Textual("".into()).matches(&Value::Missing));
    }

    #[test]
    fn first_row_satisfying_all_predicates() {
        let filters = [
            FilterPredicate::new("region", "East"),
            FilterPredicate::new("year", "2024"),
        ];
        let value = lookup_value(&lookup(), "target", &filters, &Value::Missing).unwrap();
        assert_eq!(value, Value::from(300));
    }

    #[test]
    fn no_match_and_no_filters() {
        let filters = [FilterPredicate::new("region", "North")];
        let value = lookup_value(&lookup(), "target", &filters, &"none".into()).unwrap();
        assert_eq!(value, Value::from("none"));

        let value = lookup_value(&lookup(), "target", &[], &Value::Missing).unwrap();
        assert_eq!(value, Value::from(100));
    }

    #[test]
    fn unknown_filter_column_is_reported() {
        let filters = [FilterPredicate::new("quarter", 1.0)];
        assert_eq!(
            lookup_value(&lookup(), "target", &filters, &Value::Missing),
            Err(LookupError::ColumnNotFound {
                column: "quarter".into(),
                side: TableSide::Lookup
            })
        );
    }

    #[test]
    fn literals_decode_from_json() {
        let filters: Vec<FilterPredicate> = serde_json::from_str(
            r#"[{"column": "year", "value": 2024}, {"column": "region", "value": "West"}]"#,
        )
        .unwrap();
        assert_eq!(filters[0].value, PredicateLiteral::Number(2024.0));
        assert_eq!(filters[1].value, PredicateLiteral::Text("West".into()));
    }
}
