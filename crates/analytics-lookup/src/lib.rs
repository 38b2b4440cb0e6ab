//! Spreadsheet-style lookups (VLOOKUP, XLOOKUP, LOOKUPVALUE) over columnar datasets.
//!
//! A lookup table is reduced to an [`Association`] (first column -> return column),
//! a [`Matcher`] resolves probes against it under one [`MatchMode`], and [`apply`]
//! derives a whole column from a [`MatchRequest`].

#![forbid(unsafe_code)]

mod apply;
mod association;
mod error;
mod filter;
mod key;
mod matcher;

pub use crate::apply::{apply, lookup_column, MatchRequest, MatchSemantics};
pub use crate::association::Association;
pub use crate::error::{LookupError, TableSide};
pub use crate::filter::{coerce_literal, lookup_value, CoercedLiteral, FilterPredicate, PredicateLiteral};
pub use crate::key::LookupKey;
pub use crate::matcher::{query, MatchMode, Matcher};
