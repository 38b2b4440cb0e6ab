use crate::error::{LookupError, TableSide};
use crate::key::LookupKey;
use analytics_columnar::{Dataset, Value};
use std::collections::HashMap;

/// Insertion-ordered key -> value mapping built from a lookup table.
///
/// A repeated key keeps the position of its first appearance and takes the
/// value of its last one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Association {
    entries: Vec<(LookupKey, Value)>,
    index: HashMap<LookupKey, usize>,
}

impl Association {
    /// Pair the lookup table's first column with `return_column`.
    pub fn build(lookup: &Dataset, return_column: &str) -> Result<Self, LookupError> {
        let keys = lookup.column_at(0).ok_or(LookupError::EmptyLookupTable)?;
        let values = lookup
            .column(return_column)
            .ok_or_else(|| LookupError::column_not_found(return_column, TableSide::Lookup))?;

        let assoc = Self::from_pairs(keys.values().iter().cloned().zip(values.values().iter().cloned()));
        log::debug!(
            "built association on {} -> {return_column}: {} keys from {} rows",
            keys.name(),
            assoc.len(),
            lookup.row_count()
        );
        Ok(assoc)
    }

    /// Build from `(key, value)` pairs in order; missing keys are skipped.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Value, Value)>) -> Self {
        let mut assoc = Association::default();
        for (key, value) in pairs {
            if let Some(key) = LookupKey::from_value(&key) {
                assoc.insert(key, value);
            }
        }
        assoc
    }

    fn insert(&mut self, key: LookupKey, value: Value) {
        match self.index.get(&key) {
            Some(&pos) => self.entries[pos].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn get(&self, key: &LookupKey) -> Option<&Value> {
        self.index.get(key).map(|&pos| &self.entries[pos].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in build order.
    pub fn entries(&self) -> &[(LookupKey, Value)] {
        &self.entries
    }

    pub fn keys(&self) -> impl Iterator<Item = &LookupKey> {
        self.entries.iter().map(|(k, _)| k)
    }
}
