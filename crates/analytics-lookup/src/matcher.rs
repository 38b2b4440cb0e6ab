use crate::association::Association;
use crate::error::LookupError;
use crate::key::LookupKey;
use analytics_columnar::{Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// How a probe is matched against an [`Association`].
///
/// Every mode except `Exact` tries an exact hit first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Exact,
    /// Closest key by distance; ties go to the smaller key.
    ApproximateNearest,
    /// Smallest key greater than the probe.
    ExactOrNext,
    /// Largest key smaller than the probe.
    ExactOrPrevious,
    /// Case-insensitive substring match in either direction, in build order.
    Wildcard,
}

impl MatchMode {
    pub fn is_ordered(self) -> bool {
        matches!(
            self,
            MatchMode::ApproximateNearest | MatchMode::ExactOrNext | MatchMode::ExactOrPrevious
        )
    }
}

/// Ascending key order, computed once per matcher.
///
/// Key kinds are checked here but only reported when a query falls through
/// to the ordered scan, so missing probes and exact hits never fail.
#[derive(Debug)]
enum KeyOrder {
    /// Unordered mode, or an association without keys.
    Unneeded,
    Sorted {
        kind: ValueKind,
        /// Entry positions in ascending key order.
        ascending: Vec<usize>,
    },
    Mixed {
        first: ValueKind,
        other: ValueKind,
    },
}

impl KeyOrder {
    fn prepare(association: &Association) -> Self {
        let mut kinds = association.keys().map(LookupKey::kind);
        let Some(kind) = kinds.next() else {
            return KeyOrder::Unneeded;
        };
        if let Some(other) = kinds.find(|k| *k != kind) {
            return KeyOrder::Mixed { first: kind, other };
        }

        let entries = association.entries();
        let mut ascending: Vec<usize> = (0..entries.len()).collect();
        ascending.sort_by(|&a, &b| {
            entries[a]
                .0
                .cmp_same_kind(&entries[b].0)
                .unwrap_or(Ordering::Equal)
        });
        KeyOrder::Sorted { kind, ascending }
    }
}

/// An [`Association`] prepared for repeated queries in one mode.
#[derive(Debug)]
pub struct Matcher<'a> {
    association: &'a Association,
    mode: MatchMode,
    order: KeyOrder,
}

impl<'a> Matcher<'a> {
    pub fn new(association: &'a Association, mode: MatchMode) -> Self {
        let order = if mode.is_ordered() {
            KeyOrder::prepare(association)
        } else {
            KeyOrder::Unneeded
        };
        Matcher {
            association,
            mode,
            order,
        }
    }

    /// Resolve one probe. A missing probe always yields `fallback`.
    pub fn query(&self, probe: &Value, fallback: &Value) -> Result<Value, LookupError> {
        let Some(key) = LookupKey::from_value(probe) else {
            return Ok(fallback.clone());
        };
        if let Some(hit) = self.association.get(&key) {
            return Ok(hit.clone());
        }

        let found = match self.mode {
            MatchMode::Exact => None,
            MatchMode::Wildcard => self.wildcard(&key),
            MatchMode::ApproximateNearest | MatchMode::ExactOrNext | MatchMode::ExactOrPrevious => {
                self.ordered(&key)?
            }
        };
        Ok(found.cloned().unwrap_or_else(|| fallback.clone()))
    }

    fn ordered(&self, probe: &LookupKey) -> Result<Option<&'a Value>, LookupError> {
        let (kind, ascending) = match &self.order {
            KeyOrder::Unneeded => return Ok(None),
            KeyOrder::Mixed { first, other } => {
                return Err(LookupError::IncomparableKeys {
                    left: *other,
                    right: *first,
                })
            }
            KeyOrder::Sorted { kind, ascending } => (*kind, ascending.as_slice()),
        };
        if self.mode == MatchMode::ApproximateNearest && kind == ValueKind::Text {
            return Err(LookupError::NonNumericKey(kind));
        }
        if probe.kind() != kind {
            return Err(LookupError::IncomparableKeys {
                left: probe.kind(),
                right: kind,
            });
        }

        let entries: &'a [(LookupKey, Value)] = self.association.entries();
        let key_at = move |i: usize| -> &'a LookupKey { &entries[ascending[i]].0 };
        let value_at = move |i: usize| -> &'a Value { &entries[ascending[i]].1 };
        // First position whose key is >= probe.
        let pos = ascending
            .partition_point(|&i| entries[i].0.cmp_same_kind(probe) == Some(Ordering::Less));
        let len = ascending.len();

        Ok(match self.mode {
            MatchMode::ExactOrNext => (pos < len).then(|| value_at(pos)),
            // No exact hit, so every key before `pos` is strictly smaller.
            MatchMode::ExactOrPrevious => pos.checked_sub(1).map(value_at),
            MatchMode::ApproximateNearest => {
                if pos == len {
                    Some(value_at(len - 1))
                } else if pos == 0 {
                    Some(value_at(0))
                } else {
                    let p = probe.magnitude().unwrap_or_default();
                    let below = key_at(pos - 1).magnitude().unwrap_or_default();
                    let above = key_at(pos).magnitude().unwrap_or_default();
                    if (p - below).abs() <= (p - above).abs() {
                        Some(value_at(pos - 1))
                    } else {
                        Some(value_at(pos))
                    }
                }
            }
            MatchMode::Exact | MatchMode::Wildcard => None,
        })
    }

    fn wildcard(&self, probe: &LookupKey) -> Option<&'a Value> {
        let needle = probe.to_string().to_lowercase();
        self.association
            .entries()
            .iter()
            .find(|(key, _)| {
                let hay = key.to_string().to_lowercase();
                hay.contains(&needle) || needle.contains(&hay)
            })
            .map(|(_, value)| value)
    }
}

/// One-off query; prefer [`Matcher`] when probing many values.
pub fn query(
    association: &Association,
    probe: &Value,
    mode: MatchMode,
    fallback: &Value,
) -> Result<Value, LookupError> {
    Matcher::new(association, mode).query(probe, fallback)
}
