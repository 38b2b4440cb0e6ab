use analytics_columnar::{Value, ValueKind};
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::fmt;

/// Hashable, orderable form of a non-missing [`Value`].
///
/// Keys of the same kind have a total order. Keys of different kinds never
/// compare equal and have no meaningful order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LookupKey {
    Number(OrderedFloat<f64>),
    Text(String),
    Timestamp(i64),
}

impl LookupKey {
    /// `None` for missing values: they can neither be stored nor probed.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Missing => None,
            // `-0.0 + 0.0 == +0.0`, so both zeros hash alike.
            Value::Number(n) => Some(LookupKey::Number(OrderedFloat(n + 0.0))),
            Value::Text(s) => Some(LookupKey::Text(s.clone())),
            Value::Timestamp(ms) => Some(LookupKey::Timestamp(*ms)),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            LookupKey::Number(_) => ValueKind::Number,
            LookupKey::Text(_) => ValueKind::Text,
            LookupKey::Timestamp(_) => ValueKind::Timestamp,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            LookupKey::Number(n) => Value::Number(n.0),
            LookupKey::Text(s) => Value::Text(s.clone()),
            LookupKey::Timestamp(ms) => Value::Timestamp(*ms),
        }
    }

    /// Position on the number line, for distance comparisons.
    pub(crate) fn magnitude(&self) -> Option<f64> {
        match self {
            LookupKey::Number(n) => Some(n.0),
            LookupKey::Timestamp(ms) => Some(*ms as f64),
            LookupKey::Text(_) => None,
        }
    }

    /// Order two keys of the same kind.
    pub(crate) fn cmp_same_kind(&self, other: &LookupKey) -> Option<Ordering> {
        match (self, other) {
            (LookupKey::Number(a), LookupKey::Number(b)) => Some(a.cmp(b)),
            (LookupKey::Text(a), LookupKey::Text(b)) => Some(a.cmp(b)),
            (LookupKey::Timestamp(a), LookupKey::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_value().fmt(f)
    }
}
