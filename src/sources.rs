//! Known-broken source maps and their merge rule.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Marker value written for newly discovered broken sources.
pub const BROKEN_FLAG: u8 = 1;

/// Mapping from resolved source URL to a broken-marker value.
///
/// Serializes as a plain JSON object. Values are kept verbatim so that a
/// read/merge/write cycle never rewrites entries written by someone else; a
/// key counts as broken when its value is truthy (not `false`, `0`, `""` or
/// `null`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrokenSources {
    entries: BTreeMap<String, Value>,
}

impl BrokenSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys, truthy or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record `source` as broken with the flag value.
    ///
    /// Returns `true` when the key was not present before.
    pub fn mark_broken(&mut self, source: impl Into<String>) -> bool {
        self.entries
            .insert(source.into(), Value::from(BROKEN_FLAG))
            .is_none()
    }

    /// Whether `source` is recorded with a truthy marker.
    pub fn is_known_broken(&self, source: &str) -> bool {
        self.entries.get(source).is_some_and(is_truthy)
    }

    pub fn contains_key(&self, source: &str) -> bool {
        self.entries.contains_key(source)
    }

    /// Keys in lexical order.
    pub fn sources(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    /// Union `incoming` into `self`; `incoming` wins on key collisions.
    pub fn merge_from(&mut self, incoming: &BrokenSources) {
        for (source, marker) in &incoming.entries {
            self.entries.insert(source.clone(), marker.clone());
        }
    }
}

impl<S: Into<String>> FromIterator<S> for BrokenSources {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut out = Self::new();
        for source in iter {
            out.mark_broken(source);
        }
        out
    }
}

/// Key-wise union of `base` and `incoming`; `incoming` wins on collision and
/// no key is ever removed.
pub fn merge(base: &BrokenSources, incoming: &BrokenSources) -> BrokenSources {
    let mut out = base.clone();
    out.merge_from(incoming);
    out
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
