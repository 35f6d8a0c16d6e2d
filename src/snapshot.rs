//! Per-poll result: a flat map from stat name to value.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::registry::{MetricDefinition, MetricKind, Registry};

/// A single stat value.
///
/// Wire values are kept verbatim as text; derived metrics are stored as numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    Text(String),
    Number(f64),
}

impl StatValue {
    /// Interprets the value as an unsigned integer.
    ///
    /// Numbers are truncated towards zero.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            StatValue::Text(s) => s.parse().ok(),
            StatValue::Number(n) if n.is_finite() && *n >= 0.0 => Some(n.trunc() as u64),
            StatValue::Number(_) => None,
        }
    }

    /// Interprets the value as a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StatValue::Text(s) => s.parse().ok(),
            StatValue::Number(n) => Some(*n),
        }
    }

    /// Interprets the value according to a registry kind hint.
    ///
    /// `U32` and unspecified kinds are read as unsigned integers.
    pub fn as_kind(&self, kind: Option<MetricKind>) -> Option<f64> {
        match kind {
            Some(MetricKind::Double) => self.as_f64(),
            Some(MetricKind::U32) | None => self.as_u64().map(|v| v as f64),
        }
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Text(s) => f.write_str(s),
            StatValue::Number(n) => write!(f, "{}", n),
        }
    }
}

/// One complete poll result.
///
/// Keys the registry does not know about are carried through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Snapshot {
    values: BTreeMap<String, StatValue>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a raw wire value.
    pub fn insert_text(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), StatValue::Text(value.into()));
    }

    /// Stores a computed value.
    pub fn insert_number(&mut self, key: impl Into<String>, value: f64) {
        self.values.insert(key.into(), StatValue::Number(value));
    }

    pub fn get(&self, key: &str) -> Option<&StatValue> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Numeric value of `key`, read with the registry's kind hint.
    ///
    /// Untracked keys are read as floats.
    pub fn number(&self, registry: &Registry, key: &str) -> Option<f64> {
        let value = self.values.get(key)?;
        match registry.get(key) {
            Some(def) => value.as_kind(def.kind),
            None => value.as_f64(),
        }
    }

    /// Entries whose registry definition is marked for publication.
    pub fn published<'a>(
        &'a self,
        registry: &'a Registry,
    ) -> impl Iterator<Item = (&'a MetricDefinition, &'a StatValue)> + 'a {
        registry
            .published()
            .filter_map(move |def| self.values.get(def.name).map(|v| (def, v)))
    }
}
