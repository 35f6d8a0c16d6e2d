//! Ratio metrics computed from already collected counters.
//!
//! All ratios are in `[0, 1]`, not multiplied by 100. Each denominator carries
//! a `+ 1` so a freshly started server (all counters zero) yields `0.0`.
//!
//! A missing input counts as zero. A present input that does not parse as the
//! kind its registry definition declares fails the whole computation.

use std::fmt;

use crate::registry::Registry;
use crate::snapshot::Snapshot;

/// A derived-metric input could not be read as a number.
#[derive(Debug, Clone, PartialEq)]
pub enum DeriveError {
    InvalidValue { field: String, value: String },
}

impl fmt::Display for DeriveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeriveError::InvalidValue { field, value } => {
                write!(f, "non-numeric value for {}: {:?}", field, value)
            }
        }
    }
}

impl std::error::Error for DeriveError {}

/// Names of the fields written by [`augment`].
pub const DERIVED_FIELDS: [&str; 5] = [
    "get_hit_percentage",
    "get_miss_percentage",
    "delete_hit_percentage",
    "delete_miss_percentage",
    "used_percentage",
];

/// Reads `field` with the registry's kind hint; a missing field reads as zero.
fn read(registry: &Registry, snapshot: &Snapshot, field: &str) -> Result<f64, DeriveError> {
    let Some(value) = snapshot.get(field) else {
        return Ok(0.0);
    };
    snapshot
        .number(registry, field)
        .ok_or_else(|| DeriveError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        })
}

/// `(hits / (hits + misses + 1), misses / (hits + misses + 1))`
fn hit_miss_ratio(hits: f64, misses: f64) -> (f64, f64) {
    let denominator = hits + misses + 1.0;
    (hits / denominator, misses / denominator)
}

/// Computes the five derived percentages and writes them into `snapshot`.
///
/// Inputs are read according to their [`Registry::global`] definitions, so
/// integer-kinded fields (all of them today) are truncated. Nothing is
/// written if any input is malformed.
pub fn augment(snapshot: &mut Snapshot) -> Result<(), DeriveError> {
    let registry = Registry::global();
    let get_hits = read(registry, snapshot, "get_hits_total")?;
    let get_misses = read(registry, snapshot, "get_misses_total")?;
    let delete_hits = read(registry, snapshot, "delete_hits_total")?;
    let delete_misses = read(registry, snapshot, "delete_misses_total")?;
    let bytes = read(registry, snapshot, "bytes")?;
    let limit_maxbytes = read(registry, snapshot, "limit_maxbytes")?;

    let (get_hit, get_miss) = hit_miss_ratio(get_hits, get_misses);
    let (delete_hit, delete_miss) = hit_miss_ratio(delete_hits, delete_misses);
    let used = bytes / (limit_maxbytes + 1.0);

    snapshot.insert_number("get_hit_percentage", get_hit);
    snapshot.insert_number("get_miss_percentage", get_miss);
    snapshot.insert_number("delete_hit_percentage", delete_hit);
    snapshot.insert_number("delete_miss_percentage", delete_miss);
    snapshot.insert_number("used_percentage", used);
    Ok(())
}
