//! Static description of every tracked memcached stat.
//!
//! Two tables exist:
//! - gauges — point-in-time values, including the derived percentages and the
//!   `*_total` aliases that feed them
//! - counters — cumulative values that downstream consumers turn into rates
//!
//! The merged view is the union of both, with counter definitions winning on a
//! name collision.

use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Numeric representation hint for a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Unsigned 32-bit integer.
    U32,
    /// Double-precision float.
    Double,
}

/// One tracked field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDefinition {
    pub name: &'static str,
    /// Display unit, free-form ("bytes", "r/s", "%").
    pub unit: &'static str,
    /// `None` means "use the default representation".
    pub kind: Option<MetricKind>,
    /// `false` for fields that only exist as inputs to derived metrics.
    pub published: bool,
}

const fn published(name: &'static str, unit: &'static str, kind: MetricKind) -> MetricDefinition {
    MetricDefinition {
        name,
        unit,
        kind: Some(kind),
        published: true,
    }
}

const fn internal(name: &'static str, unit: &'static str) -> MetricDefinition {
    MetricDefinition {
        name,
        unit,
        kind: None,
        published: false,
    }
}

/// Gauge table.
pub const GAUGES: &[MetricDefinition] = &[
    published("curr_connections", "conn", MetricKind::U32),
    published("curr_items", "key", MetricKind::Double),
    published("threads", "threads", MetricKind::U32),
    internal("bytes", "bytes"),
    internal("limit_maxbytes", "bytes"),
    internal("total_connections_total", "conn"),
    internal("total_items_total", "key"),
    internal("get_hits_total", "r"),
    internal("get_misses_total", "r"),
    internal("delete_misses_total", "r"),
    internal("delete_hits_total", "r"),
    internal("bytes_read_total", "bytes"),
    internal("bytes_written_total", "bytes"),
    published("get_hit_percentage", "%", MetricKind::Double),
    published("get_miss_percentage", "%", MetricKind::Double),
    published("delete_hit_percentage", "%", MetricKind::Double),
    published("delete_miss_percentage", "%", MetricKind::Double),
    published("used_percentage", "%", MetricKind::Double),
];

/// Counter table.
pub const COUNTERS: &[MetricDefinition] = &[
    published("total_connections", "conn/s", MetricKind::U32),
    published("total_items", "keys/s", MetricKind::U32),
    published("get_hits", "r/s", MetricKind::U32),
    published("get_misses", "r/s", MetricKind::U32),
    published("delete_misses", "r/s", MetricKind::U32),
    published("delete_hits", "r/s", MetricKind::U32),
    published("bytes_read", "bytes/s", MetricKind::Double),
    published("bytes_written", "bytes/s", MetricKind::Double),
];

/// Gauges, counters and their merged view, keyed by metric name.
#[derive(Debug, Clone, PartialEq)]
pub struct Registry {
    gauges: BTreeMap<&'static str, MetricDefinition>,
    counters: BTreeMap<&'static str, MetricDefinition>,
    metrics: BTreeMap<&'static str, MetricDefinition>,
}

impl Registry {
    /// Builds the registry from the fixed tables. Deterministic.
    pub fn build() -> Self {
        Self::from_tables(GAUGES, COUNTERS)
    }

    /// Builds a registry from arbitrary tables.
    pub fn from_tables(gauges: &[MetricDefinition], counters: &[MetricDefinition]) -> Self {
        let gauges: BTreeMap<_, _> = gauges.iter().map(|d| (d.name, *d)).collect();
        let counters: BTreeMap<_, _> = counters.iter().map(|d| (d.name, *d)).collect();

        // Counters are inserted last so they take precedence.
        let mut metrics = gauges.clone();
        metrics.extend(counters.iter().map(|(k, v)| (*k, *v)));

        Self {
            gauges,
            counters,
            metrics,
        }
    }

    /// Process-wide registry, built on first use and never mutated afterwards.
    pub fn global() -> &'static Registry {
        static REGISTRY: OnceLock<Registry> = OnceLock::new();
        REGISTRY.get_or_init(Registry::build)
    }

    pub fn gauges(&self) -> &BTreeMap<&'static str, MetricDefinition> {
        &self.gauges
    }

    pub fn counters(&self) -> &BTreeMap<&'static str, MetricDefinition> {
        &self.counters
    }

    /// Merged view of counters and gauges.
    pub fn metrics(&self) -> &BTreeMap<&'static str, MetricDefinition> {
        &self.metrics
    }

    /// Looks a metric up in the merged view.
    pub fn get(&self, name: &str) -> Option<&MetricDefinition> {
        self.metrics.get(name)
    }

    pub fn is_gauge(&self, name: &str) -> bool {
        self.gauges.contains_key(name)
    }

    /// Metrics meant for downstream publication.
    pub fn published(&self) -> impl Iterator<Item = &MetricDefinition> {
        self.metrics.values().filter(|d| d.published)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::build()
    }
}
