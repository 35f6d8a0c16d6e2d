//! mcstats - memcached `stats` polling library.
//!
//! Provides:
//! - `registry` — static description of tracked gauges and counters
//! - `collector` — persistent connection, `stats` exchange and line parsing
//! - `derived` — hit/miss and memory utilization ratios
//! - `snapshot` — per-poll result
//! - `config` — TOML configuration
//! - `logging` — log sink and `tracing` subscriber setup

pub mod collector;
pub mod config;
pub mod derived;
pub mod logging;
pub mod registry;
pub mod snapshot;

pub use collector::{CollectError, StatsClient};
pub use snapshot::{Snapshot, StatValue};
