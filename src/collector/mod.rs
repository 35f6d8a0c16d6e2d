//! memcached `stats` collector.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 StatsClient                  │
//! │  ┌──────────────────┐   ┌─────────────────┐  │
//! │  │ ConnectionManager│   │     parser      │  │
//! │  │ - one connection │   │ - STAT k v      │  │
//! │  │ - (host, port)   │   │ - END           │  │
//! │  └────────┬─────────┘   └─────────────────┘  │
//! │           │                                  │
//! │    ┌──────▼──────┐                           │
//! │    │  Connector  │ (trait)                   │
//! │    └──────┬──────┘                           │
//! └───────────┼──────────────────────────────────┘
//!             │
//!      ┌──────┴────────┐
//!      │               │
//! ┌────▼─────────┐ ┌───▼───────────┐
//! │ TcpConnector │ │ MockConnector │
//! │  (network)   │ │   (testing)   │
//! └──────────────┘ └───────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use mcstats::collector::{StatsClient, DEFAULT_PORT};
//!
//! let mut client = StatsClient::tcp();
//! let snapshot = client.poll("localhost", DEFAULT_PORT).unwrap();
//! println!("{:?}", snapshot.get("get_hit_percentage"));
//! ```
//!
//! ## Testing (with MockConnector)
//!
//! ```
//! use mcstats::collector::{MockConnector, StatsClient};
//! use mcstats::logging::TracingSink;
//!
//! let connector = MockConnector::new("STAT get_hits 42\r\nEND\r\n");
//! let mut client = StatsClient::new(connector, TracingSink);
//! let snapshot = client.collect("cache1", 11211).unwrap();
//! assert!(snapshot.contains_key("get_hits_total"));
//! ```

mod client;
mod connection;
pub mod mock;
pub mod parser;
pub mod traits;

pub use client::{CollectError, StatsClient};
pub use connection::{ConnectionManager, DEFAULT_PORT, MAX_LINE_LEN};
pub use mock::{MockConnector, MockStream};
pub use traits::{Connector, TcpConnector};
