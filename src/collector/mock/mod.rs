//! In-memory transport for testing the collector without a memcached server.
//!
//! This module provides `MockConnector`, which hands out scripted streams and
//! records every connection it establishes.

mod connector;

pub use connector::{MockConnector, MockStream};
