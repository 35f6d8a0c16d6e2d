//! Stats collector: sends `stats`, reads until `END`, builds a [`Snapshot`].

use std::fmt;
use std::io;

use tracing::{Level, debug, trace};

use crate::collector::connection::ConnectionManager;
use crate::collector::parser::{self, Line};
use crate::collector::traits::{Connector, TcpConnector};
use crate::derived::{self, DeriveError};
use crate::logging::{LogSink, TracingSink};
use crate::registry::Registry;
use crate::snapshot::Snapshot;

/// Command sent to request server statistics.
const STATS_COMMAND: &str = "stats";

/// Error type for stats collection.
#[derive(Debug)]
pub enum CollectError {
    /// Connection could not be established.
    Connect {
        host: String,
        port: u16,
        source: io::Error,
    },
    /// I/O failure while sending the command or reading the response.
    Io(io::Error),
    /// The server closed the connection before `END`.
    UnexpectedEof,
    /// Derived metrics could not be computed.
    Derive(DeriveError),
}

impl fmt::Display for CollectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectError::Connect { host, port, source } => {
                write!(f, "failed to connect to {}:{}: {}", host, port, source)
            }
            CollectError::Io(e) => write!(f, "I/O error: {}", e),
            CollectError::UnexpectedEof => write!(f, "connection closed before END"),
            CollectError::Derive(e) => write!(f, "derived metrics: {}", e),
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::Connect { source, .. } => Some(source),
            CollectError::Io(e) => Some(e),
            CollectError::UnexpectedEof => None,
            CollectError::Derive(e) => Some(e),
        }
    }
}

impl From<io::Error> for CollectError {
    fn from(e: io::Error) -> Self {
        CollectError::Io(e)
    }
}

impl From<DeriveError> for CollectError {
    fn from(e: DeriveError) -> Self {
        CollectError::Derive(e)
    }
}

/// memcached stats client.
///
/// Holds a single persistent connection; callers polling from several threads
/// must serialize access themselves. Every call performs a fresh round trip.
pub struct StatsClient<C: Connector = TcpConnector, L: LogSink = TracingSink> {
    connection: ConnectionManager<C>,
    sink: L,
    registry: &'static Registry,
}

impl StatsClient {
    /// Creates a TCP client logging through `tracing`.
    pub fn tcp() -> Self {
        Self::new(TcpConnector::new(), TracingSink)
    }
}

impl<C: Connector, L: LogSink> StatsClient<C, L> {
    /// Creates a client and emits the startup notice through `sink`.
    pub fn new(connector: C, sink: L) -> Self {
        sink.log(Level::ERROR, "Logging started");
        Self {
            connection: ConnectionManager::new(connector),
            sink,
            registry: Registry::global(),
        }
    }

    pub fn registry(&self) -> &'static Registry {
        self.registry
    }

    /// Opens a connection to `(host, port)` unless one is already open to it.
    pub fn ensure_connected(&mut self, host: &str, port: u16) -> Result<(), CollectError> {
        self.connection
            .ensure_connected(host, port)
            .map_err(|source| CollectError::Connect {
                host: host.to_string(),
                port,
                source,
            })
    }

    /// Fetches raw stats from `(host, port)`.
    ///
    /// Either the complete response is returned or an error; a failed
    /// exchange never yields a partial snapshot. After a failure the
    /// connection is dropped so the next call starts from a clean stream.
    pub fn collect(&mut self, host: &str, port: u16) -> Result<Snapshot, CollectError> {
        match self.read_stats(host, port) {
            Ok(snapshot) => {
                debug!("Collected {} stats from {}:{}", snapshot.len(), host, port);
                Ok(snapshot)
            }
            Err(e) => {
                self.connection.disconnect();
                self.sink.log(
                    Level::ERROR,
                    &format!("stats collection from {}:{} failed: {}", host, port, e),
                );
                Err(e)
            }
        }
    }

    /// Fetches stats and adds the derived percentages.
    pub fn poll(&mut self, host: &str, port: u16) -> Result<Snapshot, CollectError> {
        let mut snapshot = self.collect(host, port)?;
        if let Err(e) = derived::augment(&mut snapshot) {
            self.sink.log(
                Level::ERROR,
                &format!("derived metrics for {}:{} failed: {}", host, port, e),
            );
            return Err(e.into());
        }
        Ok(snapshot)
    }

    fn read_stats(&mut self, host: &str, port: u16) -> Result<Snapshot, CollectError> {
        self.ensure_connected(host, port)?;
        self.connection.send_line(STATS_COMMAND)?;

        let mut snapshot = Snapshot::new();
        let mut line = Vec::new();
        loop {
            line.clear();
            if self.connection.read_line(&mut line)? == 0 {
                return Err(CollectError::UnexpectedEof);
            }
            match parser::classify_bytes(&line) {
                Line::End => return Ok(snapshot),
                Line::Stat { key, value } => self.store(&mut snapshot, key, value),
                Line::Other => trace!("Skipping line: {:?}", String::from_utf8_lossy(&line)),
            }
        }
    }

    /// Stores `key`, and also `{key}_total` when that name is a known gauge.
    fn store(&self, snapshot: &mut Snapshot, key: &str, value: &str) {
        snapshot.insert_text(key, value);
        let alias = format!("{}_total", key);
        if self.registry.is_gauge(&alias) {
            snapshot.insert_text(alias, value);
        }
    }
}
