//! Persistent connection to a single memcached endpoint.

use std::io::{self, BufRead, BufReader, Read, Write};

use tracing::debug;

use crate::collector::traits::Connector;

/// Default memcached port.
pub const DEFAULT_PORT: u16 = 11211;

/// Longest response line accepted, including its line ending.
pub const MAX_LINE_LEN: usize = 8192;

/// An open stream together with the endpoint it belongs to.
struct Connection<S> {
    host: String,
    port: u16,
    reader: BufReader<S>,
}

/// Owns at most one open connection and reuses it across calls.
///
/// The connection is replaced only when a different `(host, port)` is
/// requested or after [`ConnectionManager::disconnect`].
pub struct ConnectionManager<C: Connector> {
    connector: C,
    connection: Option<Connection<C::Stream>>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            connection: None,
        }
    }

    /// Opens a connection to `(host, port)` unless one is already open to it.
    ///
    /// A connection to a different endpoint is dropped (and thereby closed)
    /// before the new one is opened. On failure no connection is held.
    pub fn ensure_connected(&mut self, host: &str, port: u16) -> io::Result<()> {
        if self.is_connected_to(host, port) {
            return Ok(());
        }

        if let Some(old) = self.connection.take() {
            debug!(
                "Endpoint changed from {}:{} to {}:{}, reconnecting",
                old.host, old.port, host, port
            );
        }

        let stream = self.connector.connect(host, port)?;
        debug!("Connected to {}:{}", host, port);
        self.connection = Some(Connection {
            host: host.to_string(),
            port,
            reader: BufReader::new(stream),
        });
        Ok(())
    }

    /// Returns `true` if a connection to exactly `(host, port)` is open.
    pub fn is_connected_to(&self, host: &str, port: u16) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|c| c.host == host && c.port == port)
    }

    /// Drops the open connection, if any.
    pub fn disconnect(&mut self) {
        self.connection = None;
    }

    /// Writes `line` followed by `\r\n`.
    pub fn send_line(&mut self, line: &str) -> io::Result<()> {
        let stream = self.connection_mut()?.reader.get_mut();
        stream.write_all(line.as_bytes())?;
        stream.write_all(b"\r\n")?;
        stream.flush()
    }

    /// Reads one line including its line ending into `buf` as raw bytes.
    ///
    /// Returns the number of bytes read; `0` means the peer closed the stream.
    /// A line longer than [`MAX_LINE_LEN`] fails with `InvalidData`.
    pub fn read_line(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        let reader = &mut self.connection_mut()?.reader;
        let n = reader
            .by_ref()
            .take(MAX_LINE_LEN as u64)
            .read_until(b'\n', buf)?;
        if n == MAX_LINE_LEN && buf.last() != Some(&b'\n') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("response line exceeds {} bytes", MAX_LINE_LEN),
            ));
        }
        Ok(n)
    }

    fn connection_mut(&mut self) -> io::Result<&mut Connection<C::Stream>> {
        self.connection
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "not connected"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockConnector;

    #[test]
    fn ensure_connected_is_idempotent() {
        let connector = MockConnector::new("");
        let mut manager = ConnectionManager::new(connector.clone());

        manager.ensure_connected("h", DEFAULT_PORT).unwrap();
        manager.ensure_connected("h", DEFAULT_PORT).unwrap();

        assert_eq!(connector.connect_count(), 1);
        assert!(manager.is_connected_to("h", DEFAULT_PORT));
    }

    #[test]
    fn endpoint_change_reconnects() {
        let connector = MockConnector::new("");
        let mut manager = ConnectionManager::new(connector.clone());

        manager.ensure_connected("h", DEFAULT_PORT).unwrap();
        manager.ensure_connected("other", DEFAULT_PORT).unwrap();
        manager.ensure_connected("other", 11212).unwrap();
        manager.ensure_connected("other", 11212).unwrap();

        assert_eq!(
            connector.endpoints(),
            vec![
                ("h".to_string(), DEFAULT_PORT),
                ("other".to_string(), DEFAULT_PORT),
                ("other".to_string(), 11212),
            ]
        );
        assert!(manager.is_connected_to("other", 11212));
        assert!(!manager.is_connected_to("other", DEFAULT_PORT));
    }

    #[test]
    fn failed_connect_leaves_no_connection() {
        let mut manager = ConnectionManager::new(MockConnector::refusing());
        let err = manager.ensure_connected("h", DEFAULT_PORT).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
        assert!(!manager.is_connected_to("h", DEFAULT_PORT));
    }

    #[test]
    fn io_requires_connection() {
        let mut manager = ConnectionManager::new(MockConnector::new(""));
        let err = manager.send_line("stats").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);

        let mut buf = Vec::new();
        assert!(manager.read_line(&mut buf).is_err());
    }

    #[test]
    fn send_and_read_lines() {
        let connector = MockConnector::new("STAT pid 1\r\nEND\r\n");
        let mut manager = ConnectionManager::new(connector.clone());
        manager.ensure_connected("h", DEFAULT_PORT).unwrap();
        manager.send_line("stats").unwrap();

        let mut line = Vec::new();
        assert_eq!(manager.read_line(&mut line).unwrap(), 12);
        assert_eq!(line, b"STAT pid 1\r\n");
        assert_eq!(connector.written(), "stats\r\n");

        manager.disconnect();
        assert!(!manager.is_connected_to("h", DEFAULT_PORT));
    }

    #[test]
    fn read_line_keeps_invalid_utf8_bytes() {
        let connector = MockConnector::new(&b"STAT note \xff\xfe\r\nEND\r\n"[..]);
        let mut manager = ConnectionManager::new(connector);
        manager.ensure_connected("h", DEFAULT_PORT).unwrap();

        let mut line = Vec::new();
        manager.read_line(&mut line).unwrap();
        assert_eq!(line, b"STAT note \xff\xfe\r\n");
    }

    #[test]
    fn overlong_line_is_rejected() {
        let connector = MockConnector::new("x".repeat(MAX_LINE_LEN + 10));
        let mut manager = ConnectionManager::new(connector);
        manager.ensure_connected("h", DEFAULT_PORT).unwrap();

        let mut line = Vec::new();
        let err = manager.read_line(&mut line).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(line.len(), MAX_LINE_LEN);
    }

    #[test]
    fn line_of_exactly_max_len_is_accepted() {
        let mut response = "x".repeat(MAX_LINE_LEN - 1);
        response.push('\n');
        let mut manager = ConnectionManager::new(MockConnector::new(response));
        manager.ensure_connected("h", DEFAULT_PORT).unwrap();

        let mut line = Vec::new();
        assert_eq!(manager.read_line(&mut line).unwrap(), MAX_LINE_LEN);
    }
}
