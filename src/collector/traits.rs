//! Transport abstraction so the collector can run against a real socket or an
//! in-memory stream in tests.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

/// Opens text-stream connections to a `(host, port)` endpoint.
pub trait Connector {
    /// Bidirectional byte stream produced by [`Connector::connect`].
    type Stream: Read + Write;

    /// Opens a new connection.
    ///
    /// # Arguments
    /// * `host` - Host name or address
    /// * `port` - TCP port
    ///
    /// # Returns
    /// The connected stream, or the I/O error that prevented it.
    fn connect(&self, host: &str, port: u16) -> io::Result<Self::Stream>;
}

/// TCP connector backed by `std::net::TcpStream`.
///
/// No read or write timeout is set unless [`TcpConnector::with_timeout`] is used.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector {
    timeout: Option<Duration>,
}

impl TcpConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `timeout` to connect, read and write operations.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        let stream = match self.timeout {
            None => TcpStream::connect((host, port))?,
            Some(timeout) => connect_with_timeout(host, port, timeout)?,
        };
        stream.set_read_timeout(self.timeout)?;
        stream.set_write_timeout(self.timeout)?;
        Ok(stream)
    }
}

/// Tries every resolved address in turn, returning the last error if none succeeds.
fn connect_with_timeout(host: &str, port: u16, timeout: Duration) -> io::Result<TcpStream> {
    use std::net::ToSocketAddrs;

    let mut last_err = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("could not resolve {}:{}", host, port),
        )
    }))
}
