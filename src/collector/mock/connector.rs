use crate::collector::traits::Connector;
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MockState {
    /// Server output for each successive connection; the last entry is reused.
    responses: Vec<Vec<u8>>,
    /// Endpoints in the order they were connected to.
    connects: Vec<(String, u16)>,
    /// Everything written by the client, across all connections.
    written: Vec<u8>,
    refuse: bool,
}

/// Connector that serves scripted responses from memory.
///
/// Clones share state, so a test can keep one handle and give the other to
/// the client under test.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    /// Creates a connector whose streams return `response` when read.
    ///
    /// Responses are raw bytes, so non-UTF-8 server output can be scripted.
    pub fn new(response: impl Into<Vec<u8>>) -> Self {
        let connector = Self::default();
        connector.lock().responses.push(response.into());
        connector
    }

    /// Creates a connector that refuses every connection.
    pub fn refusing() -> Self {
        let connector = Self::default();
        connector.lock().refuse = true;
        connector
    }

    /// Adds the response served by the next new connection.
    pub fn then(self, response: impl Into<Vec<u8>>) -> Self {
        self.lock().responses.push(response.into());
        self
    }

    /// Number of connections established so far.
    pub fn connect_count(&self) -> usize {
        self.lock().connects.len()
    }

    /// Endpoints connected to, in order.
    pub fn endpoints(&self) -> Vec<(String, u16)> {
        self.lock().connects.clone()
    }

    /// All bytes the client has written, decoded lossily.
    pub fn written(&self) -> String {
        String::from_utf8_lossy(&self.lock().written).into_owned()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the state from the others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Connector for MockConnector {
    type Stream = MockStream;

    fn connect(&self, host: &str, port: u16) -> io::Result<MockStream> {
        let mut state = self.lock();
        if state.refuse {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("connection to {}:{} refused", host, port),
            ));
        }

        let index = state.connects.len().min(state.responses.len().saturating_sub(1));
        let response = state.responses.get(index).cloned().unwrap_or_default();
        state.connects.push((host.to_string(), port));

        Ok(MockStream {
            input: Cursor::new(response),
            state: Arc::clone(&self.state),
        })
    }
}

/// Stream handed out by [`MockConnector`].
///
/// Reads drain the scripted response; reaching its end looks like the server
/// closing the connection.
#[derive(Debug)]
pub struct MockStream {
    input: Cursor<Vec<u8>>,
    state: Arc<Mutex<MockState>>,
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
