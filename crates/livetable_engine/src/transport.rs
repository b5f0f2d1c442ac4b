//! Transport layer abstraction for the streaming connection.
//!
//! The engine talks to the server over a persistent streaming connection that
//! carries text frames in both directions. The actual transport is abstracted
//! behind a trait so different implementations (WebSocket, TCP, an in-process
//! loopback, a mock for testing) can be plugged in; this crate ships no
//! network implementation of its own.

use crate::error::{EngineError, EngineResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

/// Opens streaming connections to an endpoint.
pub trait StreamTransport: Send + Sync + 'static {
    /// Establishes a new connection.
    ///
    /// A returned connection is open; an `Err` is a connection failure the
    /// engine recovers from by scheduling a retry.
    fn connect(&self, endpoint: &str) -> EngineResult<Box<dyn StreamConnection>>;
}

impl<T: StreamTransport + ?Sized> StreamTransport for Arc<T> {
    fn connect(&self, endpoint: &str) -> EngineResult<Box<dyn StreamConnection>> {
        (**self).connect(endpoint)
    }
}

/// One live streaming connection.
///
/// `recv` blocks until the next inbound frame; an `Err` from it is the
/// close/error event for the connection. All methods take `&self` so the
/// connection can be shared between the engine thread (sending) and a reader
/// thread (receiving).
pub trait StreamConnection: Send + Sync {
    /// Sends a text frame.
    fn send(&self, frame: &str) -> EngineResult<()>;

    /// Blocks until the next inbound text frame.
    fn recv(&self) -> EngineResult<String>;

    /// Closes the connection, unblocking any pending `recv`.
    fn close(&self);
}

enum MockFrame {
    Text(String),
    Close,
}

/// A scripted transport for tests.
///
/// Each successful `connect` hands out a paired [`MockRemote`] through which
/// a test plays the server role: pushing inbound frames, inspecting what the
/// engine sent, and closing the connection.
#[derive(Default)]
pub struct MockTransport {
    connect_errors: Mutex<VecDeque<String>>,
    connects: AtomicU64,
    remotes: Mutex<Vec<MockRemote>>,
}

impl MockTransport {
    /// Creates a mock transport whose connects all succeed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `connect` call fail with the given message.
    ///
    /// Queued failures are consumed in order before connects succeed again.
    pub fn fail_next_connect(&self, message: impl Into<String>) {
        self.connect_errors.lock().push_back(message.into());
    }

    /// Number of `connect` calls observed so far.
    pub fn connect_count(&self) -> u64 {
        self.connects.load(Ordering::SeqCst)
    }

    /// Remote handle of the most recent successful connect.
    pub fn last_remote(&self) -> Option<MockRemote> {
        self.remotes.lock().last().cloned()
    }

    /// Remote handles of every successful connect, in order.
    pub fn remotes(&self) -> Vec<MockRemote> {
        self.remotes.lock().clone()
    }
}

impl StreamTransport for MockTransport {
    fn connect(&self, _endpoint: &str) -> EngineResult<Box<dyn StreamConnection>> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.connect_errors.lock().pop_front() {
            return Err(EngineError::transport_retryable(message));
        }

        let (tx, rx) = channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let open = Arc::new(AtomicBool::new(true));

        let remote = MockRemote {
            sent: Arc::clone(&sent),
            inbound: tx.clone(),
            open: Arc::clone(&open),
        };
        self.remotes.lock().push(remote);

        Ok(Box::new(MockConnection {
            sent,
            inbound: Mutex::new(rx),
            close_signal: tx,
            open,
        }))
    }
}

struct MockConnection {
    sent: Arc<Mutex<Vec<String>>>,
    inbound: Mutex<Receiver<MockFrame>>,
    close_signal: Sender<MockFrame>,
    open: Arc<AtomicBool>,
}

impl StreamConnection for MockConnection {
    fn send(&self, frame: &str) -> EngineResult<()> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(EngineError::NotConnected);
        }
        self.sent.lock().push(frame.to_string());
        Ok(())
    }

    fn recv(&self) -> EngineResult<String> {
        let inbound = self.inbound.lock();
        match inbound.recv() {
            Ok(MockFrame::Text(frame)) => Ok(frame),
            Ok(MockFrame::Close) | Err(_) => {
                self.open.store(false, Ordering::SeqCst);
                Err(EngineError::ConnectionClosed)
            }
        }
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        let _ = self.close_signal.send(MockFrame::Close);
    }
}

/// Test-side handle to a [`MockTransport`] connection.
#[derive(Clone)]
pub struct MockRemote {
    sent: Arc<Mutex<Vec<String>>>,
    inbound: Sender<MockFrame>,
    open: Arc<AtomicBool>,
}

impl MockRemote {
    /// Delivers an inbound frame to the client.
    ///
    /// Returns false if the connection is gone.
    pub fn push_frame(&self, frame: impl Into<String>) -> bool {
        self.inbound.send(MockFrame::Text(frame.into())).is_ok()
    }

    /// Closes the connection from the server side.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        let _ = self.inbound.send(MockFrame::Close);
    }

    /// Frames the client has sent so far.
    pub fn sent_frames(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Number of frames the client has sent so far.
    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Whether the connection is still open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_connect_and_exchange() {
        let transport = MockTransport::new();
        let conn = transport.connect("mock://").unwrap();
        let remote = transport.last_remote().unwrap();

        conn.send("hello").unwrap();
        assert_eq!(remote.sent_frames(), vec!["hello".to_string()]);

        remote.push_frame("world");
        assert_eq!(conn.recv().unwrap(), "world");
    }

    #[test]
    fn mock_scripted_connect_failure() {
        let transport = MockTransport::new();
        transport.fail_next_connect("refused");

        assert!(transport.connect("mock://").is_err());
        assert!(transport.connect("mock://").is_ok());
        assert_eq!(transport.connect_count(), 2);
    }

    #[test]
    fn remote_close_unblocks_recv() {
        let transport = MockTransport::new();
        let conn = transport.connect("mock://").unwrap();
        let remote = transport.last_remote().unwrap();

        remote.close();
        assert!(matches!(conn.recv(), Err(EngineError::ConnectionClosed)));
        assert!(!remote.is_open());
    }

    #[test]
    fn client_close_rejects_send() {
        let transport = MockTransport::new();
        let conn = transport.connect("mock://").unwrap();

        conn.close();
        assert!(matches!(conn.send("x"), Err(EngineError::NotConnected)));
        assert!(matches!(conn.recv(), Err(EngineError::ConnectionClosed)));
    }
}
