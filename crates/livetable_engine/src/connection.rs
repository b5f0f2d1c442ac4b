//! Connection lifecycle management.

use crate::engine::EngineEvent;
use crate::error::EngineResult;
use crate::transport::{StreamConnection, StreamTransport};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Observable state of the engine's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// A connection attempt is in progress.
    Connecting,
    /// A connection is open and polling.
    Open,
    /// No connection; a retry may be pending.
    Closed,
}

impl ConnectionState {
    /// Returns true if the connection is open.
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

/// Owns the single active transport connection.
///
/// At most one live connection exists at any instant: every open tears down
/// the previous connection (even one already closing) and bumps the shared
/// generation counter, which invalidates timers and reader threads belonging
/// to superseded connections.
pub(crate) struct ConnectionManager<T: StreamTransport> {
    transport: T,
    endpoint: String,
    reconnect_delay: Duration,
    events: Sender<EngineEvent>,
    generation: Arc<AtomicU64>,
    state: Arc<RwLock<ConnectionState>>,
    current: Option<Arc<dyn StreamConnection>>,
    retry_pending: bool,
}

impl<T: StreamTransport> ConnectionManager<T> {
    pub(crate) fn new(
        transport: T,
        endpoint: String,
        reconnect_delay: Duration,
        events: Sender<EngineEvent>,
        generation: Arc<AtomicU64>,
        state: Arc<RwLock<ConnectionState>>,
    ) -> Self {
        Self {
            transport,
            endpoint,
            reconnect_delay,
            events,
            generation,
            state,
            current: None,
            retry_pending: false,
        }
    }

    /// Establishes a connection, discarding any prior one first.
    ///
    /// On failure, schedules a retry and returns `Err`. On success, spawns
    /// the reader thread for the new connection generation.
    pub(crate) fn open(&mut self) -> EngineResult<u64> {
        self.discard_current();
        let generation = self.bump_generation();
        *self.state.write() = ConnectionState::Connecting;

        match self.transport.connect(&self.endpoint) {
            Ok(connection) => {
                let connection: Arc<dyn StreamConnection> = Arc::from(connection);
                spawn_reader(Arc::clone(&connection), self.events.clone(), generation);
                self.current = Some(connection);
                *self.state.write() = ConnectionState::Open;
                info!(endpoint = %self.endpoint, generation, "connection open");
                Ok(generation)
            }
            Err(error) => {
                warn!(endpoint = %self.endpoint, %error, "connect failed");
                *self.state.write() = ConnectionState::Closed;
                self.schedule_retry();
                Err(error)
            }
        }
    }

    /// Handles the close/error event of the current connection.
    ///
    /// Returns true if a retry was scheduled (false when one is already
    /// pending).
    pub(crate) fn handle_closed(&mut self) -> bool {
        info!(generation = self.generation(), "connection closed");
        self.discard_current();
        self.bump_generation();
        *self.state.write() = ConnectionState::Closed;
        self.schedule_retry()
    }

    /// Marks the pending retry as fired.
    pub(crate) fn retry_fired(&mut self) {
        self.retry_pending = false;
    }

    /// Tears everything down: no connection, no live generation.
    pub(crate) fn teardown(&mut self) {
        self.discard_current();
        self.bump_generation();
        *self.state.write() = ConnectionState::Closed;
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub(crate) fn connection(&self) -> Option<Arc<dyn StreamConnection>> {
        self.current.clone()
    }

    pub(crate) fn is_open(&self) -> bool {
        self.current.is_some()
    }

    fn discard_current(&mut self) {
        if let Some(connection) = self.current.take() {
            connection.close();
        }
    }

    fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Schedules a single reconnect after the fixed delay.
    ///
    /// Retries have no backoff and no cap; the guard only prevents a close
    /// and an error from the same connection from scheduling two attempts.
    fn schedule_retry(&mut self) -> bool {
        if self.retry_pending {
            return false;
        }
        self.retry_pending = true;
        debug!(delay_ms = self.reconnect_delay.as_millis() as u64, "reconnect scheduled");

        let events = self.events.clone();
        let delay = self.reconnect_delay;
        spawn_named("livetable-retry", move || {
            thread::sleep(delay);
            let _ = events.send(EngineEvent::ReconnectDue);
        });
        true
    }
}

/// Reads inbound frames into the event queue until the connection dies.
fn spawn_reader(
    connection: Arc<dyn StreamConnection>,
    events: Sender<EngineEvent>,
    generation: u64,
) {
    spawn_named("livetable-reader", move || loop {
        match connection.recv() {
            Ok(frame) => {
                if events.send(EngineEvent::Inbound { generation, frame }).is_err() {
                    break;
                }
            }
            Err(_) => {
                let _ = events.send(EngineEvent::ConnectionClosed { generation });
                break;
            }
        }
    });
}

pub(crate) fn spawn_named(name: &str, body: impl FnOnce() + Send + 'static) {
    let result = thread::Builder::new().name(name.to_string()).spawn(body);
    if let Err(error) = result {
        warn!(name, %error, "failed to spawn worker thread");
    }
}
