//! The sync engine runtime.
//!
//! All protocol state lives on one engine thread: connection handle, cursor,
//! in-flight flag, and the mirrored collection contents are mutated by a
//! single sequential stream of events (poll ticks, inbound frames, connection
//! closures, reconnect timers). Timer and reader threads only produce events;
//! they never touch state directly, so there is no concurrent mutation to
//! reason about.

use crate::collection::SharedCollection;
use crate::config::EngineConfig;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::merge;
use crate::scheduler::PollScheduler;
use crate::transport::StreamTransport;
use livetable_protocol::{Cursor, Delta, DeltaResponse, PollRequest};
use parking_lot::RwLock;
use std::sync::atomic::AtomicU64;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// Events processed by the engine thread.
pub(crate) enum EngineEvent {
    /// Periodic poll timer fired for a connection generation.
    PollTick {
        /// Generation the ticker was armed for.
        generation: u64,
    },
    /// An inbound frame arrived on a connection generation.
    Inbound {
        /// Generation the reader belongs to.
        generation: u64,
        /// Raw frame text.
        frame: String,
    },
    /// A connection reported close or error.
    ConnectionClosed {
        /// Generation of the closed connection.
        generation: u64,
    },
    /// The reconnect delay elapsed.
    ReconnectDue,
    /// The engine is being torn down.
    Shutdown,
}

/// Counters describing what the engine has done so far.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Successful connection opens.
    pub connects: u64,
    /// Reconnect attempts scheduled.
    pub reconnects_scheduled: u64,
    /// Poll requests sent.
    pub polls_sent: u64,
    /// Deltas decoded and applied.
    pub deltas_applied: u64,
    /// Entities merged in place.
    pub entities_updated: u64,
    /// Entities appended.
    pub entities_appended: u64,
    /// Entities removed.
    pub entities_removed: u64,
    /// Inbound frames discarded as malformed.
    pub decode_failures: u64,
    /// Most recent internal error, if any.
    pub last_error: Option<String>,
}

/// A running synchronization session.
///
/// Constructed with [`SyncEngine::start`]; multiple independent sessions can
/// coexist. Dropping the handle (or calling [`SyncEngine::shutdown`]) tears
/// the session down: the poll timer dies, the connection closes, and any
/// pending reconnect is never acted upon.
pub struct SyncEngine {
    events: Sender<EngineEvent>,
    worker: Option<JoinHandle<()>>,
    state: Arc<RwLock<ConnectionState>>,
    cursor: Arc<RwLock<Option<Cursor>>>,
    stats: Arc<RwLock<SyncStats>>,
    collection: SharedCollection,
}

impl SyncEngine {
    /// Starts a synchronization session against the configured endpoint.
    ///
    /// The collection is owned by the caller; the engine only mutates its
    /// contents. Connection failures are absorbed and retried forever; no
    /// error from the session ever surfaces through this handle.
    pub fn start<T: StreamTransport>(
        config: EngineConfig,
        transport: T,
        collection: SharedCollection,
    ) -> Self {
        let (events, inbox) = channel();
        let state = Arc::new(RwLock::new(ConnectionState::Closed));
        let cursor = Arc::new(RwLock::new(None));
        let stats = Arc::new(RwLock::new(SyncStats::default()));
        let generation = Arc::new(AtomicU64::new(0));

        let manager = ConnectionManager::new(
            transport,
            config.endpoint.clone(),
            config.reconnect_delay,
            events.clone(),
            Arc::clone(&generation),
            Arc::clone(&state),
        );
        let scheduler = PollScheduler::new(
            config.poll_interval,
            config.gate_in_flight,
            Arc::clone(&generation),
        );

        let core = EngineCore {
            manager,
            scheduler,
            events: events.clone(),
            collection: Arc::clone(&collection),
            cursor: Arc::clone(&cursor),
            stats: Arc::clone(&stats),
        };

        let worker = std::thread::Builder::new()
            .name("livetable-engine".to_string())
            .spawn(move || core.run(inbox))
            .ok();
        if worker.is_none() {
            warn!("failed to spawn engine thread");
        }

        Self {
            events,
            worker,
            state,
            cursor,
            stats,
            collection,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Current cursor, persisted across reconnects.
    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor.read().clone()
    }

    /// Snapshot of the engine counters.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// The shared collection this engine mirrors into.
    pub fn collection(&self) -> &SharedCollection {
        &self.collection
    }

    /// Tears the session down and waits for the engine thread to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.events.send(EngineEvent::Shutdown);
            let _ = worker.join();
        }
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

struct EngineCore<T: StreamTransport> {
    manager: ConnectionManager<T>,
    scheduler: PollScheduler,
    events: Sender<EngineEvent>,
    collection: SharedCollection,
    cursor: Arc<RwLock<Option<Cursor>>>,
    stats: Arc<RwLock<SyncStats>>,
}

impl<T: StreamTransport> EngineCore<T> {
    fn run(mut self, inbox: Receiver<EngineEvent>) {
        self.connect();

        while let Ok(event) = inbox.recv() {
            match event {
                EngineEvent::PollTick { generation }
                    if generation == self.manager.generation() =>
                {
                    self.poll_once();
                }
                EngineEvent::Inbound { generation, frame }
                    if generation == self.manager.generation() =>
                {
                    self.handle_inbound(&frame);
                }
                EngineEvent::ConnectionClosed { generation }
                    if generation == self.manager.generation() =>
                {
                    self.scheduler.on_close();
                    if self.manager.handle_closed() {
                        self.stats.write().reconnects_scheduled += 1;
                    }
                }
                EngineEvent::ReconnectDue => {
                    self.manager.retry_fired();
                    if !self.manager.is_open() {
                        self.connect();
                    }
                }
                EngineEvent::Shutdown => break,
                // Ticks, frames and closures from a superseded connection.
                _ => debug!("discarding event from superseded connection"),
            }
        }

        self.manager.teardown();
    }

    /// Attempts to open a connection; on success, polls immediately and arms
    /// the periodic ticker for the new generation.
    fn connect(&mut self) {
        match self.manager.open() {
            Ok(generation) => {
                self.stats.write().connects += 1;
                self.poll_once();
                self.scheduler.on_open(generation, &self.events);
            }
            Err(error) => {
                let mut stats = self.stats.write();
                stats.reconnects_scheduled += 1;
                stats.last_error = Some(error.to_string());
            }
        }
    }

    /// Sends one poll request if the connection is open and gating allows it.
    fn poll_once(&mut self) {
        let Some(connection) = self.manager.connection() else {
            debug!("poll skipped: not connected");
            return;
        };
        if !self.scheduler.should_send() {
            debug!("poll skipped: request in flight");
            return;
        }

        let ids = self.collection.read().ids();
        let request = PollRequest::new(self.cursor.read().clone(), ids);
        let frame = match request.encode() {
            Ok(frame) => frame,
            Err(error) => {
                warn!(%error, "failed to encode poll request");
                return;
            }
        };

        match connection.send(&frame) {
            Ok(()) => {
                self.scheduler.mark_sent();
                self.stats.write().polls_sent += 1;
            }
            // Expected during reconnect windows; the reader delivers the
            // close event that drives recovery.
            Err(error) => debug!(%error, "poll send skipped"),
        }
    }

    /// Decodes and applies one inbound frame.
    fn handle_inbound(&mut self, frame: &str) {
        self.scheduler.mark_received();

        let response = match DeltaResponse::decode(frame) {
            Ok(response) => response,
            Err(error) => {
                warn!(%error, "discarding malformed frame");
                let mut stats = self.stats.write();
                stats.decode_failures += 1;
                stats.last_error = Some(error.to_string());
                return;
            }
        };

        let delta = Delta::from(response);
        let outcome = merge::apply_delta(&mut self.collection.write(), &delta);
        if let Some(cursor) = delta.cursor {
            *self.cursor.write() = Some(cursor);
        }

        let mut stats = self.stats.write();
        stats.deltas_applied += 1;
        stats.entities_updated += outcome.updated as u64;
        stats.entities_appended += outcome.appended as u64;
        stats.entities_removed += outcome.removed as u64;
        debug!(
            updated = outcome.updated,
            appended = outcome.appended,
            removed = outcome.removed,
            "delta applied"
        );
    }
}
