//! Mirrors an in-process reference server's collection through the engine.
//!
//! The "server" here is the in-memory `DeltaServer`; the transport bridges
//! frames to it directly. Run with `RUST_LOG=debug` to watch the poll loop.

use livetable_engine::{
    EngineConfig, EngineError, EngineResult, MirroredCollection, SharedCollection,
    StreamConnection, StreamTransport, SyncEngine,
};
use livetable_protocol::{Entity, EntityId};
use livetable_server::DeltaServer;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Answers every poll frame with the reference server's response.
struct LoopbackTransport {
    server: Arc<DeltaServer>,
}

struct LoopbackConnection {
    server: Arc<DeltaServer>,
    inbound_tx: Sender<Option<String>>,
    inbound_rx: Mutex<Receiver<Option<String>>>,
    open: AtomicBool,
}

impl StreamTransport for LoopbackTransport {
    fn connect(&self, _endpoint: &str) -> EngineResult<Box<dyn StreamConnection>> {
        let (tx, rx) = channel();
        Ok(Box::new(LoopbackConnection {
            server: Arc::clone(&self.server),
            inbound_tx: tx,
            inbound_rx: Mutex::new(rx),
            open: AtomicBool::new(true),
        }))
    }
}

impl StreamConnection for LoopbackConnection {
    fn send(&self, frame: &str) -> EngineResult<()> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(EngineError::NotConnected);
        }
        let response = self
            .server
            .handle_frame(frame)
            .map_err(|e| EngineError::transport_fatal(e.to_string()))?;
        let _ = self.inbound_tx.send(Some(response));
        Ok(())
    }

    fn recv(&self) -> EngineResult<String> {
        match self.inbound_rx.lock().recv() {
            Ok(Some(frame)) => Ok(frame),
            Ok(None) | Err(_) => Err(EngineError::ConnectionClosed),
        }
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        let _ = self.inbound_tx.send(None);
    }
}

fn print_mirror(label: &str, collection: &SharedCollection) {
    let guard = collection.read();
    println!("{label}:");
    for entity in guard.iter() {
        println!("  {}", serde_json::to_string(entity).unwrap_or_default());
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let server = Arc::new(DeltaServer::new());
    server.put(Entity::new(1).with_field("host", "10.0.0.1").with_field("is_live", false));
    server.put(Entity::new(2).with_field("host", "10.0.0.2").with_field("is_live", true));

    let collection = MirroredCollection::new().into_shared();
    let engine = SyncEngine::start(
        EngineConfig::new("memory://hosts").with_poll_interval(Duration::from_millis(50)),
        LoopbackTransport {
            server: Arc::clone(&server),
        },
        Arc::clone(&collection),
    );

    thread::sleep(Duration::from_millis(200));
    print_mirror("initial mirror", &collection);

    info!("mutating the server-held collection");
    server.put(Entity::new(1).with_field("is_live", true));
    server.put(Entity::new(3).with_field("host", "10.0.0.3").with_field("is_live", false));
    server.remove(&EntityId::from(2));

    thread::sleep(Duration::from_millis(200));
    print_mirror("mirror after delta", &collection);

    info!(stats = ?engine.stats(), "shutting down");
    engine.shutdown();
}
