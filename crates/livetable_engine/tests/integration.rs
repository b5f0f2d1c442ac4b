//! Integration tests driving the engine against the reference server.

use livetable_engine::{
    EngineConfig, EngineError, EngineResult, MirroredCollection, SettingsApi, SettingsStore,
    SharedCollection, StreamConnection, StreamTransport, SyncEngine,
};
use livetable_protocol::{Entity, EntityId};
use livetable_server::{DeltaServer, SettingsService};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A transport that answers every sent frame with the reference server's
/// response.
struct InMemoryTransport {
    server: Arc<DeltaServer>,
}

impl InMemoryTransport {
    fn new(server: Arc<DeltaServer>) -> Self {
        Self { server }
    }
}

impl StreamTransport for InMemoryTransport {
    fn connect(&self, _endpoint: &str) -> EngineResult<Box<dyn StreamConnection>> {
        let (tx, rx) = channel();
        Ok(Box::new(InMemoryConnection {
            server: Arc::clone(&self.server),
            inbound_tx: tx,
            inbound_rx: Mutex::new(rx),
            open: AtomicBool::new(true),
        }))
    }
}

struct InMemoryConnection {
    server: Arc<DeltaServer>,
    inbound_tx: Sender<Option<String>>,
    inbound_rx: Mutex<Receiver<Option<String>>>,
    open: AtomicBool,
}

impl StreamConnection for InMemoryConnection {
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

fn start_engine(server: &Arc<DeltaServer>) -> (SyncEngine, SharedCollection) {
    let collection = MirroredCollection::new().into_shared();
    let config = EngineConfig::new("memory://table").with_poll_interval(Duration::from_millis(10));
    let engine = SyncEngine::start(
        config,
        InMemoryTransport::new(Arc::clone(server)),
        Arc::clone(&collection),
    );
    (engine, collection)
}

fn wait_for(what: &str, mut check: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if check() {
            return;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    panic!("timed out waiting for {what}");
}

fn numeric_ids(collection: &SharedCollection) -> Vec<i64> {
    collection
        .read()
        .iter()
        .map(|entity| match entity.id() {
            EntityId::Number(n) => *n,
            EntityId::Text(_) => panic!("numeric fixture"),
        })
        .collect()
}

#[test]
fn mirror_converges_with_server() {
    let server = Arc::new(DeltaServer::new());
    server.put(Entity::new(1).with_field("name", "a"));
    server.put(Entity::new(2).with_field("name", "b"));

    let (engine, collection) = start_engine(&server);

    wait_for("initial state mirrored", || collection.read().len() == 2);
    assert!(engine.cursor().is_some());

    // Update one, add one, delete one on the server.
    server.put(Entity::new(2).with_field("name", "B"));
    server.put(Entity::new(3).with_field("name", "c"));
    server.remove(&EntityId::from(1));

    wait_for("delta mirrored", || numeric_ids(&collection) == vec![2, 3]);

    let guard = collection.read();
    assert_eq!(guard.get(0).unwrap().get("name"), Some(&Value::from("B")));
    assert_eq!(guard.get(1).unwrap().get("name"), Some(&Value::from("c")));
}

#[test]
fn updated_entities_keep_their_position() {
    let server = Arc::new(DeltaServer::new());
    server.put(Entity::new(1).with_field("name", "a").with_field("port", 22));
    server.put(Entity::new(2).with_field("name", "b"));
    server.put(Entity::new(3).with_field("name", "c"));

    let (_engine, collection) = start_engine(&server);
    wait_for("initial state mirrored", || collection.read().len() == 3);

    server.put(Entity::new(1).with_field("name", "A"));

    wait_for("update mirrored", || {
        collection
            .read()
            .get(0)
            .is_some_and(|entity| entity.get("name") == Some(&Value::from("A")))
    });

    // Position and untouched fields both survive the merge.
    assert_eq!(numeric_ids(&collection), vec![1, 2, 3]);
    assert_eq!(
        collection.read().get(0).unwrap().get("port"),
        Some(&Value::from(22))
    );
}

#[test]
fn batched_server_removals_converge() {
    let server = Arc::new(DeltaServer::new());
    for id in 1..=5 {
        server.put(Entity::new(id));
    }

    let (_engine, collection) = start_engine(&server);
    wait_for("initial state mirrored", || collection.read().len() == 5);

    for id in [2, 3, 5] {
        server.remove(&EntityId::from(id));
    }

    wait_for("removals mirrored", || numeric_ids(&collection) == vec![1, 4]);
}

#[test]
fn quiet_polling_leaves_mirror_untouched() {
    let server = Arc::new(DeltaServer::new());
    server.put(Entity::new(1).with_field("name", "a"));

    let (engine, collection) = start_engine(&server);
    wait_for("initial state mirrored", || collection.read().len() == 1);

    let cursor = engine.cursor();
    let snapshot = collection.read().clone();
    let polls = engine.stats().polls_sent;

    // Several more poll cycles with nothing changing server-side.
    wait_for("polling continues", || engine.stats().polls_sent >= polls + 3);

    assert_eq!(*collection.read(), snapshot);
    assert_eq!(engine.cursor(), cursor);
    assert_eq!(engine.stats().decode_failures, 0);
}

#[test]
fn engine_shutdown_is_clean() {
    let server = Arc::new(DeltaServer::new());
    server.put(Entity::new(1));

    let (engine, collection) = start_engine(&server);
    wait_for("initial state mirrored", || collection.read().len() == 1);

    engine.shutdown();

    // The caller still owns the collection after the engine is gone.
    assert_eq!(collection.read().len(), 1);
}

/// Bridges the engine's settings boundary to the in-memory service.
struct ServiceApi(Arc<SettingsService>);

impl SettingsApi for ServiceApi {
    fn fetch_values(&self) -> EngineResult<Map<String, Value>> {
        Ok(self.0.values())
    }

    fn fetch_names(&self) -> EngineResult<BTreeMap<String, String>> {
        Ok(self.0.names())
    }

    fn submit(&self, values: &Map<String, Value>) -> EngineResult<()> {
        self.0
            .update(values)
            .map_err(|e| EngineError::Settings(e.to_string()))
    }

    fn reset(&self) -> EngineResult<()> {
        self.0.reset();
        Ok(())
    }
}

#[test]
fn settings_roundtrip_against_service() {
    let service = Arc::new(
        SettingsService::new()
            .with_setting("ssh.tasks_count", "SSH check tasks", 20)
            .with_setting("web.port", "Web server port", 6080),
    );

    let mut store = SettingsStore::new(ServiceApi(Arc::clone(&service)));
    store.load().unwrap();

    assert_eq!(store.get("web.port").unwrap().value, Value::from(6080));
    assert_eq!(store.get("web.port").unwrap().readable_name, "Web server port");
    assert!(!store.is_changed());

    store.set("web.port", 8080);
    assert!(store.is_changed());
    store.save().unwrap();

    assert!(!store.is_changed());
    assert_eq!(service.values().get("web.port"), Some(&Value::from(8080)));

    store.reset_defaults().unwrap();
    assert_eq!(store.get("web.port").unwrap().value, Value::from(6080));
}
