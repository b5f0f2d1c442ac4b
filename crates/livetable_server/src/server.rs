//! The reference delta server.

use crate::error::ServerResult;
use crate::handler::PollHandler;
use crate::store::ObjectStore;
use livetable_protocol::{DeltaResponse, Entity, EntityId, PollRequest};
use std::sync::Arc;

/// An in-memory server for the delta-poll protocol.
///
/// Holds the authoritative collection and answers poll requests with deltas.
/// There is no network layer here; tests and demos bridge frames to it
/// through whatever transport they use.
///
/// # Example
///
/// ```
/// use livetable_server::DeltaServer;
/// use livetable_protocol::{Entity, PollRequest};
///
/// let server = DeltaServer::new();
/// server.put(Entity::new(1).with_field("name", "a"));
///
/// let response = server.handle_poll(PollRequest::new(None, vec![]));
/// assert_eq!(response.objects.len(), 1);
/// ```
pub struct DeltaServer {
    store: Arc<ObjectStore>,
    handler: PollHandler,
}

impl DeltaServer {
    /// Creates a server with an empty store.
    pub fn new() -> Self {
        Self::with_store(Arc::new(ObjectStore::new()))
    }

    /// Creates a server over an existing store.
    pub fn with_store(store: Arc<ObjectStore>) -> Self {
        let handler = PollHandler::new(Arc::clone(&store));
        Self { store, handler }
    }

    /// Handles a decoded poll request.
    pub fn handle_poll(&self, request: PollRequest) -> DeltaResponse {
        self.handler.handle(request)
    }

    /// Handles a raw request frame, returning the encoded response frame.
    pub fn handle_frame(&self, frame: &str) -> ServerResult<String> {
        let request = PollRequest::decode(frame)?;
        let response = self.handle_poll(request);
        Ok(response.encode()?)
    }

    /// Inserts or updates an entity in the authoritative collection.
    pub fn put(&self, entity: Entity) -> u64 {
        self.store.put(entity)
    }

    /// Removes an entity from the authoritative collection.
    pub fn remove(&self, id: &EntityId) -> bool {
        self.store.remove(id)
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<ObjectStore> {
        &self.store
    }

    /// Number of entities currently held.
    pub fn object_count(&self) -> usize {
        self.store.len()
    }
}

impl Default for DeltaServer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livetable_protocol::Cursor;

    #[test]
    fn full_poll_flow() {
        let server = DeltaServer::new();
        server.put(Entity::new(1).with_field("name", "a"));
        server.put(Entity::new(2).with_field("name", "b"));

        // 1. First poll: full state.
        let response = server.handle_poll(PollRequest::new(None, vec![]));
        assert_eq!(response.objects.len(), 2);
        let cursor = response.last_modified.clone().unwrap();

        // 2. Mutate: update one, remove one, add one.
        server.put(Entity::new(2).with_field("name", "B"));
        server.remove(&EntityId::from(1));
        server.put(Entity::new(3).with_field("name", "c"));

        // 3. Incremental poll advertises the known ids.
        let response = server.handle_poll(PollRequest::new(
            Some(cursor),
            vec![EntityId::from(1), EntityId::from(2)],
        ));
        assert_eq!(response.objects.len(), 2);
        assert_eq!(response.removed, vec![EntityId::from(1)]);
    }

    #[test]
    fn frame_roundtrip() {
        let server = DeltaServer::new();
        server.put(Entity::new("srv-1"));

        let request = PollRequest::new(None, vec![]).encode().unwrap();
        let frame = server.handle_frame(&request).unwrap();

        let response = DeltaResponse::decode(&frame).unwrap();
        assert_eq!(response.objects.len(), 1);
        assert_eq!(response.last_modified, Some(Cursor::from(1u64)));
    }

    #[test]
    fn malformed_frame_is_an_error() {
        let server = DeltaServer::new();
        assert!(server.handle_frame("{nope").is_err());
    }

    #[test]
    fn shared_store() {
        let store = Arc::new(ObjectStore::new());
        let server = DeltaServer::with_store(Arc::clone(&store));

        store.put(Entity::new(1));
        assert_eq!(server.object_count(), 1);
    }
}
