//! Poll request handling.

use crate::store::ObjectStore;
use livetable_protocol::{Cursor, DeltaResponse, EntityId, PollRequest};
use std::sync::Arc;
use tracing::debug;

/// Computes delta responses from poll requests.
pub struct PollHandler {
    store: Arc<ObjectStore>,
}

impl PollHandler {
    /// Creates a handler over the given store.
    pub fn new(store: Arc<ObjectStore>) -> Self {
        Self { store }
    }

    /// Handles one poll request.
    ///
    /// `objects` carries every entity modified after the request cursor (the
    /// full state when the cursor is absent or not one of ours); `removed`
    /// carries the client-known ids that no longer exist in the store. The
    /// response watermark is the stamp of the newest returned object; when
    /// nothing changed, the client's own cursor is echoed back.
    pub fn handle(&self, request: PollRequest) -> DeltaResponse {
        let since = request.last_modified.as_ref().and_then(Cursor::as_sequence);
        let modified = self.store.modified_since(since);

        let removed: Vec<EntityId> = request
            .ids
            .iter()
            .filter(|id| !self.store.contains(id))
            .cloned()
            .collect();

        let last_modified = modified
            .iter()
            .map(|(stamp, _)| *stamp)
            .max()
            .map(Cursor::from)
            .or(request.last_modified);

        debug!(
            objects = modified.len(),
            removed = removed.len(),
            "poll handled"
        );

        DeltaResponse::new(
            last_modified,
            modified.into_iter().map(|(_, entity)| entity).collect(),
            removed,
        )
    }
}
