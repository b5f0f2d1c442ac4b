//! Wire messages for the delta-poll protocol.

use crate::cursor::Cursor;
use crate::entity::{Entity, EntityId};
use crate::error::ProtocolResult;
use serde::{Deserialize, Serialize};

/// Poll request from the client, one per poll tick.
///
/// `ids` is the set of identifiers currently present in the client's mirrored
/// collection (order irrelevant); it lets the server compute which known ids
/// have since been deleted. `last_modified` is the client's current cursor,
/// `null` on the first request, meaning "send full current state".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollRequest {
    /// Cursor of the last observed change, if any.
    #[serde(default)]
    pub last_modified: Option<Cursor>,
    /// Identifiers the client currently knows about.
    #[serde(default)]
    pub ids: Vec<EntityId>,
}

impl PollRequest {
    /// Creates a new poll request.
    pub fn new(last_modified: Option<Cursor>, ids: Vec<EntityId>) -> Self {
        Self { last_modified, ids }
    }

    /// Encodes to a JSON frame.
    pub fn encode(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes from a JSON frame.
    pub fn decode(frame: &str) -> ProtocolResult<Self> {
        let mut request: Self = serde_json::from_str(frame)?;
        if request.last_modified.as_ref().is_some_and(Cursor::is_null) {
            request.last_modified = None;
        }
        Ok(request)
    }
}

/// Delta response from the server.
///
/// Any of the fields may be absent; an absent `last_modified` means "no
/// progress signaled" and leaves the client cursor unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaResponse {
    /// New watermark, if the server observed progress.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Cursor>,
    /// Entities created or modified since the request cursor. Each carries at
    /// least its `id`; the rest of the fields may be partial.
    #[serde(default)]
    pub objects: Vec<Entity>,
    /// Identifiers the client knows about that no longer exist on the server.
    #[serde(default)]
    pub removed: Vec<EntityId>,
}

impl DeltaResponse {
    /// Creates a new delta response.
    pub fn new(last_modified: Option<Cursor>, objects: Vec<Entity>, removed: Vec<EntityId>) -> Self {
        Self {
            last_modified,
            objects,
            removed,
        }
    }

    /// Encodes to a JSON frame.
    pub fn encode(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes from a JSON frame.
    ///
    /// A frame containing an object without a valid `id`, or one that is not
    /// a JSON object of the expected shape, is rejected as a whole. A literal
    /// `null` watermark is normalized to "absent".
    pub fn decode(frame: &str) -> ProtocolResult<Self> {
        let mut response: Self = serde_json::from_str(frame)?;
        if response.last_modified.as_ref().is_some_and(Cursor::is_null) {
            response.last_modified = None;
        }
        Ok(response)
    }
}

/// A decoded delta: the difference between two observed states of the
/// server-held collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Delta {
    /// Watermark to advance to after applying, if signaled.
    pub cursor: Option<Cursor>,
    /// Entities to insert or merge.
    pub upserts: Vec<Entity>,
    /// Identifiers to remove.
    pub removed_ids: Vec<EntityId>,
}

impl Delta {
    /// Returns true if applying this delta cannot change a collection.
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.removed_ids.is_empty()
    }
}

impl From<DeltaResponse> for Delta {
    fn from(response: DeltaResponse) -> Self {
        Self {
            cursor: response.last_modified,
            upserts: response.objects,
            removed_ids: response.removed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn poll_request_first_poll() {
        let request = PollRequest::new(None, vec![]);
        let frame = request.encode().unwrap();

        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value, json!({"last_modified": null, "ids": []}));
    }

    #[test]
    fn poll_request_carries_cursor_and_ids() {
        let request = PollRequest::new(
            Some(Cursor::from(9u64)),
            vec![EntityId::from(1), EntityId::from("a")],
        );
        let frame = request.encode().unwrap();
        let decoded = PollRequest::decode(&frame).unwrap();

        assert_eq!(decoded, request);
    }

    #[test]
    fn delta_response_defaults() {
        let response = DeltaResponse::decode("{}").unwrap();
        assert!(response.last_modified.is_none());
        assert!(response.objects.is_empty());
        assert!(response.removed.is_empty());
    }

    #[test]
    fn null_watermark_means_no_progress() {
        let response = DeltaResponse::decode(r#"{"last_modified": null}"#).unwrap();
        assert!(response.last_modified.is_none());
    }

    #[test]
    fn delta_response_full() {
        let frame = r#"{
            "last_modified": "2021-06-12 08:44:10",
            "objects": [{"id": 2, "name": "B"}, {"id": 3, "name": "c"}],
            "removed": [1]
        }"#;

        let response = DeltaResponse::decode(frame).unwrap();
        assert_eq!(response.objects.len(), 2);
        assert_eq!(response.removed, vec![EntityId::from(1)]);

        let delta = Delta::from(response);
        assert_eq!(delta.upserts.len(), 2);
        assert_eq!(delta.removed_ids.len(), 1);
        assert!(!delta.is_empty());
    }

    #[test]
    fn object_without_id_rejects_frame() {
        let frame = r#"{"objects": [{"name": "a"}]}"#;
        assert!(DeltaResponse::decode(frame).is_err());
    }

    #[test]
    fn garbage_frame_rejected() {
        assert!(DeltaResponse::decode("not json").is_err());
        assert!(DeltaResponse::decode("[1, 2]").is_err());
    }

    #[test]
    fn empty_delta_is_empty() {
        let delta = Delta::from(DeltaResponse::new(Some(Cursor::from(1u64)), vec![], vec![]));
        assert!(delta.is_empty());
    }
}
