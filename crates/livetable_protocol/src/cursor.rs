//! Opaque server-issued watermark.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An opaque watermark marking the point up to which the client has observed
/// changes.
///
/// The server issues cursors and advances them monotonically; the client never
/// inspects one, it only echoes the most recent cursor back in the next poll
/// request. The wrapped JSON value can be a timestamp string, a sequence
/// number, or anything else the server chooses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(Value);

impl Cursor {
    /// Wraps a raw JSON value as a cursor.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Returns the raw JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Returns true if the wrapped value is JSON `null`.
    ///
    /// A null cursor carries no information; decoders normalize it away so
    /// "null" and "absent" are indistinguishable downstream.
    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    /// Interprets the cursor as a sequence number, if it is one.
    ///
    /// Servers that stamp entities with integer sequences use this to resume
    /// from a client-echoed cursor. Returns `None` for any other shape.
    pub fn as_sequence(&self) -> Option<u64> {
        self.0.as_u64()
    }
}

impl From<u64> for Cursor {
    fn from(sequence: u64) -> Self {
        Self(Value::from(sequence))
    }
}

impl From<&str> for Cursor {
    fn from(text: &str) -> Self {
        Self(Value::from(text))
    }
}
