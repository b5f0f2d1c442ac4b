//! Error types for protocol encoding and decoding.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding protocol frames.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The frame is not well-formed JSON, or does not match the expected shape.
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] serde_json::Error),

    /// An entity payload is missing its `id` field.
    #[error("entity is missing the id field")]
    MissingId,

    /// An entity `id` field has an unsupported type.
    #[error("entity id must be a string or an integer, got {0}")]
    InvalidId(String),
}
