//! Error types for the reference server.

use livetable_protocol::ProtocolError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while handling requests.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The request frame could not be decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The request is well-formed but not acceptable.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
