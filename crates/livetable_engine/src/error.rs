//! Error types for the sync engine.
//!
//! None of these errors reach the embedding application through the engine
//! itself; connection and decode failures are absorbed and retried. They are
//! the currency of the transport and settings boundary traits.

use livetable_protocol::ProtocolError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur inside the sync engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The connection was closed by the remote side or errored.
    #[error("connection closed")]
    ConnectionClosed,

    /// An operation required an open connection and there was none.
    #[error("not connected")]
    NotConnected,

    /// An inbound frame could not be decoded.
    #[error(transparent)]
    Decode(#[from] ProtocolError),

    /// The settings endpoint rejected a request.
    #[error("settings error: {0}")]
    Settings(String),
}

impl EngineError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if the operation that produced this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Transport { retryable, .. } => *retryable,
            EngineError::ConnectionClosed | EngineError::NotConnected => true,
            EngineError::Decode(_) | EngineError::Settings(_) => false,
        }
    }
}
