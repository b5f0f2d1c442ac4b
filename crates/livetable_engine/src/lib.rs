//! # LiveTable Engine
//!
//! Client-side delta-sync engine for LiveTable.
//!
//! The engine keeps a caller-owned, in-memory ordered collection of entities
//! mirrored against a server-held version of that collection, over a
//! persistent streaming connection with periodic delta polling.
//!
//! This crate provides:
//! - `MirroredCollection` and the in-place merge algorithm
//! - Connection lifecycle management with fixed-delay reconnection
//! - Generation-tagged poll scheduling
//! - A transport abstraction with a scripted mock
//! - A settings client for the non-streaming settings surface
//!
//! ## Architecture
//!
//! One engine thread processes a single sequential stream of events:
//! connection opens and closures, inbound frames, poll ticks, and reconnect
//! timers. Every poll sends the current cursor plus the set of known ids;
//! every inbound delta is merged in place, preserving entity identity and
//! insertion order.
//!
//! ## Key Invariants
//!
//! - The server is the sole writer; the client is a read-only mirror.
//! - At most one live connection, and one poll timer, per generation.
//! - The cursor persists across reconnects.
//! - Connection and decode failures never surface to the caller; the engine
//!   absorbs them and retries indefinitely.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
mod config;
mod connection;
mod engine;
mod error;
mod merge;
mod scheduler;
mod settings;
mod transport;

pub use collection::{MirroredCollection, SharedCollection};
pub use config::{EngineConfig, DEFAULT_POLL_INTERVAL, DEFAULT_RECONNECT_DELAY};
pub use connection::ConnectionState;
pub use engine::{SyncEngine, SyncStats};
pub use error::{EngineError, EngineResult};
pub use merge::{apply_delta, MergeOutcome};
pub use settings::{Setting, SettingsApi, SettingsStore};
pub use transport::{MockRemote, MockTransport, StreamConnection, StreamTransport};
