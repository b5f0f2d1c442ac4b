//! # LiveTable Protocol
//!
//! Delta-poll protocol types and JSON codecs for LiveTable.
//!
//! This crate provides:
//! - `Entity` and `EntityId` for identity-keyed objects
//! - `Cursor` as the opaque server-issued watermark
//! - Wire messages (`PollRequest`, `DeltaResponse`) and the decoded `Delta`
//! - JSON encoding/decoding
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cursor;
mod entity;
mod error;
mod messages;

pub use cursor::Cursor;
pub use entity::{Entity, EntityId};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{Delta, DeltaResponse, PollRequest};
