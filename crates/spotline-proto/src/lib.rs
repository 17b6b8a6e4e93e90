//! Wire layer for the spotline chat protocol.
//!
//! All traffic on the persistent connection is UTF-8 text: one JSON envelope
//! per frame ([`ClientFrame`] / [`ServerFrame`]) whose `body` string is
//! interpreted per channel: JSON for chat and enter notices ([`ChatBody`],
//! [`EnterBody`]), opaque text for leave notices. [`Destination`] paths route
//! frames to rooms; REST history payloads ([`HistoryRecord`]) share the chat
//! body vocabulary.

#![forbid(unsafe_code)]

pub mod destination;
pub mod envelope;
pub mod errors;
pub mod payload;

pub use destination::{Channel, Destination, RoomMode};
pub use envelope::{CONNECT_PATH, ClientFrame, ServerFrame};
pub use errors::{Result, WireError};
pub use payload::{ChatBody, EnterBody, HistoryRecord, RecordKind, SendBody};

/// Server-assigned room identifier.
pub type RoomId = u64;

/// Server-assigned chat message identifier.
pub type MessageId = u64;
