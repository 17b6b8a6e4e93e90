//! Domain core for spotline chat sessions.
//!
//! Pure, I/O-free building blocks composed by the session state machine in
//! `spotline-session`: the room and participant model, the append-ordered
//! timeline store and its history projection, the dedup cache, presence
//! rendering, the bounded-retry reconnect policy, session configuration, and
//! the environment abstraction for deterministic time.

#![forbid(unsafe_code)]

pub mod config;
pub mod dedup;
pub mod env;
pub mod presence;
pub mod reconnect;
pub mod room;
pub mod timeline;

pub use config::SessionConfig;
pub use dedup::DedupCache;
pub use env::Environment;
pub use presence::{PresenceEvent, PresenceKind};
pub use reconnect::{DropCause, Reconnector, RetryConfig, RetryDecision};
pub use room::{ChatUser, Room, RoomKind};
pub use timeline::{ChatEntry, SystemEntry, Timeline, TimelineEntry, project_history};

// Wire-layer ids are part of the domain vocabulary.
pub use spotline_proto::{MessageId, RoomId, RoomMode};
