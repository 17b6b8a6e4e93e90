//! Presence events and their timeline rendering.
//!
//! Ephemeral by design: a presence event is rendered into exactly one
//! [`SystemEntry`] and never persisted client-side beyond that.

use crate::timeline::SystemEntry;

/// Membership change direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceKind {
    /// Participant entered the room.
    Enter,
    /// Participant left the room.
    Leave,
}

/// One membership change observed on the live feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEvent {
    /// Change direction.
    pub kind: PresenceKind,

    /// Acting participant. `None` for leave notices: their wire body is
    /// opaque text and carries no parsed actor.
    pub actor: Option<String>,

    /// Notice text as rendered.
    pub message: String,
}

impl PresenceEvent {
    /// Enter notice for a parsed actor.
    pub fn enter(actor: &str) -> Self {
        Self {
            kind: PresenceKind::Enter,
            actor: Some(actor.to_string()),
            message: format!("{actor} entered the room"),
        }
    }

    /// Leave notice carrying an opaque body as its message.
    pub fn leave(message: &str) -> Self {
        Self { kind: PresenceKind::Leave, actor: None, message: message.to_string() }
    }

    /// Renders the event as its system timeline entry.
    pub fn into_entry(self) -> SystemEntry {
        SystemEntry { message: self.message, created_date: None }
    }
}
