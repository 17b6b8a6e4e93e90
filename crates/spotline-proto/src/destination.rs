//! Destination grammar for room-scoped routing.
//!
//! Room identity is carried in destinations, never in the connect handshake.
//! Subscribe destinations live under `/topic/...`, publish destinations under
//! `/app/...`; both end in the room id. Direct and group rooms use parallel
//! but distinctly named namespaces (`chat` vs `group-chat`); the two trees
//! are never interchangeable.

use serde::{Deserialize, Serialize};

use crate::{
    RoomId,
    errors::{Result, WireError},
};

/// Room flavor selecting the destination namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomMode {
    /// 1:1 consultation room.
    Direct,
    /// Course-scoped group room.
    Group,
}

impl RoomMode {
    /// Path segment naming this mode's namespace.
    fn scope(self) -> &'static str {
        match self {
            Self::Direct => "chat",
            Self::Group => "group-chat",
        }
    }

    fn from_scope(scope: &str) -> Option<Self> {
        match scope {
            "chat" => Some(Self::Direct),
            "group-chat" => Some(Self::Group),
            _ => None,
        }
    }
}

/// Logical channel within a room's destination set.
///
/// The three channels are independent: a malformed body on one must never
/// stall the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Chat message notices.
    Message,
    /// Enter notices (JSON body).
    Enter,
    /// Leave notices (opaque text body).
    Leave,
}

impl Channel {
    /// Registration order for a room's subscribe set.
    pub const ALL: [Self; 3] = [Self::Message, Self::Enter, Self::Leave];

    fn segment(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Enter => "enter",
            Self::Leave => "leave",
        }
    }

    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "message" => Some(Self::Message),
            "enter" => Some(Self::Enter),
            "leave" => Some(Self::Leave),
            _ => None,
        }
    }
}

/// One fully qualified room destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Destination {
    /// Namespace (direct vs group).
    pub mode: RoomMode,
    /// Logical channel.
    pub channel: Channel,
    /// Room the destination belongs to.
    pub room_id: RoomId,
}

impl Destination {
    /// Creates the destination for one room channel.
    pub fn new(mode: RoomMode, channel: Channel, room_id: RoomId) -> Self {
        Self { mode, channel, room_id }
    }

    /// The three subscribe destinations for one room, in registration order.
    pub fn subscribe_set(mode: RoomMode, room_id: RoomId) -> [Self; 3] {
        Channel::ALL.map(|channel| Self::new(mode, channel, room_id))
    }

    /// Renders the subscribe-form (server → client) path.
    pub fn subscribe_path(&self) -> String {
        format!("/topic/{}/{}/{}", self.mode.scope(), self.channel.segment(), self.room_id)
    }

    /// Renders the publish-form (client → server) path.
    pub fn publish_path(&self) -> String {
        format!("/app/{}/{}/{}", self.mode.scope(), self.channel.segment(), self.room_id)
    }

    /// Parses a subscribe-form path as delivered on inbound frames.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnknownDestination`] when the path does not match
    /// the `/topic/{scope}/{channel}/{room_id}` grammar.
    pub fn parse(path: &str) -> Result<Self> {
        let unknown = || WireError::UnknownDestination { destination: path.to_string() };

        let rest = path.strip_prefix("/topic/").ok_or_else(unknown)?;
        let mut segments = rest.splitn(3, '/');
        let (Some(scope), Some(channel), Some(id)) =
            (segments.next(), segments.next(), segments.next())
        else {
            return Err(unknown());
        };

        let mode = RoomMode::from_scope(scope).ok_or_else(unknown)?;
        let channel = Channel::from_segment(channel).ok_or_else(unknown)?;
        // Trailing segments land in `id` and fail the integer parse.
        let room_id = id.parse::<RoomId>().map_err(|_| unknown())?;

        Ok(Self { mode, channel, room_id })
    }
}
