//! Room and participant model.
//!
//! A [`Room`] is immutable for the lifetime of the session that opened it.
//! Direct (1:1 consultation) rooms name their two participants; group
//! (course-scoped) rooms name their creator only.

use serde::{Deserialize, Serialize};
use spotline_proto::{RoomId, RoomMode};

/// The user on whose behalf a session acts, resolved once per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatUser {
    /// Backend identifier, when the backend exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    /// Display name; doubles as the writer identity on published frames.
    pub name: String,
}

impl ChatUser {
    /// User known by display name only.
    pub fn named(name: &str) -> Self {
        Self { id: None, name: name.to_string() }
    }
}

/// Participant fields distinguishing the two room flavors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RoomKind {
    /// 1:1 consultation between a sender and a receiver.
    #[serde(rename_all = "camelCase")]
    Direct {
        /// Initiating participant.
        sender_name: String,
        /// Counterpart participant.
        receiver_name: String,
    },
    /// Course-scoped group chat.
    #[serde(rename_all = "camelCase")]
    Group {
        /// Participant who opened the room.
        creator_name: String,
    },
}

/// One chat room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    /// Server-assigned identifier.
    pub id: RoomId,

    /// Display title.
    pub title: String,

    /// Flavor and participant identities.
    #[serde(flatten)]
    pub kind: RoomKind,
}

impl Room {
    /// Destination namespace for this room.
    pub fn mode(&self) -> RoomMode {
        match self.kind {
            RoomKind::Direct { .. } => RoomMode::Direct,
            RoomKind::Group { .. } => RoomMode::Group,
        }
    }

    /// Whether the user may open this room.
    ///
    /// Direct rooms require the user to be one of the two named participants.
    /// Group access is gated upstream by how the room list is surfaced, so
    /// group rooms always authorize here.
    pub fn authorizes(&self, user_name: &str) -> bool {
        match &self.kind {
            RoomKind::Direct { sender_name, receiver_name } => {
                sender_name == user_name || receiver_name == user_name
            },
            RoomKind::Group { .. } => true,
        }
    }

    /// The participant the given user chats with, for direct rooms.
    ///
    /// Group rooms have no single counterpart and return `None`; published
    /// frames omit the counterpart field accordingly.
    pub fn counterpart_of(&self, user_name: &str) -> Option<String> {
        match &self.kind {
            RoomKind::Direct { sender_name, receiver_name } => {
                if sender_name == user_name {
                    Some(receiver_name.clone())
                } else {
                    Some(sender_name.clone())
                }
            },
            RoomKind::Group { .. } => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn direct_room() -> Room {
        Room {
            id: 42,
            title: "PT consultation".into(),
            kind: RoomKind::Direct { sender_name: "kim".into(), receiver_name: "coach".into() },
        }
    }

    fn group_room() -> Room {
        Room {
            id: 7,
            title: "Morning crossfit".into(),
            kind: RoomKind::Group { creator_name: "coach".into() },
        }
    }

    #[test]
    fn direct_room_authorizes_participants_only() {
        let room = direct_room();
        assert!(room.authorizes("kim"));
        assert!(room.authorizes("coach"));
        assert!(!room.authorizes("stranger"));
    }

    #[test]
    fn group_room_authorizes_everyone() {
        // Group access is membership-gated upstream; no per-room check here.
        assert!(group_room().authorizes("stranger"));
    }

    #[test]
    fn counterpart_is_the_other_participant() {
        let room = direct_room();
        assert_eq!(room.counterpart_of("kim").as_deref(), Some("coach"));
        assert_eq!(room.counterpart_of("coach").as_deref(), Some("kim"));
        assert_eq!(group_room().counterpart_of("coach"), None);
    }

    #[test]
    fn room_decodes_from_flattened_kind() {
        let json = r#"{
            "id": 42,
            "title": "PT consultation",
            "kind": "direct",
            "senderName": "kim",
            "receiverName": "coach"
        }"#;
        let room: Room = serde_json::from_str(json).unwrap();
        assert_eq!(room, direct_room());
        assert_eq!(room.mode(), RoomMode::Direct);
    }
}
