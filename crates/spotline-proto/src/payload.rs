//! Frame body payloads and REST history records.
//!
//! Bodies travel as JSON strings inside the envelope `body` field, camelCase
//! on the wire. History records come from the REST history pull and reuse the
//! same vocabulary; live-pushed chat bodies are a subset of the history
//! record (no guaranteed `createdDate`, and the id is absent until the server
//! has recorded the message).

use serde::{Deserialize, Serialize};

use crate::{
    MessageId,
    errors::{Result, WireError},
};

/// Live chat body, inbound on the message channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    /// Server-assigned id; absent for an echo the server has not recorded yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,

    /// Author display name.
    pub writer_name: String,

    /// Message content.
    pub message: String,

    /// Server-side creation time, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
}

impl ChatBody {
    /// Parses a chat body from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Decode`] for malformed bodies; callers log and
    /// drop, they never escalate.
    pub fn parse(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| WireError::Decode { reason: e.to_string() })
    }
}

/// Enter notice body (JSON), both inbound on the enter channel and outbound
/// on the enter publish destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnterBody {
    /// Identity of the participant entering.
    pub writer_name: String,

    /// Counterpart identity; direct rooms only, group rooms omit the field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_name: Option<String>,
}

impl EnterBody {
    /// Parses an enter body from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Decode`] for malformed bodies.
    pub fn parse(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| WireError::Decode { reason: e.to_string() })
    }

    /// Renders the body as JSON text for publishing.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Encode`] if serialization fails.
    pub fn render(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| WireError::Encode { reason: e.to_string() })
    }
}

/// Outgoing chat publish body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBody {
    /// Author identity.
    pub writer_name: String,

    /// Counterpart identity; direct rooms only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_name: Option<String>,

    /// Message content.
    pub message: String,
}

impl SendBody {
    /// Renders the body as JSON text for publishing.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Encode`] if serialization fails.
    pub fn render(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| WireError::Encode { reason: e.to_string() })
    }
}

/// Record kind discriminator in history payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordKind {
    /// Participant entered the room.
    Enter,
    /// Participant left the room.
    Leave,
    /// Ordinary chat message.
    Talk,
}

/// One REST history record.
///
/// History lists arrive ordered oldest → newest by server-assigned creation
/// time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    /// Server-assigned id. Tolerated absent on decode, present in practice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,

    /// Author display name.
    pub writer_name: String,

    /// Message content (or presence notice text).
    pub message: String,

    /// What the record describes.
    pub user_type: RecordKind,

    /// Server-side creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
}

impl HistoryRecord {
    /// Shorthand for an ordinary chat record.
    pub fn talk(id: MessageId, writer_name: &str, message: &str) -> Self {
        Self {
            id: Some(id),
            writer_name: writer_name.to_string(),
            message: message.to_string(),
            user_type: RecordKind::Talk,
            created_date: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn chat_body_parses_full_record_shape() {
        let body = ChatBody::parse(
            r#"{"id":5,"writerName":"coach","message":"test","createdDate":"2024-03-01T10:00:00"}"#,
        )
        .unwrap();
        assert_eq!(body.id, Some(5));
        assert_eq!(body.writer_name, "coach");
        assert_eq!(body.created_date.as_deref(), Some("2024-03-01T10:00:00"));
    }

    #[test]
    fn chat_body_parses_live_subset() {
        // Live pushes may omit both id and createdDate.
        let body = ChatBody::parse(r#"{"writerName":"coach","message":"test"}"#).unwrap();
        assert_eq!(body.id, None);
        assert_eq!(body.created_date, None);
    }

    #[test]
    fn chat_body_rejects_plain_text() {
        assert!(ChatBody::parse("coach left the room").is_err());
    }

    #[test]
    fn enter_body_omits_absent_counterpart() {
        let group = EnterBody { writer_name: "coach".into(), receiver_name: None };
        assert_eq!(group.render().unwrap(), r#"{"writerName":"coach"}"#);

        let direct = EnterBody { writer_name: "coach".into(), receiver_name: Some("kim".into()) };
        assert_eq!(direct.render().unwrap(), r#"{"writerName":"coach","receiverName":"kim"}"#);
    }

    #[test]
    fn send_body_wire_shape() {
        let body = SendBody {
            writer_name: "coach".into(),
            receiver_name: Some("kim".into()),
            message: "see you at 6".into(),
        };
        assert_eq!(
            body.render().unwrap(),
            r#"{"writerName":"coach","receiverName":"kim","message":"see you at 6"}"#
        );
    }

    #[test]
    fn history_record_decodes_screaming_kinds() {
        let json = r#"[
            {"id":1,"writerName":"kim","message":"joined","userType":"ENTER"},
            {"id":2,"writerName":"kim","message":"hi","userType":"TALK"},
            {"id":3,"writerName":"kim","message":"left","userType":"LEAVE"}
        ]"#;
        let records: Vec<HistoryRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records[0].user_type, RecordKind::Enter);
        assert_eq!(records[1].user_type, RecordKind::Talk);
        assert_eq!(records[2].user_type, RecordKind::Leave);
    }
}
