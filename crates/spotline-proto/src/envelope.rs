//! Connection envelope frames.
//!
//! Every frame on the persistent connection is one UTF-8 text payload holding
//! a tagged JSON envelope. The envelope `body` is itself a string whose
//! interpretation depends on the destination channel: chat and enter bodies
//! are JSON documents, the leave body is opaque text and must never be
//! JSON-parsed.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, WireError};

/// Fixed connect path shared by every room.
///
/// Room identity rides in subscription and publish destinations, not in the
/// connect handshake.
pub const CONNECT_PATH: &str = "/ws/chat";

/// Client → server frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientFrame {
    /// Register interest in one subscribe-form destination.
    Subscribe {
        /// Subscribe-form destination path.
        destination: String,
    },
    /// Drop interest in one subscribe-form destination.
    Unsubscribe {
        /// Subscribe-form destination path.
        destination: String,
    },
    /// Publish one body to a publish-form destination.
    Send {
        /// Publish-form destination path.
        destination: String,
        /// Channel-specific body text.
        body: String,
    },
}

/// Server → client frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerFrame {
    /// One body delivered on a subscribed destination.
    Message {
        /// Subscribe-form destination path the body arrived on.
        destination: String,
        /// Channel-specific body text.
        body: String,
    },
}

impl ClientFrame {
    /// Encodes the frame as one JSON text payload.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Encode`] if serialization fails.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| WireError::Encode { reason: e.to_string() })
    }

    /// Decodes a frame from one JSON text payload.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Decode`] for anything that is not a well-formed
    /// client envelope.
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| WireError::Decode { reason: e.to_string() })
    }
}

impl ServerFrame {
    /// Encodes the frame as one JSON text payload.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Encode`] if serialization fails.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| WireError::Encode { reason: e.to_string() })
    }

    /// Decodes a frame from one JSON text payload.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Decode`] for anything that is not a well-formed
    /// server envelope.
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| WireError::Decode { reason: e.to_string() })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_frame_wire_shape() {
        let frame = ClientFrame::Subscribe { destination: "/topic/chat/message/1".into() };
        assert_eq!(
            frame.encode().unwrap(),
            r#"{"type":"SUBSCRIBE","destination":"/topic/chat/message/1"}"#
        );
    }

    #[test]
    fn send_frame_carries_body_verbatim() {
        let frame = ClientFrame::Send {
            destination: "/app/chat/message/1".into(),
            body: r#"{"writerName":"coach","message":"hi"}"#.into(),
        };
        let decoded = ClientFrame::decode(&frame.encode().unwrap()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn server_message_decodes() {
        let text = r#"{"type":"MESSAGE","destination":"/topic/chat/leave/9","body":"coach left"}"#;
        let frame = ServerFrame::decode(text).unwrap();
        assert_eq!(
            frame,
            ServerFrame::Message {
                destination: "/topic/chat/leave/9".into(),
                body: "coach left".into(),
            }
        );
    }

    #[test]
    fn decode_rejects_unknown_tag() {
        assert!(ServerFrame::decode(r#"{"type":"PING"}"#).is_err());
        assert!(ClientFrame::decode(r#"{"type":"MESSAGE","destination":"x","body":"y"}"#).is_err());
    }

    #[test]
    fn decode_rejects_non_json() {
        assert!(ServerFrame::decode("not json").is_err());
    }
}
