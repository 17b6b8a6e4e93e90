//! Session misuse errors.

use spotline_core::RoomId;
use spotline_proto::WireError;
use thiserror::Error;

use crate::session::SessionPhase;

/// Error returned by [`RoomSession::handle`](crate::RoomSession::handle).
///
/// These mark caller misuse or wire-encode failures. Everything the outside
/// world does wrong (fetch failures, dropped links, malformed frames) is an
/// event, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A send was attempted while the live link is not up.
    #[error("not connected: cannot {operation} yet")]
    NotConnected {
        /// What the caller tried to do.
        operation: &'static str,
    },

    /// An operation is not valid in the current phase.
    #[error("cannot {operation} while {phase:?}")]
    InvalidPhase {
        /// Phase the session was in.
        phase: SessionPhase,
        /// What the caller tried to do.
        operation: &'static str,
    },

    /// `Started` was handled twice.
    #[error("session already started")]
    AlreadyStarted,

    /// A subscription set is already registered for the room.
    #[error("subscriptions already active for room {room_id}")]
    AlreadySubscribed {
        /// Room whose set is live.
        room_id: RoomId,
    },

    /// A wire body failed to encode or decode.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),
}
