//! REST backend seam.
//!
//! The session machine never performs I/O. Every REST interaction it needs
//! (user lookup, room metadata, history pulls, edit/delete, the post-leave
//! disposal check) is an action the runtime executes through this trait, so
//! tests drive sessions against a scripted backend and production wires in
//! the HTTP client.

use std::future::Future;

use spotline_core::{ChatUser, MessageId, Room, RoomId, RoomMode};
use spotline_proto::HistoryRecord;
use thiserror::Error;

/// Failure surfaced by a backend call.
///
/// The distinction matters to the session machine: a missing room and a
/// forbidden room fail the session differently, and everything else is
/// reported as unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The requested resource does not exist.
    #[error("not found")]
    NotFound,

    /// The caller is not allowed to access the resource.
    #[error("forbidden")]
    Forbidden,

    /// Transport failure or server-side error.
    #[error("backend unavailable: {reason}")]
    Unavailable {
        /// Human-readable failure detail.
        reason: String,
    },
}

impl BackendError {
    /// Unavailable variant from any displayable error.
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            reason: err.to_string(),
        }
    }
}

/// REST operations a chat session depends on.
///
/// Implementations must be cheap to clone: the runtime clones the backend
/// into each spawned call so results can outlive the borrow.
pub trait Backend: Clone + Send + Sync + 'static {
    /// Resolves the signed-in user.
    fn current_user(&self) -> impl Future<Output = Result<ChatUser, BackendError>> + Send;

    /// Fetches metadata for one room.
    fn fetch_room(
        &self,
        mode: RoomMode,
        room_id: RoomId,
    ) -> impl Future<Output = Result<Room, BackendError>> + Send;

    /// Fetches the room's full message history, oldest first.
    fn fetch_history(
        &self,
        mode: RoomMode,
        room_id: RoomId,
    ) -> impl Future<Output = Result<Vec<HistoryRecord>, BackendError>> + Send;

    /// Rewrites the content of a persisted message.
    fn edit_message(
        &self,
        mode: RoomMode,
        room_id: RoomId,
        message_id: MessageId,
        content: String,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Removes a persisted message.
    fn delete_message(
        &self,
        mode: RoomMode,
        room_id: RoomId,
        message_id: MessageId,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Asks the server to evaluate a direct room for disposal after the
    /// caller left it.
    fn auto_delete_check(
        &self,
        room_id: RoomId,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
}
