//! Inputs and outputs of the session machine.
//!
//! [`SessionEvent`] is everything that can happen to a session: embedder
//! commands, backend call results, connection lifecycle, inbound frames and
//! timer expiry. [`SessionAction`] is everything a session can ask its
//! runtime to do in response. The machine itself never blocks and never
//! touches a socket.

use std::time::Duration;

use spotline_core::{ChatUser, MessageId, Room, TimelineEntry};
use spotline_proto::{Destination, HistoryRecord};

use crate::backend::BackendError;

/// Timers the machine schedules through [`SessionAction::StartTimer`].
///
/// Expiry comes back as [`SessionEvent::TimerFired`]. Stale timers (fired
/// after the phase they belonged to ended) are ignored, so the runtime never
/// needs to cancel one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    /// Delay before the next reconnect attempt.
    Retry,
    /// Delay between publishing a message and re-fetching history.
    Reconcile,
    /// Grace between publishing the leave notice and tearing the link down.
    LeaveGrace,
}

/// Everything that can happen to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Begin the lifecycle: resolve the user, the room, the history, then
    /// connect.
    Started,

    /// The signed-in user resolved.
    UserFetched(ChatUser),
    /// The signed-in user could not be resolved.
    UserFetchFailed {
        /// Backend failure.
        error: BackendError,
    },

    /// Room metadata resolved.
    RoomFetched(Room),
    /// Room metadata could not be fetched.
    RoomFetchFailed {
        /// Backend failure. `NotFound` and `Forbidden` map to distinct
        /// terminal failures.
        error: BackendError,
    },

    /// A history pull completed. While loading this seeds the timeline;
    /// while live it reconciles the timeline by full replacement.
    HistoryFetched {
        /// Persisted records, oldest first.
        records: Vec<HistoryRecord>,
    },
    /// A history pull failed.
    HistoryFetchFailed {
        /// Backend failure.
        error: BackendError,
    },

    /// The connection attempt succeeded and the link is up.
    Connected,
    /// The connection attempt failed, or an established link dropped.
    ConnectionLost {
        /// How the link went away. Drives the retry delay.
        cause: spotline_core::DropCause,
    },

    /// The transport delivered one frame.
    FrameReceived {
        /// Raw destination path the frame arrived on.
        destination: String,
        /// Raw body text.
        body: String,
    },

    /// A timer scheduled by the machine elapsed.
    TimerFired(Timer),

    /// Embedder wants to send a chat message.
    SendMessage {
        /// Message text.
        content: String,
    },
    /// Embedder wants to rewrite a persisted message.
    EditMessage {
        /// Persisted message id.
        id: MessageId,
        /// Replacement text.
        content: String,
    },
    /// Embedder wants to remove a persisted message.
    DeleteMessage {
        /// Persisted message id.
        id: MessageId,
    },

    /// The edit call succeeded.
    EditConfirmed {
        /// Persisted message id.
        id: MessageId,
        /// Text the server now holds.
        content: String,
    },
    /// The edit call failed; the timeline is left untouched.
    EditFailed {
        /// Persisted message id.
        id: MessageId,
        /// Backend failure.
        error: BackendError,
    },
    /// The delete call succeeded.
    DeleteConfirmed {
        /// Persisted message id.
        id: MessageId,
    },
    /// The delete call failed; the timeline is left untouched.
    DeleteFailed {
        /// Persisted message id.
        id: MessageId,
        /// Backend failure.
        error: BackendError,
    },

    /// Embedder wants to leave the room through the full leave protocol.
    Leave,
    /// Embedder is going away now: best-effort leave notice, immediate
    /// close, no grace and no disposal check.
    Teardown,
}

/// Everything a session can ask its runtime to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Resolve the signed-in user.
    FetchUser,
    /// Fetch the room's metadata.
    FetchRoom,
    /// Fetch the room's full history.
    FetchHistory,
    /// Open the persistent connection.
    OpenConnection,
    /// Register one subscription on the live link.
    Subscribe(Destination),
    /// Remove one subscription from the live link.
    Unsubscribe(Destination),
    /// Publish one body to a publish destination.
    Publish {
        /// Channel to publish on.
        destination: Destination,
        /// Rendered body text.
        body: String,
    },
    /// Close the persistent connection. Idempotent.
    CloseConnection,
    /// Schedule `timer` to fire after `after`.
    StartTimer {
        /// Which timer.
        timer: Timer,
        /// Delay before expiry.
        after: Duration,
    },
    /// Run the edit call against the backend.
    EditViaBackend {
        /// Persisted message id.
        id: MessageId,
        /// Replacement text.
        content: String,
    },
    /// Run the delete call against the backend.
    DeleteViaBackend {
        /// Persisted message id.
        id: MessageId,
    },
    /// Ask the server to evaluate the room for disposal. Failures are
    /// logged and never surface.
    AutoDeleteCheck,
    /// Surface a typed notice to the embedder.
    Notify(SessionNotice),
    /// Emit a log line.
    Log {
        /// Message to log.
        message: String,
    },
}

/// Typed notices surfaced to the embedder.
///
/// Rendering and navigation stay with the embedder; the session only
/// reports what changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// The timeline changed; this is the complete new content.
    TimelineUpdated(Vec<TimelineEntry>),
    /// The session is subscribed and rendering the live feed.
    Live,
    /// The session failed terminally.
    Failed(SessionFailure),
    /// A send was rejected before reaching the wire.
    SendRejected {
        /// Why the send did not go out.
        reason: String,
    },
    /// An edit call failed; the message keeps its previous text.
    EditRejected {
        /// Persisted message id.
        id: MessageId,
        /// Why the edit did not apply.
        reason: String,
    },
    /// A delete call failed; the message is still there.
    DeleteRejected {
        /// Persisted message id.
        id: MessageId,
        /// Why the delete did not apply.
        reason: String,
    },
    /// The session closed and will produce nothing further.
    Closed,
}

/// Terminal failure taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionFailure {
    /// The signed-in user is not a participant of this room.
    #[error("not a participant of this room")]
    Forbidden,

    /// The room does not exist.
    #[error("room not found")]
    RoomNotFound,

    /// The signed-in user could not be resolved.
    #[error("user unavailable: {reason}")]
    UserUnavailable {
        /// Backend failure detail.
        reason: String,
    },

    /// Room metadata could not be fetched.
    #[error("room unavailable: {reason}")]
    RoomUnavailable {
        /// Backend failure detail.
        reason: String,
    },

    /// The initial history pull failed.
    #[error("history unavailable: {reason}")]
    HistoryUnavailable {
        /// Backend failure detail.
        reason: String,
    },

    /// Every reconnect attempt in the budget failed.
    #[error("connection lost and retries exhausted")]
    ConnectionExhausted,
}
