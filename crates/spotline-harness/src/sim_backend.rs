//! Scripted REST backend.

use std::collections::VecDeque;
use std::future::{ready, Future};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use spotline_core::{ChatUser, MessageId, Room, RoomId, RoomMode};
use spotline_proto::HistoryRecord;
use spotline_session::{Backend, BackendError};

/// One recorded backend invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    /// `current_user` ran.
    CurrentUser,
    /// `fetch_room` ran.
    FetchRoom {
        /// Room flavor requested.
        mode: RoomMode,
        /// Room requested.
        room_id: RoomId,
    },
    /// `fetch_history` ran.
    FetchHistory {
        /// Room flavor requested.
        mode: RoomMode,
        /// Room requested.
        room_id: RoomId,
    },
    /// `edit_message` ran.
    EditMessage {
        /// Room flavor requested.
        mode: RoomMode,
        /// Room holding the message.
        room_id: RoomId,
        /// Message rewritten.
        message_id: MessageId,
        /// Replacement content.
        content: String,
    },
    /// `delete_message` ran.
    DeleteMessage {
        /// Room flavor requested.
        mode: RoomMode,
        /// Room holding the message.
        room_id: RoomId,
        /// Message removed.
        message_id: MessageId,
    },
    /// `auto_delete_check` ran.
    AutoDeleteCheck {
        /// Room evaluated for disposal.
        room_id: RoomId,
    },
}

#[derive(Debug, Default)]
struct BackendState {
    user: Option<ChatUser>,
    room: Option<Room>,
    history: Vec<HistoryRecord>,
    user_failures: VecDeque<BackendError>,
    room_failures: VecDeque<BackendError>,
    history_failures: VecDeque<BackendError>,
    edit_failures: VecDeque<BackendError>,
    delete_failures: VecDeque<BackendError>,
    calls: Vec<BackendCall>,
}

/// In-memory backend replaying a scripted world.
///
/// Serve a user, a room, and a history up front; queue one-shot failures to
/// exercise the error paths. Edits and deletes mutate the scripted history,
/// so a later reconciliation fetch reflects them the way a real server
/// would. Every invocation is recorded for assertion via
/// [`SimBackend::calls`].
#[derive(Debug, Clone, Default)]
pub struct SimBackend {
    state: Arc<Mutex<BackendState>>,
}

impl SimBackend {
    /// Empty backend. Calls fail until a user and room are served.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the signed-in user returned by `current_user`.
    pub fn serve_user(&self, user: ChatUser) {
        self.state().user = Some(user);
    }

    /// Sets the room returned by `fetch_room`.
    pub fn serve_room(&self, room: Room) {
        self.state().room = Some(room);
    }

    /// Replaces the history returned by `fetch_history`.
    pub fn serve_history(&self, records: Vec<HistoryRecord>) {
        self.state().history = records;
    }

    /// Appends one record, as if the server persisted a new message.
    pub fn push_history(&self, record: HistoryRecord) {
        self.state().history.push(record);
    }

    /// Queues a one-shot failure for the next `current_user` call.
    pub fn fail_next_user(&self, error: BackendError) {
        self.state().user_failures.push_back(error);
    }

    /// Queues a one-shot failure for the next `fetch_room` call.
    pub fn fail_next_room(&self, error: BackendError) {
        self.state().room_failures.push_back(error);
    }

    /// Queues a one-shot failure for the next `fetch_history` call.
    pub fn fail_next_history(&self, error: BackendError) {
        self.state().history_failures.push_back(error);
    }

    /// Queues a one-shot failure for the next `edit_message` call.
    pub fn fail_next_edit(&self, error: BackendError) {
        self.state().edit_failures.push_back(error);
    }

    /// Queues a one-shot failure for the next `delete_message` call.
    pub fn fail_next_delete(&self, error: BackendError) {
        self.state().delete_failures.push_back(error);
    }

    /// Every invocation made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<BackendCall> {
        self.state().calls.clone()
    }

    /// Current scripted history, including edit/delete mutations.
    #[must_use]
    pub fn history(&self) -> Vec<HistoryRecord> {
        self.state().history.clone()
    }

    fn state(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Backend for SimBackend {
    fn current_user(&self) -> impl Future<Output = Result<ChatUser, BackendError>> + Send {
        let result = {
            let mut state = self.state();
            state.calls.push(BackendCall::CurrentUser);
            match state.user_failures.pop_front() {
                Some(error) => Err(error),
                None => state
                    .user
                    .clone()
                    .ok_or_else(|| BackendError::unavailable("no scripted user")),
            }
        };
        ready(result)
    }

    fn fetch_room(
        &self,
        mode: RoomMode,
        room_id: RoomId,
    ) -> impl Future<Output = Result<Room, BackendError>> + Send {
        let result = {
            let mut state = self.state();
            state.calls.push(BackendCall::FetchRoom { mode, room_id });
            match state.room_failures.pop_front() {
                Some(error) => Err(error),
                None => state.room.clone().ok_or(BackendError::NotFound),
            }
        };
        ready(result)
    }

    fn fetch_history(
        &self,
        mode: RoomMode,
        room_id: RoomId,
    ) -> impl Future<Output = Result<Vec<HistoryRecord>, BackendError>> + Send {
        let result = {
            let mut state = self.state();
            state.calls.push(BackendCall::FetchHistory { mode, room_id });
            match state.history_failures.pop_front() {
                Some(error) => Err(error),
                None => Ok(state.history.clone()),
            }
        };
        ready(result)
    }

    fn edit_message(
        &self,
        mode: RoomMode,
        room_id: RoomId,
        message_id: MessageId,
        content: String,
    ) -> impl Future<Output = Result<(), BackendError>> + Send {
        let result = {
            let mut state = self.state();
            state.calls.push(BackendCall::EditMessage {
                mode,
                room_id,
                message_id,
                content: content.clone(),
            });
            match state.edit_failures.pop_front() {
                Some(error) => Err(error),
                None => {
                    let mut hit = false;
                    for record in &mut state.history {
                        if record.id == Some(message_id) {
                            record.message = content.clone();
                            hit = true;
                        }
                    }
                    if hit {
                        Ok(())
                    } else {
                        Err(BackendError::NotFound)
                    }
                }
            }
        };
        ready(result)
    }

    fn delete_message(
        &self,
        mode: RoomMode,
        room_id: RoomId,
        message_id: MessageId,
    ) -> impl Future<Output = Result<(), BackendError>> + Send {
        let result = {
            let mut state = self.state();
            state.calls.push(BackendCall::DeleteMessage {
                mode,
                room_id,
                message_id,
            });
            match state.delete_failures.pop_front() {
                Some(error) => Err(error),
                None => {
                    let before = state.history.len();
                    state.history.retain(|record| record.id != Some(message_id));
                    if state.history.len() == before {
                        Err(BackendError::NotFound)
                    } else {
                        Ok(())
                    }
                }
            }
        };
        ready(result)
    }

    fn auto_delete_check(
        &self,
        room_id: RoomId,
    ) -> impl Future<Output = Result<(), BackendError>> + Send {
        self.state().calls.push(BackendCall::AutoDeleteCheck { room_id });
        ready(Ok(()))
    }
}
