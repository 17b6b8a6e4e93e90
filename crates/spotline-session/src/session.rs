//! Room session state machine.
//!
//! [`RoomSession`] drives one chat room from first fetch to teardown without
//! performing any I/O itself. Callers feed it [`SessionEvent`]s and execute
//! the returned [`SessionAction`]s; results of those actions come back as
//! further events. The runtime in [`crate::runtime`] does exactly that over
//! tokio, and tests drive the machine directly.
//!
//! Phase graph:
//!
//! ```text
//!  Init ──▶ LoadingUser ──▶ LoadingHistory ──▶ Connecting ◀────────┐
//!              │                  │                │               │
//!              ▼                  ▼                ▼               │ drop,
//!            Failed             Failed           Live ────────────┘ budget
//!                                                  │                 left
//!                                                  ▼
//!                                               Leaving ──▶ Closed
//! ```
//!
//! Retry exhaustion fails the session from `Connecting`; `Leave` and
//! `Teardown` close it from anywhere. Events that arrive for a phase that
//! has already ended (stale timers, late fetch results, frames on a dead
//! link) are swallowed without actions.

use spotline_core::{
    ChatEntry, ChatUser, DedupCache, DropCause, MessageId, PresenceEvent, Reconnector,
    RetryDecision, Room, RoomId, RoomMode, SessionConfig, Timeline, TimelineEntry, project_history,
};
use spotline_proto::{Channel, ChatBody, Destination, EnterBody, HistoryRecord, SendBody};

use crate::backend::BackendError;
use crate::error::SessionError;
use crate::events::{SessionAction, SessionEvent, SessionFailure, SessionNotice, Timer};
use crate::router::Router;

/// Lifecycle phase of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    /// Created, not yet started.
    Init,
    /// Resolving the signed-in user, then the room metadata.
    LoadingUser,
    /// Pulling the room history for the initial seed.
    LoadingHistory,
    /// Opening the connection, either the first attempt or a retry.
    Connecting,
    /// Subscribed and rendering the live feed.
    Live,
    /// Leave notice published, grace running before teardown.
    Leaving,
    /// Torn down. The session produces nothing further.
    Closed,
    /// Failed terminally before going live, or out of reconnect budget.
    Failed(SessionFailure),
}

/// Connection-level state, tracked separately from the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No link.
    Disconnected,
    /// An attempt is in flight or queued behind a retry timer.
    Connecting,
    /// Link up, subscriptions not yet registered.
    Connected,
    /// Link up and the room's subscription set is registered.
    Subscribed,
    /// Leave published, link still up for the grace window.
    Leaving,
}

/// State machine for one chat room session.
///
/// Pure and synchronous. Every mutation happens in [`RoomSession::handle`];
/// everything asynchronous lives with whoever executes the actions.
#[derive(Debug)]
pub struct RoomSession {
    config: SessionConfig,
    mode: RoomMode,
    room_id: RoomId,
    phase: SessionPhase,
    link: LinkState,
    user: Option<ChatUser>,
    room: Option<Room>,
    timeline: Timeline,
    dedup: DedupCache,
    router: Router,
    reconnector: Reconnector,
}

impl RoomSession {
    /// Creates a session for one room. Nothing happens until
    /// [`SessionEvent::Started`] is handled.
    #[must_use]
    pub fn new(config: SessionConfig, mode: RoomMode, room_id: RoomId) -> Self {
        let dedup = DedupCache::new(config.dedup_capacity);
        let reconnector = Reconnector::new(config.retry.clone());
        Self {
            config,
            mode,
            room_id,
            phase: SessionPhase::Init,
            link: LinkState::Disconnected,
            user: None,
            room: None,
            timeline: Timeline::new(),
            dedup,
            router: Router::new(),
            reconnector,
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// Current connection-level state.
    #[must_use]
    pub fn link(&self) -> LinkState {
        self.link
    }

    /// The rendered timeline.
    #[must_use]
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Signed-in user, once resolved.
    #[must_use]
    pub fn user(&self) -> Option<&ChatUser> {
        self.user.as_ref()
    }

    /// Room metadata, once resolved.
    #[must_use]
    pub fn room(&self) -> Option<&Room> {
        self.room.as_ref()
    }

    /// Reconnect attempts consumed so far.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnector.attempts()
    }

    /// Advances the machine with one event.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] for caller misuse (starting twice, sending
    /// before the link is live, editing outside the live phase) and for
    /// wire-encode failures. External failures are events, not errors, and
    /// never surface here.
    pub fn handle(&mut self, event: SessionEvent) -> Result<Vec<SessionAction>, SessionError> {
        match event {
            SessionEvent::Started => self.handle_started(),
            SessionEvent::UserFetched(user) => Ok(self.handle_user_fetched(user)),
            SessionEvent::UserFetchFailed { error } => Ok(self.handle_user_fetch_failed(&error)),
            SessionEvent::RoomFetched(room) => Ok(self.handle_room_fetched(room)),
            SessionEvent::RoomFetchFailed { error } => Ok(self.handle_room_fetch_failed(error)),
            SessionEvent::HistoryFetched { records } => Ok(self.handle_history_fetched(&records)),
            SessionEvent::HistoryFetchFailed { error } => {
                Ok(self.handle_history_fetch_failed(&error))
            }
            SessionEvent::Connected => self.handle_connected(),
            SessionEvent::ConnectionLost { cause } => Ok(self.handle_connection_lost(cause)),
            SessionEvent::FrameReceived { destination, body } => {
                Ok(self.handle_frame(&destination, body))
            }
            SessionEvent::TimerFired(timer) => Ok(self.handle_timer(timer)),
            SessionEvent::SendMessage { content } => self.handle_send(content),
            SessionEvent::EditMessage { id, content } => self.handle_edit(id, content),
            SessionEvent::DeleteMessage { id } => self.handle_delete(id),
            SessionEvent::EditConfirmed { id, content } => Ok(self.handle_edit_confirmed(id, &content)),
            SessionEvent::EditFailed { id, error } => Ok(self.handle_edit_failed(id, &error)),
            SessionEvent::DeleteConfirmed { id } => Ok(self.handle_delete_confirmed(id)),
            SessionEvent::DeleteFailed { id, error } => Ok(self.handle_delete_failed(id, &error)),
            SessionEvent::Leave => Ok(self.handle_leave()),
            SessionEvent::Teardown => Ok(self.handle_teardown()),
        }
    }

    fn handle_started(&mut self) -> Result<Vec<SessionAction>, SessionError> {
        if self.phase != SessionPhase::Init {
            return Err(SessionError::AlreadyStarted);
        }
        self.phase = SessionPhase::LoadingUser;
        Ok(vec![SessionAction::FetchUser])
    }

    fn handle_user_fetched(&mut self, user: ChatUser) -> Vec<SessionAction> {
        if self.phase != SessionPhase::LoadingUser || self.user.is_some() {
            return Vec::new();
        }
        self.user = Some(user);
        vec![SessionAction::FetchRoom]
    }

    fn handle_user_fetch_failed(&mut self, error: &BackendError) -> Vec<SessionAction> {
        if self.phase != SessionPhase::LoadingUser {
            return Vec::new();
        }
        self.fail(SessionFailure::UserUnavailable {
            reason: error.to_string(),
        })
    }

    fn handle_room_fetched(&mut self, room: Room) -> Vec<SessionAction> {
        if self.phase != SessionPhase::LoadingUser || self.user.is_none() || self.room.is_some() {
            return Vec::new();
        }
        if room.mode() != self.mode {
            return self.fail(SessionFailure::RoomUnavailable {
                reason: "room flavor does not match this session".to_string(),
            });
        }
        if !room.authorizes(self.own_name()) {
            return self.fail(SessionFailure::Forbidden);
        }
        self.room = Some(room);
        self.phase = SessionPhase::LoadingHistory;
        vec![SessionAction::FetchHistory]
    }

    fn handle_room_fetch_failed(&mut self, error: BackendError) -> Vec<SessionAction> {
        if self.phase != SessionPhase::LoadingUser {
            return Vec::new();
        }
        let failure = match error {
            BackendError::NotFound => SessionFailure::RoomNotFound,
            BackendError::Forbidden => SessionFailure::Forbidden,
            BackendError::Unavailable { reason } => SessionFailure::RoomUnavailable { reason },
        };
        self.fail(failure)
    }

    fn handle_history_fetched(&mut self, records: &[HistoryRecord]) -> Vec<SessionAction> {
        match self.phase {
            SessionPhase::LoadingHistory => {
                let notice = self.apply_history(records);
                self.phase = SessionPhase::Connecting;
                self.link = LinkState::Connecting;
                vec![notice, SessionAction::OpenConnection]
            }
            // Reconciliation pass: same projection, full replacement.
            SessionPhase::Live => vec![self.apply_history(records)],
            _ => Vec::new(),
        }
    }

    fn handle_history_fetch_failed(&mut self, error: &BackendError) -> Vec<SessionAction> {
        match self.phase {
            SessionPhase::LoadingHistory => self.fail(SessionFailure::HistoryUnavailable {
                reason: error.to_string(),
            }),
            // A failed reconciliation keeps the current timeline; the next
            // send schedules another pass anyway.
            SessionPhase::Live => vec![SessionAction::Log {
                message: format!("history reconciliation failed: {error}"),
            }],
            _ => Vec::new(),
        }
    }

    fn handle_connected(&mut self) -> Result<Vec<SessionAction>, SessionError> {
        if self.phase != SessionPhase::Connecting {
            // The attempt resolved after the session moved on.
            return Ok(vec![SessionAction::CloseConnection]);
        }
        self.link = LinkState::Connected;

        let set = self.router.subscribe_all(self.mode, self.room_id)?;
        let mut actions: Vec<SessionAction> =
            set.iter().map(|dest| SessionAction::Subscribe(*dest)).collect();

        // Subscriptions and the enter notice share one FIFO to the server,
        // so delivery of the enter echo back to us is guaranteed.
        let enter = EnterBody {
            writer_name: self.own_name().to_string(),
            receiver_name: self.counterpart(),
        };
        actions.push(SessionAction::Publish {
            destination: self.destination(Channel::Enter),
            body: enter.render()?,
        });
        actions.push(SessionAction::Notify(SessionNotice::Live));

        self.link = LinkState::Subscribed;
        self.phase = SessionPhase::Live;
        Ok(actions)
    }

    fn handle_connection_lost(&mut self, cause: DropCause) -> Vec<SessionAction> {
        match self.phase {
            SessionPhase::Connecting | SessionPhase::Live => {
                self.link = LinkState::Disconnected;
                // The subscription set died with the link; no frames to send.
                self.router.reset();
                match self.reconnector.on_drop(cause) {
                    RetryDecision::RetryAfter(delay) => {
                        self.phase = SessionPhase::Connecting;
                        vec![
                            SessionAction::Log {
                                message: format!(
                                    "link lost ({cause:?}); retry {} in {delay:?}",
                                    self.reconnector.attempts()
                                ),
                            },
                            SessionAction::StartTimer {
                                timer: Timer::Retry,
                                after: delay,
                            },
                        ]
                    }
                    RetryDecision::GiveUp => self.fail(SessionFailure::ConnectionExhausted),
                }
            }
            SessionPhase::Leaving => {
                // Grace window outlives the link; the timer still finishes
                // the teardown.
                self.link = LinkState::Disconnected;
                self.router.reset();
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn handle_timer(&mut self, timer: Timer) -> Vec<SessionAction> {
        match (timer, &self.phase) {
            (Timer::Retry, SessionPhase::Connecting) => {
                self.link = LinkState::Connecting;
                vec![SessionAction::OpenConnection]
            }
            (Timer::Reconcile, SessionPhase::Live) => vec![SessionAction::FetchHistory],
            (Timer::LeaveGrace, SessionPhase::Leaving) => self.finish_leave(),
            _ => Vec::new(),
        }
    }

    fn handle_frame(&mut self, destination: &str, body: String) -> Vec<SessionAction> {
        if !matches!(self.phase, SessionPhase::Live | SessionPhase::Leaving) {
            return Vec::new();
        }
        let Some(channel) = self.router.route(destination) else {
            return vec![SessionAction::Log {
                message: format!("dropping frame for unroutable destination {destination}"),
            }];
        };
        match channel {
            Channel::Message => match ChatBody::parse(&body) {
                Ok(chat) => {
                    if !self.dedup.should_apply(chat.id) {
                        return Vec::new();
                    }
                    self.timeline.push(TimelineEntry::Chat(ChatEntry {
                        id: chat.id,
                        writer_name: chat.writer_name,
                        message: chat.message,
                        created_date: chat.created_date,
                        edited: false,
                    }));
                    vec![self.timeline_notice()]
                }
                Err(err) => vec![SessionAction::Log {
                    message: format!("dropping malformed chat body: {err}"),
                }],
            },
            Channel::Enter => match EnterBody::parse(&body) {
                Ok(enter) => {
                    self.timeline
                        .push(TimelineEntry::System(PresenceEvent::enter(&enter.writer_name).into_entry()));
                    vec![self.timeline_notice()]
                }
                Err(err) => vec![SessionAction::Log {
                    message: format!("dropping malformed enter body: {err}"),
                }],
            },
            // Leave bodies are opaque display text, not JSON.
            Channel::Leave => {
                self.timeline
                    .push(TimelineEntry::System(PresenceEvent::leave(&body).into_entry()));
                vec![self.timeline_notice()]
            }
        }
    }

    fn handle_send(&mut self, content: String) -> Result<Vec<SessionAction>, SessionError> {
        if self.phase != SessionPhase::Live {
            return Err(SessionError::NotConnected { operation: "send" });
        }
        let body = SendBody {
            writer_name: self.own_name().to_string(),
            receiver_name: self.counterpart(),
            message: content,
        };
        Ok(vec![
            SessionAction::Publish {
                destination: self.destination(Channel::Message),
                body: body.render()?,
            },
            // The echo renders immediately; the authoritative entry comes
            // from the reconciliation fetch shortly after.
            SessionAction::StartTimer {
                timer: Timer::Reconcile,
                after: self.config.reconcile_delay,
            },
        ])
    }

    fn handle_edit(
        &mut self,
        id: MessageId,
        content: String,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if self.phase != SessionPhase::Live {
            return Err(SessionError::InvalidPhase {
                phase: self.phase.clone(),
                operation: "edit",
            });
        }
        Ok(vec![SessionAction::EditViaBackend { id, content }])
    }

    fn handle_delete(&mut self, id: MessageId) -> Result<Vec<SessionAction>, SessionError> {
        if self.phase != SessionPhase::Live {
            return Err(SessionError::InvalidPhase {
                phase: self.phase.clone(),
                operation: "delete",
            });
        }
        Ok(vec![SessionAction::DeleteViaBackend { id }])
    }

    fn handle_edit_confirmed(&mut self, id: MessageId, content: &str) -> Vec<SessionAction> {
        if !matches!(self.phase, SessionPhase::Live | SessionPhase::Leaving) {
            return Vec::new();
        }
        if self.timeline.edit(id, content) {
            vec![self.timeline_notice()]
        } else {
            vec![SessionAction::Log {
                message: format!("edit confirmed for message {id} not on the timeline"),
            }]
        }
    }

    fn handle_edit_failed(&mut self, id: MessageId, error: &BackendError) -> Vec<SessionAction> {
        if !matches!(self.phase, SessionPhase::Live | SessionPhase::Leaving) {
            return Vec::new();
        }
        vec![SessionAction::Notify(SessionNotice::EditRejected {
            id,
            reason: error.to_string(),
        })]
    }

    fn handle_delete_confirmed(&mut self, id: MessageId) -> Vec<SessionAction> {
        if !matches!(self.phase, SessionPhase::Live | SessionPhase::Leaving) {
            return Vec::new();
        }
        if self.timeline.remove(id) {
            vec![self.timeline_notice()]
        } else {
            vec![SessionAction::Log {
                message: format!("delete confirmed for message {id} not on the timeline"),
            }]
        }
    }

    fn handle_delete_failed(&mut self, id: MessageId, error: &BackendError) -> Vec<SessionAction> {
        if !matches!(self.phase, SessionPhase::Live | SessionPhase::Leaving) {
            return Vec::new();
        }
        vec![SessionAction::Notify(SessionNotice::DeleteRejected {
            id,
            reason: error.to_string(),
        })]
    }

    fn handle_leave(&mut self) -> Vec<SessionAction> {
        match &self.phase {
            SessionPhase::Live => {
                self.phase = SessionPhase::Leaving;
                self.link = LinkState::Leaving;
                vec![
                    // The leave body is the bare display name.
                    SessionAction::Publish {
                        destination: self.destination(Channel::Leave),
                        body: self.own_name().to_string(),
                    },
                    SessionAction::StartTimer {
                        timer: Timer::LeaveGrace,
                        after: self.config.leave_grace(self.mode),
                    },
                ]
            }
            SessionPhase::Connecting => {
                self.phase = SessionPhase::Closed;
                self.link = LinkState::Disconnected;
                self.router.reset();
                vec![
                    SessionAction::CloseConnection,
                    SessionAction::Notify(SessionNotice::Closed),
                ]
            }
            SessionPhase::Init
            | SessionPhase::LoadingUser
            | SessionPhase::LoadingHistory
            | SessionPhase::Failed(_) => {
                self.phase = SessionPhase::Closed;
                vec![SessionAction::Notify(SessionNotice::Closed)]
            }
            // Leaving once is enough; closing twice still reports success.
            SessionPhase::Leaving => Vec::new(),
            SessionPhase::Closed => vec![SessionAction::Notify(SessionNotice::Closed)],
        }
    }

    fn handle_teardown(&mut self) -> Vec<SessionAction> {
        match &self.phase {
            SessionPhase::Live => {
                let mut actions = vec![SessionAction::Publish {
                    destination: self.destination(Channel::Leave),
                    body: self.own_name().to_string(),
                }];
                actions.extend(self.router.unsubscribe_all().into_iter().map(SessionAction::Unsubscribe));
                actions.push(SessionAction::CloseConnection);
                actions.push(SessionAction::Notify(SessionNotice::Closed));
                self.phase = SessionPhase::Closed;
                self.link = LinkState::Disconnected;
                actions
            }
            SessionPhase::Leaving => {
                // Leave notice already went out; skip the rest of the grace.
                let mut actions: Vec<SessionAction> = self
                    .router
                    .unsubscribe_all()
                    .into_iter()
                    .map(SessionAction::Unsubscribe)
                    .collect();
                actions.push(SessionAction::CloseConnection);
                actions.push(SessionAction::Notify(SessionNotice::Closed));
                self.phase = SessionPhase::Closed;
                self.link = LinkState::Disconnected;
                actions
            }
            SessionPhase::Connecting => {
                self.phase = SessionPhase::Closed;
                self.link = LinkState::Disconnected;
                self.router.reset();
                vec![
                    SessionAction::CloseConnection,
                    SessionAction::Notify(SessionNotice::Closed),
                ]
            }
            SessionPhase::Init
            | SessionPhase::LoadingUser
            | SessionPhase::LoadingHistory
            | SessionPhase::Failed(_) => {
                self.phase = SessionPhase::Closed;
                vec![SessionAction::Notify(SessionNotice::Closed)]
            }
            SessionPhase::Closed => Vec::new(),
        }
    }

    /// Projects `records`, seeds the dedup cache with their ids and replaces
    /// the timeline wholesale. Never merges.
    fn apply_history(&mut self, records: &[HistoryRecord]) -> SessionAction {
        for record in records {
            if let Some(id) = record.id {
                self.dedup.record(id);
            }
        }
        let own = self.own_name().to_string();
        self.timeline.replace_all(project_history(records, &own));
        self.timeline_notice()
    }

    fn finish_leave(&mut self) -> Vec<SessionAction> {
        let mut actions: Vec<SessionAction> = self
            .router
            .unsubscribe_all()
            .into_iter()
            .map(SessionAction::Unsubscribe)
            .collect();
        actions.push(SessionAction::CloseConnection);
        if self.mode == RoomMode::Direct {
            actions.push(SessionAction::AutoDeleteCheck);
        }
        actions.push(SessionAction::Notify(SessionNotice::Closed));
        self.phase = SessionPhase::Closed;
        self.link = LinkState::Disconnected;
        actions
    }

    fn fail(&mut self, failure: SessionFailure) -> Vec<SessionAction> {
        self.phase = SessionPhase::Failed(failure.clone());
        self.link = LinkState::Disconnected;
        vec![SessionAction::Notify(SessionNotice::Failed(failure))]
    }

    fn timeline_notice(&self) -> SessionAction {
        SessionAction::Notify(SessionNotice::TimelineUpdated(
            self.timeline.entries().to_vec(),
        ))
    }

    fn destination(&self, channel: Channel) -> Destination {
        Destination::new(self.mode, channel, self.room_id)
    }

    fn own_name(&self) -> &str {
        self.user.as_ref().map_or("", |user| user.name.as_str())
    }

    fn counterpart(&self) -> Option<String> {
        self.room
            .as_ref()
            .and_then(|room| room.counterpart_of(self.own_name()))
    }
}
