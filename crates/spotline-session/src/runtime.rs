//! Tokio runtime around the session machine.
//!
//! [`SessionRuntime::spawn`] starts one task per session. The task owns the
//! [`RoomSession`] machine and everything it is wired to: the command
//! channel from the embedder, the connection handle, a [`JoinSet`] of
//! in-flight backend calls and timers, and the notice channel back out.
//! Machine actions are executed in order; their results come back through
//! the internal event channel and re-enter the machine.
//!
//! The embedder talks to the task through a [`SessionHandle`]. Dropping the
//! handle closes the command channel, which the task treats as teardown:
//! best-effort leave notice, immediate close, then exit.

use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinSet};

use spotline_core::{DropCause, Environment, MessageId, RoomId, RoomMode, SessionConfig};
use spotline_proto::{ClientFrame, ServerFrame};

use crate::backend::Backend;
use crate::connector::{ConnectError, Connection, Connector};
use crate::error::SessionError;
use crate::events::{SessionAction, SessionEvent, SessionNotice};
use crate::session::{RoomSession, SessionPhase};

/// Commands an embedder can issue against a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Publish a chat message.
    Send {
        /// Message text.
        content: String,
    },
    /// Rewrite a persisted message.
    Edit {
        /// Persisted message id.
        id: MessageId,
        /// Replacement text.
        content: String,
    },
    /// Remove a persisted message.
    Delete {
        /// Persisted message id.
        id: MessageId,
    },
    /// Run the full leave protocol.
    Leave,
}

/// Error talking to a session task.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    /// The session task has exited; commands have nowhere to go.
    #[error("session closed")]
    SessionClosed,
}

/// Embedder-facing half of a running session.
///
/// Notices should be read promptly: the session applies backpressure once
/// the notice buffer fills. Dropping the handle tears the session down.
#[derive(Debug)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    notices: mpsc::Receiver<SessionNotice>,
    abort_handle: AbortHandle,
}

impl SessionHandle {
    /// Publishes a chat message.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::SessionClosed`] if the session task exited.
    pub async fn send(&self, content: impl Into<String>) -> Result<(), RuntimeError> {
        self.command(SessionCommand::Send {
            content: content.into(),
        })
        .await
    }

    /// Rewrites a persisted message.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::SessionClosed`] if the session task exited.
    pub async fn edit(&self, id: MessageId, content: impl Into<String>) -> Result<(), RuntimeError> {
        self.command(SessionCommand::Edit {
            id,
            content: content.into(),
        })
        .await
    }

    /// Removes a persisted message.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::SessionClosed`] if the session task exited.
    pub async fn delete(&self, id: MessageId) -> Result<(), RuntimeError> {
        self.command(SessionCommand::Delete { id }).await
    }

    /// Runs the full leave protocol: leave notice, grace, unsubscribe,
    /// close, disposal check for direct rooms.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::SessionClosed`] if the session task exited.
    pub async fn leave(&self) -> Result<(), RuntimeError> {
        self.command(SessionCommand::Leave).await
    }

    /// Receives the next notice. `None` once the session has closed and the
    /// buffer is drained.
    pub async fn next_notice(&mut self) -> Option<SessionNotice> {
        self.notices.recv().await
    }

    /// Hard-stops the session task. Unlike dropping the handle this skips
    /// the best-effort leave notice.
    pub fn abort(&self) {
        self.abort_handle.abort();
    }

    async fn command(&self, command: SessionCommand) -> Result<(), RuntimeError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| RuntimeError::SessionClosed)
    }
}

/// Task driving one [`RoomSession`] over tokio.
pub struct SessionRuntime<C, B, E> {
    machine: RoomSession,
    connector: C,
    backend: B,
    env: E,
    base_url: String,
    mode: RoomMode,
    room_id: RoomId,
    commands: mpsc::Receiver<SessionCommand>,
    commands_open: bool,
    events_tx: mpsc::Sender<SessionEvent>,
    events_rx: mpsc::Receiver<SessionEvent>,
    conn_tx: mpsc::Sender<Result<Connection, ConnectError>>,
    conn_rx: mpsc::Receiver<Result<Connection, ConnectError>>,
    notices: mpsc::Sender<SessionNotice>,
    connection: Option<Connection>,
    saw_frame: bool,
    tasks: JoinSet<()>,
}

impl<C, B, E> SessionRuntime<C, B, E>
where
    C: Connector,
    B: Backend,
    E: Environment,
{
    /// Spawns the session task and returns the embedder's handle.
    ///
    /// Must be called from within a tokio runtime. The session starts
    /// immediately: user fetch, room fetch, history seed, connect.
    pub fn spawn(
        connector: C,
        backend: B,
        env: E,
        config: SessionConfig,
        mode: RoomMode,
        room_id: RoomId,
    ) -> SessionHandle {
        let (commands_tx, commands_rx) = mpsc::channel(32);
        let (notices_tx, notices_rx) = mpsc::channel(32);
        let (events_tx, events_rx) = mpsc::channel(32);
        let (conn_tx, conn_rx) = mpsc::channel(1);

        let base_url = config.base_url.clone();
        let runtime = Self {
            machine: RoomSession::new(config, mode, room_id),
            connector,
            backend,
            env,
            base_url,
            mode,
            room_id,
            commands: commands_rx,
            commands_open: true,
            events_tx,
            events_rx,
            conn_tx,
            conn_rx,
            notices: notices_tx,
            connection: None,
            saw_frame: false,
            tasks: JoinSet::new(),
        };
        let task = tokio::spawn(runtime.run());

        SessionHandle {
            commands: commands_tx,
            notices: notices_rx,
            abort_handle: task.abort_handle(),
        }
    }

    async fn run(mut self) {
        self.step(SessionEvent::Started).await;

        while !matches!(self.machine.phase(), SessionPhase::Closed) {
            tokio::select! {
                command = self.commands.recv(), if self.commands_open => match command {
                    Some(command) => self.step(command_event(command)).await,
                    None => {
                        // Embedder dropped the handle.
                        self.commands_open = false;
                        self.step(SessionEvent::Teardown).await;
                    }
                },
                Some(event) = self.events_rx.recv() => {
                    self.step(event).await;
                }
                Some(result) = self.conn_rx.recv() => match result {
                    Ok(connection) => {
                        self.connection = Some(connection);
                        self.saw_frame = false;
                        self.step(SessionEvent::Connected).await;
                    }
                    Err(error) => {
                        tracing::warn!("connect attempt failed: {error}");
                        self.step(SessionEvent::ConnectionLost {
                            cause: DropCause::ConnectFailed,
                        })
                        .await;
                    }
                },
                frame = next_frame(&mut self.connection) => match frame {
                    Some(ServerFrame::Message { destination, body }) => {
                        self.saw_frame = true;
                        self.step(SessionEvent::FrameReceived { destination, body }).await;
                    }
                    None => {
                        // Link died underneath us. A link that never
                        // delivered a frame counts as closed early, which
                        // shortens the first retry delay.
                        let cause = if self.saw_frame {
                            DropCause::ClosedMidSession
                        } else {
                            DropCause::ClosedEarly
                        };
                        if let Some(conn) = self.connection.take() {
                            conn.close();
                        }
                        self.step(SessionEvent::ConnectionLost { cause }).await;
                    }
                },
            }
        }

        self.tasks.abort_all();
        if let Some(conn) = self.connection.take() {
            conn.close();
        }
    }

    async fn step(&mut self, event: SessionEvent) {
        let rejection = CommandRejection::of(&event);
        match self.machine.handle(event) {
            Ok(actions) => {
                for action in actions {
                    self.execute(action).await;
                }
            }
            Err(err) => match rejection {
                Some(rejection) => {
                    let _ = self.notices.send(rejection.notice(&err)).await;
                }
                None => tracing::warn!("session event rejected: {err}"),
            },
        }
    }

    async fn execute(&mut self, action: SessionAction) {
        match action {
            SessionAction::FetchUser => {
                let backend = self.backend.clone();
                let events = self.events_tx.clone();
                self.tasks.spawn(async move {
                    let event = match backend.current_user().await {
                        Ok(user) => SessionEvent::UserFetched(user),
                        Err(error) => SessionEvent::UserFetchFailed { error },
                    };
                    let _ = events.send(event).await;
                });
            }
            SessionAction::FetchRoom => {
                let backend = self.backend.clone();
                let events = self.events_tx.clone();
                let (mode, room_id) = (self.mode, self.room_id);
                self.tasks.spawn(async move {
                    let event = match backend.fetch_room(mode, room_id).await {
                        Ok(room) => SessionEvent::RoomFetched(room),
                        Err(error) => SessionEvent::RoomFetchFailed { error },
                    };
                    let _ = events.send(event).await;
                });
            }
            SessionAction::FetchHistory => {
                let backend = self.backend.clone();
                let events = self.events_tx.clone();
                let (mode, room_id) = (self.mode, self.room_id);
                self.tasks.spawn(async move {
                    let event = match backend.fetch_history(mode, room_id).await {
                        Ok(records) => SessionEvent::HistoryFetched { records },
                        Err(error) => SessionEvent::HistoryFetchFailed { error },
                    };
                    let _ = events.send(event).await;
                });
            }
            SessionAction::OpenConnection => {
                let connector = self.connector.clone();
                let base_url = self.base_url.clone();
                let results = self.conn_tx.clone();
                self.tasks.spawn(async move {
                    let _ = results.send(connector.connect(&base_url).await).await;
                });
            }
            SessionAction::Subscribe(destination) => {
                self.send_frame(ClientFrame::Subscribe {
                    destination: destination.subscribe_path(),
                })
                .await;
            }
            SessionAction::Unsubscribe(destination) => {
                self.send_frame(ClientFrame::Unsubscribe {
                    destination: destination.subscribe_path(),
                })
                .await;
            }
            SessionAction::Publish { destination, body } => {
                self.send_frame(ClientFrame::Send {
                    destination: destination.publish_path(),
                    body,
                })
                .await;
            }
            SessionAction::CloseConnection => {
                if let Some(conn) = self.connection.take() {
                    conn.close();
                }
            }
            SessionAction::StartTimer { timer, after } => {
                let env = self.env.clone();
                let events = self.events_tx.clone();
                self.tasks.spawn(async move {
                    env.sleep(after).await;
                    let _ = events.send(SessionEvent::TimerFired(timer)).await;
                });
            }
            SessionAction::EditViaBackend { id, content } => {
                let backend = self.backend.clone();
                let events = self.events_tx.clone();
                let (mode, room_id) = (self.mode, self.room_id);
                self.tasks.spawn(async move {
                    let event = match backend
                        .edit_message(mode, room_id, id, content.clone())
                        .await
                    {
                        Ok(()) => SessionEvent::EditConfirmed { id, content },
                        Err(error) => SessionEvent::EditFailed { id, error },
                    };
                    let _ = events.send(event).await;
                });
            }
            SessionAction::DeleteViaBackend { id } => {
                let backend = self.backend.clone();
                let events = self.events_tx.clone();
                let (mode, room_id) = (self.mode, self.room_id);
                self.tasks.spawn(async move {
                    let event = match backend.delete_message(mode, room_id, id).await {
                        Ok(()) => SessionEvent::DeleteConfirmed { id },
                        Err(error) => SessionEvent::DeleteFailed { id, error },
                    };
                    let _ = events.send(event).await;
                });
            }
            SessionAction::AutoDeleteCheck => {
                // Detached on purpose: the check must survive the session
                // task exiting right after it.
                let backend = self.backend.clone();
                let room_id = self.room_id;
                tokio::spawn(async move {
                    if let Err(error) = backend.auto_delete_check(room_id).await {
                        tracing::warn!("room disposal check failed: {error}");
                    }
                });
            }
            SessionAction::Notify(notice) => {
                let _ = self.notices.send(notice).await;
            }
            SessionAction::Log { message } => tracing::warn!("{message}"),
        }
    }

    async fn send_frame(&mut self, frame: ClientFrame) {
        if let Some(conn) = &self.connection
            && conn.to_server.send(frame).await.is_err()
        {
            tracing::warn!("outbound frame dropped: connection writer is gone");
        }
    }
}

async fn next_frame(connection: &mut Option<Connection>) -> Option<ServerFrame> {
    match connection.as_mut() {
        Some(conn) => conn.from_server.recv().await,
        None => std::future::pending().await,
    }
}

fn command_event(command: SessionCommand) -> SessionEvent {
    match command {
        SessionCommand::Send { content } => SessionEvent::SendMessage { content },
        SessionCommand::Edit { id, content } => SessionEvent::EditMessage { id, content },
        SessionCommand::Delete { id } => SessionEvent::DeleteMessage { id },
        SessionCommand::Leave => SessionEvent::Leave,
    }
}

/// Command shapes whose machine refusal is reported on the notice channel
/// rather than only logged.
#[derive(Debug, Clone, Copy)]
enum CommandRejection {
    Send,
    Edit(MessageId),
    Delete(MessageId),
}

impl CommandRejection {
    fn of(event: &SessionEvent) -> Option<Self> {
        match event {
            SessionEvent::SendMessage { .. } => Some(Self::Send),
            SessionEvent::EditMessage { id, .. } => Some(Self::Edit(*id)),
            SessionEvent::DeleteMessage { id } => Some(Self::Delete(*id)),
            _ => None,
        }
    }

    fn notice(self, err: &SessionError) -> SessionNotice {
        let reason = err.to_string();
        match self {
            Self::Send => SessionNotice::SendRejected { reason },
            Self::Edit(id) => SessionNotice::EditRejected { id, reason },
            Self::Delete(id) => SessionNotice::DeleteRejected { id, reason },
        }
    }
}
