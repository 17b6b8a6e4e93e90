//! Persistent-connection seam.
//!
//! A [`Connector`] opens one full-duplex frame stream per attempt and hands
//! the session runtime a [`Connection`]: channel halves for traffic plus an
//! abort handle for whatever pump task shovels frames underneath. Which
//! transport actually carries the frames (WebSocket, streaming fallback, a
//! scripted pair in tests) is invisible above this seam.

use std::future::Future;

use spotline_proto::{ClientFrame, ServerFrame};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

/// Transport-level failure while establishing or running a connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// The connection could not be established.
    #[error("connect failed: {reason}")]
    Connect {
        /// Human-readable failure detail.
        reason: String,
    },

    /// The established stream failed mid-flight.
    #[error("stream error: {reason}")]
    Stream {
        /// Human-readable failure detail.
        reason: String,
    },

    /// The peer sent something the wire contract does not allow.
    #[error("protocol error: {reason}")]
    Protocol {
        /// Human-readable failure detail.
        reason: String,
    },
}

/// A live connection, exclusively owned by one session.
///
/// Dropping the handle without calling [`Connection::close`] leaks the pump
/// task until its channels close; the runtime always closes explicitly.
#[derive(Debug)]
pub struct Connection {
    /// Frames bound for the server.
    pub to_server: mpsc::Sender<ClientFrame>,
    /// Frames arriving from the server. `None` from `recv` means the link
    /// dropped.
    pub from_server: mpsc::Receiver<ServerFrame>,
    abort_handle: Option<AbortHandle>,
}

impl Connection {
    /// Handle from channel halves plus the pump task to stop on close.
    pub fn new(
        to_server: mpsc::Sender<ClientFrame>,
        from_server: mpsc::Receiver<ServerFrame>,
        abort_handle: Option<AbortHandle>,
    ) -> Self {
        Self {
            to_server,
            from_server,
            abort_handle,
        }
    }

    /// Stops the pump task. Closing an already-closed connection is a no-op.
    pub fn close(&self) {
        if let Some(handle) = &self.abort_handle {
            handle.abort();
        }
    }
}

/// Opens persistent connections to the chat service.
///
/// Implementations must be cheap to clone: the runtime clones the connector
/// into each spawned attempt.
pub trait Connector: Clone + Send + Sync + 'static {
    /// Establishes one connection to the service rooted at `base_url`.
    ///
    /// Each call is a fresh attempt; retry policy lives with the session,
    /// not the transport.
    fn connect(
        &self,
        base_url: &str,
    ) -> impl Future<Output = Result<Connection, ConnectError>> + Send;
}
