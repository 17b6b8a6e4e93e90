//! Chat session orchestration for spotline.
//!
//! The centerpiece is [`RoomSession`], a pure state machine that drives one
//! chat room from fetch to teardown: user and room resolution, history
//! seeding, connect, subscribe, presence, live-feed reconciliation, bounded
//! reconnects, and the leave protocol. It performs no I/O; the surrounding
//! [`SessionRuntime`] executes its actions over tokio through two seams,
//! [`Connector`] for the persistent connection and [`Backend`] for REST.
//!
//! Production implementations of both seams live behind the `transport`
//! feature ([`WsConnector`], [`HttpBackend`]); tests script the seams
//! directly and never open a socket.

#![forbid(unsafe_code)]

pub mod backend;
pub mod connector;
pub mod error;
pub mod events;
pub mod router;
pub mod runtime;
pub mod session;
pub mod system_env;

#[cfg(feature = "transport")]
pub mod rest;
#[cfg(feature = "transport")]
pub mod transport;

pub use backend::{Backend, BackendError};
pub use connector::{ConnectError, Connection, Connector};
pub use error::SessionError;
pub use events::{SessionAction, SessionEvent, SessionFailure, SessionNotice, Timer};
pub use router::Router;
pub use runtime::{RuntimeError, SessionCommand, SessionHandle, SessionRuntime};
pub use session::{LinkState, RoomSession, SessionPhase};
pub use system_env::SystemEnv;

#[cfg(feature = "transport")]
pub use rest::HttpBackend;
#[cfg(feature = "transport")]
pub use transport::WsConnector;
