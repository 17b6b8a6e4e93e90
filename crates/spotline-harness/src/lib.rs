//! Deterministic test harness for spotline chat sessions.
//!
//! Scripted implementations of the session's two I/O seams plus a
//! virtual-clock environment:
//!
//! - [`SimConnector`] scripts connection attempts and exposes each accepted
//!   link as a [`LinkProbe`] playing the server side of the frame stream.
//! - [`SimBackend`] replays a configured user, room, and history, records
//!   every call, and mutates its history on edit/delete the way a real
//!   server would.
//! - [`SimEnv`] resolves sleeps instantly while recording the durations, so
//!   retry backoff, reconcile delays, and leave grace run without wall-clock
//!   waits.
//!
//! Integration tests in `tests/` drive the full
//! [`spotline_session::SessionRuntime`] against these fakes; no test opens a
//! socket or waits on real time.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod sim_backend;
pub mod sim_connector;
pub mod sim_env;

pub use sim_backend::{BackendCall, SimBackend};
pub use sim_connector::{ConnectScript, LinkProbe, SimConnector};
pub use sim_env::SimEnv;
