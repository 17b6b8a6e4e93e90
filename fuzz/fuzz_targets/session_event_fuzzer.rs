//! Fuzz target for the session state machine
//!
//! Drives a `RoomSession` through arbitrary event sequences.
//!
//! # Strategy
//!
//! - Events in any order: boot results, frames, timers, commands, teardown
//! - Frames on valid channels, the wrong room, and junk destinations
//! - Bodies both well-formed and raw garbage
//! - Histories with every record kind
//!
//! # Invariants
//!
//! - The machine never panics; caller misuse comes back as `Err`
//! - No persisted message id renders twice on the timeline
//! - The reconnect budget is never exceeded

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use spotline_core::{ChatUser, DropCause, Room, RoomKind, RoomMode, SessionConfig};
use spotline_proto::{ChatBody, HistoryRecord, RecordKind};
use spotline_session::{BackendError, RoomSession, SessionEvent, Timer};

#[derive(Debug, Arbitrary)]
enum Op {
    Start,
    UserFetched,
    UserFetchFailed,
    RoomFetched { group: bool },
    RoomFetchFailed { not_found: bool },
    HistoryFetched { records: Vec<Rec> },
    HistoryFetchFailed,
    Connected,
    ConnectionLost { cause: Cause },
    Frame { dest: Dest, body: Body },
    TimerFired { timer: Which },
    Send { content: String },
    Edit { id: u8, content: String },
    Delete { id: u8 },
    EditConfirmed { id: u8, content: String },
    EditFailed { id: u8 },
    DeleteConfirmed { id: u8 },
    DeleteFailed { id: u8 },
    Leave,
    Teardown,
}

#[derive(Debug, Arbitrary)]
struct Rec {
    coach: bool,
    kind: u8,
    message: String,
}

#[derive(Debug, Arbitrary)]
enum Cause {
    ConnectFailed,
    ClosedEarly,
    ClosedMidSession,
}

#[derive(Debug, Arbitrary)]
enum Which {
    Retry,
    Reconcile,
    LeaveGrace,
}

#[derive(Debug, Arbitrary)]
enum Dest {
    Message,
    Enter,
    Leave,
    WrongRoom,
    Junk(String),
}

#[derive(Debug, Arbitrary)]
enum Body {
    Chat { id: Option<u8>, message: String },
    Enter,
    Raw(String),
}

fuzz_target!(|ops: Vec<Op>| {
    let mut session = RoomSession::new(SessionConfig::new("http://fuzz.test"), RoomMode::Direct, 7);

    for op in ops {
        // Caller misuse is an Err, never a panic.
        let _ = session.handle(event_for(op));
        check_invariants(&session);
    }
});

fn event_for(op: Op) -> SessionEvent {
    match op {
        Op::Start => SessionEvent::Started,
        Op::UserFetched => SessionEvent::UserFetched(ChatUser::named("coach")),
        Op::UserFetchFailed => SessionEvent::UserFetchFailed {
            error: BackendError::unavailable("fuzz"),
        },
        Op::RoomFetched { group } => SessionEvent::RoomFetched(room(group)),
        Op::RoomFetchFailed { not_found } => SessionEvent::RoomFetchFailed {
            error: if not_found {
                BackendError::NotFound
            } else {
                BackendError::Forbidden
            },
        },
        Op::HistoryFetched { records } => SessionEvent::HistoryFetched {
            records: to_history(records),
        },
        Op::HistoryFetchFailed => SessionEvent::HistoryFetchFailed {
            error: BackendError::unavailable("fuzz"),
        },
        Op::Connected => SessionEvent::Connected,
        Op::ConnectionLost { cause } => SessionEvent::ConnectionLost {
            cause: match cause {
                Cause::ConnectFailed => DropCause::ConnectFailed,
                Cause::ClosedEarly => DropCause::ClosedEarly,
                Cause::ClosedMidSession => DropCause::ClosedMidSession,
            },
        },
        Op::Frame { dest, body } => SessionEvent::FrameReceived {
            destination: destination(dest),
            body: body_text(body),
        },
        Op::TimerFired { timer } => SessionEvent::TimerFired(match timer {
            Which::Retry => Timer::Retry,
            Which::Reconcile => Timer::Reconcile,
            Which::LeaveGrace => Timer::LeaveGrace,
        }),
        Op::Send { content } => SessionEvent::SendMessage { content },
        Op::Edit { id, content } => SessionEvent::EditMessage {
            id: u64::from(id),
            content,
        },
        Op::Delete { id } => SessionEvent::DeleteMessage { id: u64::from(id) },
        Op::EditConfirmed { id, content } => SessionEvent::EditConfirmed {
            id: u64::from(id),
            content,
        },
        Op::EditFailed { id } => SessionEvent::EditFailed {
            id: u64::from(id),
            error: BackendError::unavailable("fuzz"),
        },
        Op::DeleteConfirmed { id } => SessionEvent::DeleteConfirmed { id: u64::from(id) },
        Op::DeleteFailed { id } => SessionEvent::DeleteFailed {
            id: u64::from(id),
            error: BackendError::NotFound,
        },
        Op::Leave => SessionEvent::Leave,
        Op::Teardown => SessionEvent::Teardown,
    }
}

fn room(group: bool) -> Room {
    if group {
        // Wrong flavor for a direct session; must fail, not panic.
        Room {
            id: 7,
            title: "group".to_string(),
            kind: RoomKind::Group {
                creator_name: "coach".to_string(),
            },
        }
    } else {
        Room {
            id: 7,
            title: "direct".to_string(),
            kind: RoomKind::Direct {
                sender_name: "coach".to_string(),
                receiver_name: "kim".to_string(),
            },
        }
    }
}

// Ids are assigned sequentially: history lists are server-produced and the
// server never emits duplicate ids within one pull.
fn to_history(records: Vec<Rec>) -> Vec<HistoryRecord> {
    records
        .into_iter()
        .take(16)
        .enumerate()
        .map(|(i, rec)| HistoryRecord {
            id: Some(i as u64 + 1),
            writer_name: if rec.coach { "coach" } else { "kim" }.to_string(),
            message: rec.message,
            user_type: match rec.kind % 3 {
                0 => RecordKind::Talk,
                1 => RecordKind::Enter,
                _ => RecordKind::Leave,
            },
            created_date: None,
        })
        .collect()
}

fn destination(dest: Dest) -> String {
    match dest {
        Dest::Message => "/topic/chat/message/7".to_string(),
        Dest::Enter => "/topic/chat/enter/7".to_string(),
        Dest::Leave => "/topic/chat/leave/7".to_string(),
        Dest::WrongRoom => "/topic/chat/message/8".to_string(),
        Dest::Junk(s) => s,
    }
}

fn body_text(body: Body) -> String {
    match body {
        Body::Chat { id, message } => {
            let chat = ChatBody {
                id: id.map(u64::from),
                writer_name: "kim".to_string(),
                message,
                created_date: None,
            };
            serde_json::to_string(&chat).unwrap_or_default()
        }
        Body::Enter => r#"{"writerName":"kim","receiverName":"coach"}"#.to_string(),
        Body::Raw(s) => s,
    }
}

fn check_invariants(session: &RoomSession) {
    let mut seen = Vec::new();
    for entry in session.timeline().entries() {
        if let Some(id) = entry.id() {
            assert!(!seen.contains(&id), "message id {id} rendered twice");
            seen.push(id);
        }
    }

    assert!(
        session.reconnect_attempts() <= 3,
        "reconnect budget exceeded: {}",
        session.reconnect_attempts()
    );
}
