//! End-to-end runtime tests over scripted seams.
//!
//! Each test spawns a real [`SessionRuntime`] wired to the harness fakes:
//! [`SimConnector`] plays the transport, [`SimBackend`] the REST service,
//! [`SimEnv`] the clock. The paused tokio clock plus instant virtual sleeps
//! make every scenario run without wall-clock waits.

use std::time::Duration;

use spotline_core::{ChatUser, Room, RoomKind, RoomMode, SessionConfig, TimelineEntry};
use spotline_harness::{BackendCall, LinkProbe, SimBackend, SimConnector, SimEnv};
use spotline_proto::{ClientFrame, HistoryRecord, ServerFrame};
use spotline_session::{
    BackendError, SessionFailure, SessionHandle, SessionNotice, SessionRuntime,
};

fn config() -> SessionConfig {
    SessionConfig::new("http://chat.test")
}

fn direct_room() -> Room {
    Room {
        id: 7,
        title: "PT consultation".to_string(),
        kind: RoomKind::Direct {
            sender_name: "coach".to_string(),
            receiver_name: "kim".to_string(),
        },
    }
}

fn group_room() -> Room {
    Room {
        id: 9,
        title: "Morning crossfit".to_string(),
        kind: RoomKind::Group {
            creator_name: "coach".to_string(),
        },
    }
}

/// Backend scripted with the signed-in coach and the given room.
fn backend_for(room: Room) -> SimBackend {
    let backend = SimBackend::new();
    backend.serve_user(ChatUser::named("coach"));
    backend.serve_room(room);
    backend
}

async fn next_notice(handle: &mut SessionHandle) -> SessionNotice {
    handle.next_notice().await.expect("session closed early")
}

async fn timeline_update(handle: &mut SessionHandle) -> Vec<TimelineEntry> {
    match next_notice(handle).await {
        SessionNotice::TimelineUpdated(entries) => entries,
        other => panic!("expected a timeline update, got {other:?}"),
    }
}

/// The four frames a session sends when its link comes up: three
/// subscriptions, then the enter publish.
async fn opening_frames(link: &mut LinkProbe) -> Vec<ClientFrame> {
    let mut frames = Vec::new();
    for _ in 0..4 {
        frames.push(link.next_sent().await.expect("link severed during open"));
    }
    frames
}

/// Waits for the detached disposal-check task to reach the backend.
async fn wait_for_disposal(backend: &SimBackend, room_id: u64) {
    for _ in 0..50 {
        let hit = backend
            .calls()
            .iter()
            .any(|call| matches!(call, BackendCall::AutoDeleteCheck { room_id: id } if *id == room_id));
        if hit {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("disposal check never reached the backend");
}

fn ids(entries: &[TimelineEntry]) -> Vec<Option<u64>> {
    entries.iter().map(TimelineEntry::id).collect()
}

#[tokio::test(start_paused = true)]
async fn full_direct_session_round_trip() {
    let connector = SimConnector::new();
    let backend = backend_for(direct_room());
    let env = SimEnv::new();
    backend.serve_history(vec![HistoryRecord::talk(1, "kim", "hi coach")]);

    let mut handle = SessionRuntime::spawn(
        connector.clone(),
        backend.clone(),
        env.clone(),
        config(),
        RoomMode::Direct,
        7,
    );

    // Seed first, then the live notice.
    assert_eq!(ids(&timeline_update(&mut handle).await), vec![Some(1)]);
    assert_eq!(next_notice(&mut handle).await, SessionNotice::Live);

    // The link registered all three channels before announcing entry.
    let mut link = connector.wait_link().await;
    assert_eq!(
        opening_frames(&mut link).await,
        vec![
            ClientFrame::Subscribe { destination: "/topic/chat/message/7".to_string() },
            ClientFrame::Subscribe { destination: "/topic/chat/enter/7".to_string() },
            ClientFrame::Subscribe { destination: "/topic/chat/leave/7".to_string() },
            ClientFrame::Send {
                destination: "/app/chat/enter/7".to_string(),
                body: r#"{"writerName":"coach","receiverName":"kim"}"#.to_string(),
            },
        ]
    );

    // Counterpart talks; the frame renders as soon as it arrives.
    assert!(
        link.push(ServerFrame::Message {
            destination: "/topic/chat/message/7".to_string(),
            body: r#"{"id":40,"writerName":"kim","message":"ready when you are"}"#.to_string(),
        })
        .await
    );
    assert_eq!(ids(&timeline_update(&mut handle).await), vec![Some(1), Some(40)]);

    // The server will hold both messages by the time reconciliation runs.
    backend.push_history(HistoryRecord::talk(40, "kim", "ready when you are"));
    backend.push_history(HistoryRecord::talk(41, "coach", "see you at 6"));

    handle.send("see you at 6").await.unwrap();
    assert_eq!(
        link.next_sent().await,
        Some(ClientFrame::Send {
            destination: "/app/chat/message/7".to_string(),
            body: r#"{"writerName":"coach","receiverName":"kim","message":"see you at 6"}"#
                .to_string(),
        })
    );

    // Reconciliation replaces the timeline with the persisted copy.
    assert_eq!(
        ids(&timeline_update(&mut handle).await),
        vec![Some(1), Some(40), Some(41)]
    );

    // Leave: notice out, grace, unsubscribe, close, disposal check.
    handle.leave().await.unwrap();
    assert_eq!(
        link.next_sent().await,
        Some(ClientFrame::Send {
            destination: "/app/chat/leave/7".to_string(),
            body: "coach".to_string(),
        })
    );
    assert_eq!(
        link.next_sent().await,
        Some(ClientFrame::Unsubscribe { destination: "/topic/chat/message/7".to_string() })
    );
    assert_eq!(
        link.next_sent().await,
        Some(ClientFrame::Unsubscribe { destination: "/topic/chat/enter/7".to_string() })
    );
    assert_eq!(
        link.next_sent().await,
        Some(ClientFrame::Unsubscribe { destination: "/topic/chat/leave/7".to_string() })
    );
    assert_eq!(link.next_sent().await, None);

    assert_eq!(next_notice(&mut handle).await, SessionNotice::Closed);
    assert_eq!(handle.next_notice().await, None);

    // One reconcile delay, one direct-room grace; nothing else slept.
    assert_eq!(
        env.sleeps(),
        vec![Duration::from_millis(100), Duration::from_secs(1)]
    );
    wait_for_disposal(&backend, 7).await;
}

#[tokio::test(start_paused = true)]
async fn refused_connects_exhaust_the_retry_budget() {
    let connector = SimConnector::new();
    let backend = backend_for(direct_room());
    let env = SimEnv::new();
    backend.serve_history(vec![]);
    connector.refuse_next(4);

    let mut handle = SessionRuntime::spawn(
        connector.clone(),
        backend,
        env.clone(),
        config(),
        RoomMode::Direct,
        7,
    );

    assert!(timeline_update(&mut handle).await.is_empty());
    assert_eq!(
        next_notice(&mut handle).await,
        SessionNotice::Failed(SessionFailure::ConnectionExhausted)
    );

    // Initial attempt plus the whole retry budget, each retry at the fixed
    // delay (refusals never count as early closes).
    assert_eq!(connector.attempts(), 4);
    assert_eq!(
        env.sleeps(),
        vec![
            Duration::from_secs(2),
            Duration::from_secs(2),
            Duration::from_secs(2),
        ]
    );

    // The session is done connecting but still answers: sends bounce.
    handle.send("anyone there?").await.unwrap();
    assert!(matches!(
        next_notice(&mut handle).await,
        SessionNotice::SendRejected { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn dropped_link_reconnects_and_reannounces_presence() {
    let connector = SimConnector::new();
    let backend = backend_for(direct_room());
    let env = SimEnv::new();
    backend.serve_history(vec![HistoryRecord::talk(1, "kim", "hi")]);

    let mut handle = SessionRuntime::spawn(
        connector.clone(),
        backend,
        env.clone(),
        config(),
        RoomMode::Direct,
        7,
    );

    assert_eq!(ids(&timeline_update(&mut handle).await), vec![Some(1)]);
    assert_eq!(next_notice(&mut handle).await, SessionNotice::Live);

    let mut link = connector.wait_link().await;
    let first_open = opening_frames(&mut link).await;

    // Sever the link before it ever delivers a frame: that counts as an
    // early close, so the first retry waits the short delay.
    drop(link);

    assert_eq!(next_notice(&mut handle).await, SessionNotice::Live);
    assert_eq!(connector.attempts(), 2);
    assert_eq!(env.sleeps(), vec![Duration::from_secs(1)]);

    // The replacement link gets the same subscription set and a fresh entry
    // announcement; the timeline survives untouched (no reseed notice).
    let mut replacement = connector.wait_link().await;
    assert_eq!(opening_frames(&mut replacement).await, first_open);
}

#[tokio::test(start_paused = true)]
async fn handle_drop_tears_down_without_grace_or_disposal() {
    let connector = SimConnector::new();
    let backend = backend_for(direct_room());
    let env = SimEnv::new();
    backend.serve_history(vec![]);

    let mut handle = SessionRuntime::spawn(
        connector.clone(),
        backend.clone(),
        env.clone(),
        config(),
        RoomMode::Direct,
        7,
    );
    timeline_update(&mut handle).await;
    assert_eq!(next_notice(&mut handle).await, SessionNotice::Live);

    let mut link = connector.wait_link().await;
    opening_frames(&mut link).await;

    // Walking away: best-effort leave notice, immediate close, no grace.
    drop(handle);

    assert_eq!(
        link.next_sent().await,
        Some(ClientFrame::Send {
            destination: "/app/chat/leave/7".to_string(),
            body: "coach".to_string(),
        })
    );
    assert_eq!(
        link.next_sent().await,
        Some(ClientFrame::Unsubscribe { destination: "/topic/chat/message/7".to_string() })
    );
    assert_eq!(
        link.next_sent().await,
        Some(ClientFrame::Unsubscribe { destination: "/topic/chat/enter/7".to_string() })
    );
    assert_eq!(
        link.next_sent().await,
        Some(ClientFrame::Unsubscribe { destination: "/topic/chat/leave/7".to_string() })
    );
    assert_eq!(link.next_sent().await, None);

    // Give any stray disposal task time to surface, then check none ran.
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(env.sleeps().is_empty());
    assert!(
        !backend
            .calls()
            .iter()
            .any(|call| matches!(call, BackendCall::AutoDeleteCheck { .. }))
    );
}

#[tokio::test(start_paused = true)]
async fn group_leave_skips_the_disposal_check() {
    let connector = SimConnector::new();
    let backend = backend_for(group_room());
    let env = SimEnv::new();
    backend.serve_history(vec![]);

    let mut handle = SessionRuntime::spawn(
        connector.clone(),
        backend.clone(),
        env.clone(),
        config(),
        RoomMode::Group,
        9,
    );
    timeline_update(&mut handle).await;
    assert_eq!(next_notice(&mut handle).await, SessionNotice::Live);

    // Group destinations, and an enter body with no counterpart field.
    let mut link = connector.wait_link().await;
    assert_eq!(
        opening_frames(&mut link).await,
        vec![
            ClientFrame::Subscribe { destination: "/topic/group-chat/message/9".to_string() },
            ClientFrame::Subscribe { destination: "/topic/group-chat/enter/9".to_string() },
            ClientFrame::Subscribe { destination: "/topic/group-chat/leave/9".to_string() },
            ClientFrame::Send {
                destination: "/app/group-chat/enter/9".to_string(),
                body: r#"{"writerName":"coach"}"#.to_string(),
            },
        ]
    );

    handle.leave().await.unwrap();
    assert_eq!(
        link.next_sent().await,
        Some(ClientFrame::Send {
            destination: "/app/group-chat/leave/9".to_string(),
            body: "coach".to_string(),
        })
    );
    assert_eq!(next_notice(&mut handle).await, SessionNotice::Closed);

    // Group grace is the shorter one, and no disposal check ever runs.
    assert_eq!(env.sleeps(), vec![Duration::from_millis(500)]);
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(
        !backend
            .calls()
            .iter()
            .any(|call| matches!(call, BackendCall::AutoDeleteCheck { .. }))
    );
}

#[tokio::test(start_paused = true)]
async fn forbidden_room_fails_before_any_connection() {
    let connector = SimConnector::new();
    let backend = SimBackend::new();
    backend.serve_user(ChatUser::named("stranger"));
    backend.serve_room(direct_room());

    let mut handle = SessionRuntime::spawn(
        connector.clone(),
        backend.clone(),
        SimEnv::new(),
        config(),
        RoomMode::Direct,
        7,
    );

    assert_eq!(
        next_notice(&mut handle).await,
        SessionNotice::Failed(SessionFailure::Forbidden)
    );

    // The session failed at the room check: no history pull, no connect.
    assert_eq!(connector.attempts(), 0);
    assert_eq!(
        backend.calls(),
        vec![
            BackendCall::CurrentUser,
            BackendCall::FetchRoom { mode: RoomMode::Direct, room_id: 7 },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn seed_failure_surfaces_history_unavailable() {
    let connector = SimConnector::new();
    let backend = backend_for(direct_room());
    backend.fail_next_history(BackendError::unavailable("db down"));

    let mut handle = SessionRuntime::spawn(
        connector.clone(),
        backend,
        SimEnv::new(),
        config(),
        RoomMode::Direct,
        7,
    );

    assert_eq!(
        next_notice(&mut handle).await,
        SessionNotice::Failed(SessionFailure::HistoryUnavailable {
            reason: "backend unavailable: db down".to_string(),
        })
    );
    assert_eq!(connector.attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn edit_and_delete_round_trip_through_the_backend() {
    let connector = SimConnector::new();
    let backend = backend_for(direct_room());
    let env = SimEnv::new();
    backend.serve_history(vec![
        HistoryRecord::talk(1, "coach", "hi"),
        HistoryRecord::talk(2, "coach", "tpyo"),
    ]);

    let mut handle = SessionRuntime::spawn(
        connector.clone(),
        backend.clone(),
        env,
        config(),
        RoomMode::Direct,
        7,
    );
    timeline_update(&mut handle).await;
    assert_eq!(next_notice(&mut handle).await, SessionNotice::Live);

    // Edit: backend confirms, the entry updates in place.
    handle.edit(2, "typo").await.unwrap();
    let entries = timeline_update(&mut handle).await;
    let TimelineEntry::Chat(chat) = &entries[1] else {
        panic!("expected a chat entry, got {:?}", entries[1]);
    };
    assert_eq!(chat.message, "typo");
    assert!(chat.edited);

    // Delete: backend confirms, the entry disappears.
    handle.delete(1).await.unwrap();
    assert_eq!(ids(&timeline_update(&mut handle).await), vec![Some(2)]);

    // A failing edit leaves the timeline alone and surfaces a rejection.
    backend.fail_next_edit(BackendError::unavailable("500"));
    handle.edit(2, "never lands").await.unwrap();
    assert!(matches!(
        next_notice(&mut handle).await,
        SessionNotice::EditRejected { id: 2, .. }
    ));

    assert!(backend.calls().iter().any(|call| matches!(
        call,
        BackendCall::EditMessage { message_id: 2, .. }
    )));
    assert!(backend.calls().iter().any(|call| matches!(
        call,
        BackendCall::DeleteMessage { message_id: 1, .. }
    )));
}

#[tokio::test(start_paused = true)]
async fn commands_rejected_before_live_surface_as_notices() {
    let connector = SimConnector::new();
    let backend = SimBackend::new();
    backend.serve_user(ChatUser::named("stranger"));
    backend.serve_room(direct_room());

    let mut handle = SessionRuntime::spawn(
        connector,
        backend.clone(),
        SimEnv::new(),
        config(),
        RoomMode::Direct,
        7,
    );
    assert_eq!(
        next_notice(&mut handle).await,
        SessionNotice::Failed(SessionFailure::Forbidden)
    );

    // Edits and deletes bounce the way sends do, each carrying its id.
    handle.edit(4, "too late").await.unwrap();
    assert!(matches!(
        next_notice(&mut handle).await,
        SessionNotice::EditRejected { id: 4, .. }
    ));

    handle.delete(5).await.unwrap();
    assert!(matches!(
        next_notice(&mut handle).await,
        SessionNotice::DeleteRejected { id: 5, .. }
    ));

    // Neither refusal reached the backend seam.
    assert!(!backend.calls().iter().any(|call| matches!(
        call,
        BackendCall::EditMessage { .. } | BackendCall::DeleteMessage { .. }
    )));
}
