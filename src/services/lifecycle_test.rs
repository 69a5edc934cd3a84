use super::*;
use crate::services::admission::{self, JoinOutcome};
use crate::state::test_helpers;
use serde_json::json;

#[tokio::test]
async fn last_disconnect_deletes_the_room() {
    let state = test_helpers::test_app_state();
    let (alice, _alice_rx) = test_helpers::join_room(&state, "team5", "alice").await;
    state.presence.write().await.upsert(
        "team5",
        crate::state::PresenceEntry { connection_id: alice, identity: "alice".into(), tool_state: json!({}) },
    );

    handle_disconnect(&state, alice).await;

    assert!(state.rooms.read().await.is_empty());
    assert!(state.presence.read().await.presences("team5").is_empty());
    assert!(state.registry.read().await.sender(alice).is_none());
}

#[tokio::test]
async fn rejoin_after_empty_window_starts_a_fresh_room() {
    let state = test_helpers::test_app_state();
    let (alice, _alice_rx) = test_helpers::join_room(&state, "team5", "alice").await;
    crate::services::room::set_buffer(&state, "team5", "alice's work").await;

    handle_disconnect(&state, alice).await;

    // The next joiner owns a brand-new room; nothing survived.
    let (zoe, _zoe_rx) = test_helpers::register_connection(&state).await;
    let outcome = admission::join_request(&state, zoe, "team5", "zoe", None).await;
    assert!(matches!(outcome, JoinOutcome::Admitted { .. }));

    let rooms = state.rooms.read().await;
    assert_eq!(rooms["team5"].owner, "zoe");
    assert_ne!(rooms["team5"].buffer, "alice's work");
    assert!(rooms["team5"].chat_log.is_empty());
}

#[tokio::test]
async fn departure_notice_reaches_remaining_members() {
    let state = test_helpers::test_app_state();
    let (_tab_a, mut tab_a_rx) = test_helpers::join_room(&state, "team5", "alice").await;
    let (tab_b, _tab_b_rx) = test_helpers::join_room(&state, "team5", "alice").await;

    handle_disconnect(&state, tab_b).await;

    let notice = tab_a_rx.try_recv().expect("departure notice expected");
    match notice {
        crate::event::ServerEvent::DisconnectNotice { connection_id, identity } => {
            assert_eq!(connection_id, tab_b);
            assert_eq!(identity, "alice");
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(state.rooms.read().await.contains_key("team5"));
}

#[tokio::test]
async fn disconnect_of_pending_connection_is_clean() {
    let state = test_helpers::test_app_state();
    let (_alice, _alice_rx) = test_helpers::join_room(&state, "team5", "alice").await;
    let (bob, _bob_rx) = test_helpers::register_connection(&state).await;
    admission::join_request(&state, bob, "team5", "bob", None).await;

    handle_disconnect(&state, bob).await;

    assert!(state.registry.read().await.sender(bob).is_none());
    // The queued request stays until the owner decides.
    let rooms = state.rooms.read().await;
    assert_eq!(rooms["team5"].pending_requests.len(), 1);
}

#[tokio::test]
async fn disconnect_of_unknown_connection_is_a_noop() {
    let state = test_helpers::test_app_state();
    handle_disconnect(&state, uuid::Uuid::new_v4()).await;
    assert!(state.rooms.read().await.is_empty());
}

#[tokio::test]
async fn rebinding_to_another_room_runs_full_departure() {
    let state = test_helpers::test_app_state();
    let (alice, _alice_rx) = test_helpers::join_room(&state, "first", "alice").await;

    let outcome = admission::join_request(&state, alice, "second", "alice", None).await;
    assert!(matches!(outcome, JoinOutcome::Admitted { .. }));

    let rooms = state.rooms.read().await;
    assert!(!rooms.contains_key("first"), "vacated room should be deleted");
    assert!(rooms.contains_key("second"));
    assert!(state.registry.read().await.is_bound(alice, "second"));
}
