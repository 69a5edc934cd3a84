use super::*;
use tokio::sync::mpsc;

fn channel() -> mpsc::Sender<ServerEvent> {
    mpsc::channel(8).0
}

#[test]
fn register_starts_unbound() {
    let mut registry = ConnectionRegistry::new();
    let id = Uuid::new_v4();
    registry.register(id, channel());

    assert!(registry.identity_of(id).is_none());
    assert!(registry.room_of(id).is_none());
    assert!(registry.sender(id).is_some());
}

#[test]
fn bind_sets_identity_room_and_index() {
    let mut registry = ConnectionRegistry::new();
    let id = Uuid::new_v4();
    registry.register(id, channel());
    registry.bind(id, "alice", "team5");

    assert_eq!(registry.identity_of(id), Some("alice"));
    assert_eq!(registry.room_of(id), Some("team5"));
    assert!(registry.is_bound(id, "team5"));
    assert_eq!(registry.connections_in_room("team5"), vec![id]);
}

#[test]
fn rebind_moves_the_room_index_entry() {
    let mut registry = ConnectionRegistry::new();
    let id = Uuid::new_v4();
    registry.register(id, channel());
    registry.bind(id, "alice", "old");
    registry.bind(id, "alice", "new");

    assert!(registry.connections_in_room("old").is_empty());
    assert_eq!(registry.connections_in_room("new"), vec![id]);
}

#[test]
fn unbind_clears_room_but_keeps_identity() {
    let mut registry = ConnectionRegistry::new();
    let id = Uuid::new_v4();
    registry.register(id, channel());
    registry.bind(id, "alice", "team5");

    assert_eq!(registry.unbind(id), Some("team5".to_string()));
    assert!(registry.room_of(id).is_none());
    assert_eq!(registry.identity_of(id), Some("alice"));
    assert!(registry.connections_in_room("team5").is_empty());
    // A second unbind is a no-op.
    assert!(registry.unbind(id).is_none());
}

#[test]
fn deregister_removes_connection_and_index_entry() {
    let mut registry = ConnectionRegistry::new();
    let id = Uuid::new_v4();
    registry.register(id, channel());
    registry.bind(id, "alice", "team5");

    let connection = registry.deregister(id).expect("connection should exist");
    assert_eq!(connection.identity.as_deref(), Some("alice"));
    assert_eq!(connection.room_id.as_deref(), Some("team5"));
    assert!(registry.sender(id).is_none());
    assert!(registry.connections_in_room("team5").is_empty());
    assert!(registry.deregister(id).is_none());
}

#[test]
fn multiple_connections_may_claim_one_identity() {
    let mut registry = ConnectionRegistry::new();
    let tab_a = Uuid::new_v4();
    let tab_b = Uuid::new_v4();
    let other = Uuid::new_v4();
    registry.register(tab_a, channel());
    registry.register(tab_b, channel());
    registry.register(other, channel());
    registry.bind(tab_a, "carol", "x");
    registry.bind(tab_b, "carol", "x");
    registry.bind(other, "dave", "x");

    let mut carols = registry.connections_for_identity("carol");
    carols.sort();
    let mut expected = vec![tab_a, tab_b];
    expected.sort();
    assert_eq!(carols, expected);
    assert_eq!(registry.connections_in_room("x").len(), 3);
}

#[test]
fn claim_identity_records_identity_without_room() {
    let mut registry = ConnectionRegistry::new();
    let id = Uuid::new_v4();
    registry.register(id, channel());
    registry.claim_identity(id, "bob");

    assert_eq!(registry.identity_of(id), Some("bob"));
    assert!(registry.room_of(id).is_none());
    assert_eq!(registry.connections_for_identity("bob"), vec![id]);
}

#[test]
fn members_are_sorted_and_participants_flag_the_owner() {
    let mut registry = ConnectionRegistry::new();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    registry.register(a, channel());
    registry.register(b, channel());
    registry.bind(a, "zoe", "team5");
    registry.bind(b, "alice", "team5");

    let members = registry.members_of("team5");
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].identity, "alice");
    assert_eq!(members[1].identity, "zoe");

    let participants = registry.participants_of("team5", "alice");
    assert!(participants[0].is_admin);
    assert!(!participants[1].is_admin);
}
