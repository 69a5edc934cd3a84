use super::*;
use serde_json::json;

fn entry(connection_id: Uuid, identity: &str, tool: &str) -> PresenceEntry {
    PresenceEntry {
        connection_id,
        identity: identity.to_string(),
        tool_state: json!({"tool": tool, "x": 1.0, "y": 2.0}),
    }
}

#[test]
fn upsert_overwrites_wholesale() {
    let mut tracker = PresenceTracker::new();
    let id = Uuid::new_v4();
    tracker.upsert("x", entry(id, "carol", "pen"));
    tracker.upsert("x", entry(id, "carol", "eraser"));

    let presences = tracker.presences("x");
    assert_eq!(presences.len(), 1);
    assert_eq!(presences[0].tool_state["tool"], "eraser");
}

#[test]
fn entries_are_keyed_by_connection_not_identity() {
    let mut tracker = PresenceTracker::new();
    tracker.upsert("x", entry(Uuid::new_v4(), "carol", "pen"));
    tracker.upsert("x", entry(Uuid::new_v4(), "carol", "pen"));
    assert_eq!(tracker.presences("x").len(), 2);
}

#[test]
fn remove_drops_entry_and_empty_bucket() {
    let mut tracker = PresenceTracker::new();
    let id = Uuid::new_v4();
    tracker.upsert("x", entry(id, "carol", "pen"));

    assert!(tracker.remove("x", id));
    assert!(tracker.presences("x").is_empty());
    // Second removal reports nothing existed.
    assert!(!tracker.remove("x", id));
}

#[test]
fn rooms_are_isolated() {
    let mut tracker = PresenceTracker::new();
    tracker.upsert("x", entry(Uuid::new_v4(), "carol", "pen"));
    tracker.upsert("y", entry(Uuid::new_v4(), "dave", "pen"));

    tracker.drop_room("x");
    assert!(tracker.presences("x").is_empty());
    assert_eq!(tracker.presences("y").len(), 1);
}
