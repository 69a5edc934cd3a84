//! Presence tracker — ephemeral per-room cursor/tool state.
//!
//! Presence is keyed by connection id and overwritten wholesale on every
//! update. It is never part of the room snapshot and never survives the
//! connection that produced it.

use std::collections::HashMap;

use uuid::Uuid;

use crate::state::PresenceEntry;

#[derive(Debug, Default)]
pub struct PresenceTracker {
    rooms: HashMap<String, HashMap<Uuid, PresenceEntry>>,
}

impl PresenceTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for a connection.
    pub fn upsert(&mut self, room_id: &str, entry: PresenceEntry) {
        self.rooms
            .entry(room_id.to_string())
            .or_default()
            .insert(entry.connection_id, entry);
    }

    /// Remove one connection's entry. Empty room buckets are dropped.
    /// Returns whether an entry existed.
    pub fn remove(&mut self, room_id: &str, connection_id: Uuid) -> bool {
        let Some(bucket) = self.rooms.get_mut(room_id) else {
            return false;
        };
        let existed = bucket.remove(&connection_id).is_some();
        if bucket.is_empty() {
            self.rooms.remove(room_id);
        }
        existed
    }

    /// Drop a room's whole bucket on teardown.
    pub fn drop_room(&mut self, room_id: &str) {
        self.rooms.remove(room_id);
    }

    /// All live entries for a room.
    #[must_use]
    pub fn presences(&self, room_id: &str) -> Vec<PresenceEntry> {
        self.rooms
            .get(room_id)
            .map(|bucket| bucket.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "presence_test.rs"]
mod tests;
