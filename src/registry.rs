//! Connection registry — connection ↔ identity/room bindings.
//!
//! DESIGN
//! ======
//! Membership is an explicit `room id → set of connection ids` table owned
//! here, so membership queries and broadcast targeting are first-class
//! operations with no hidden coupling to the transport layer.
//!
//! Identity uniqueness is deliberately NOT enforced: several connections may
//! claim the same identity (multiple tabs), and identity-directed delivery
//! fans out to all of them.

use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::event::{Member, Participant, ServerEvent};

/// One live connection. Identity and room are set per join cycle; the sender
/// is the connection's outbound event queue.
#[derive(Debug)]
pub struct Connection {
    pub identity: Option<String>,
    pub room_id: Option<String>,
    pub tx: mpsc::Sender<ServerEvent>,
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<Uuid, Connection>,
    room_index: HashMap<String, HashSet<Uuid>>,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new transport connection, initially unbound.
    pub fn register(&mut self, connection_id: Uuid, tx: mpsc::Sender<ServerEvent>) {
        self.connections
            .insert(connection_id, Connection { identity: None, room_id: None, tx });
    }

    /// Remove a connection entirely (transport disconnect). Returns the entry
    /// so the caller can run departure cleanup for its room, if any.
    pub fn deregister(&mut self, connection_id: Uuid) -> Option<Connection> {
        let connection = self.connections.remove(&connection_id)?;
        if let Some(room_id) = &connection.room_id {
            self.remove_from_index(room_id, connection_id);
        }
        Some(connection)
    }

    /// Record the identity a connection declared without binding it to a
    /// room. Used while a join request sits in the pending queue so that
    /// accept/reject signals can reach the requester.
    pub fn claim_identity(&mut self, connection_id: Uuid, identity: &str) {
        if let Some(connection) = self.connections.get_mut(&connection_id) {
            connection.identity = Some(identity.to_string());
        }
    }

    /// Bind a connection to an identity and a room.
    pub fn bind(&mut self, connection_id: Uuid, identity: &str, room_id: &str) {
        let previous = {
            let Some(connection) = self.connections.get_mut(&connection_id) else {
                return;
            };
            let previous = connection.room_id.take();
            connection.identity = Some(identity.to_string());
            connection.room_id = Some(room_id.to_string());
            previous
        };
        if let Some(previous) = previous {
            if previous != room_id {
                self.remove_from_index(&previous, connection_id);
            }
        }
        self.room_index
            .entry(room_id.to_string())
            .or_default()
            .insert(connection_id);
    }

    /// Clear a connection's room binding, keeping the connection (and its
    /// claimed identity) alive for a future join cycle. Returns the room it
    /// was bound to.
    pub fn unbind(&mut self, connection_id: Uuid) -> Option<String> {
        let connection = self.connections.get_mut(&connection_id)?;
        let room_id = connection.room_id.take()?;
        self.remove_from_index(&room_id, connection_id);
        Some(room_id)
    }

    #[must_use]
    pub fn identity_of(&self, connection_id: Uuid) -> Option<&str> {
        self.connections
            .get(&connection_id)?
            .identity
            .as_deref()
    }

    #[must_use]
    pub fn room_of(&self, connection_id: Uuid) -> Option<&str> {
        self.connections.get(&connection_id)?.room_id.as_deref()
    }

    /// Whether the connection is currently bound to the given room.
    #[must_use]
    pub fn is_bound(&self, connection_id: Uuid, room_id: &str) -> bool {
        self.room_of(connection_id) == Some(room_id)
    }

    #[must_use]
    pub fn sender(&self, connection_id: Uuid) -> Option<mpsc::Sender<ServerEvent>> {
        Some(self.connections.get(&connection_id)?.tx.clone())
    }

    #[must_use]
    pub fn connections_in_room(&self, room_id: &str) -> Vec<Uuid> {
        self.room_index
            .get(room_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn connections_for_identity(&self, identity: &str) -> Vec<Uuid> {
        self.connections
            .iter()
            .filter(|(_, c)| c.identity.as_deref() == Some(identity))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Current members of a room as wire payloads.
    #[must_use]
    pub fn members_of(&self, room_id: &str) -> Vec<Member> {
        let mut members: Vec<Member> = self
            .connections_in_room(room_id)
            .into_iter()
            .map(|connection_id| Member {
                connection_id,
                identity: self
                    .identity_of(connection_id)
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect();
        members.sort_by(|a, b| a.identity.cmp(&b.identity));
        members
    }

    /// Members of a room annotated with the owner flag, for the owner's
    /// participants view.
    #[must_use]
    pub fn participants_of(&self, room_id: &str, owner: &str) -> Vec<Participant> {
        self.members_of(room_id)
            .into_iter()
            .map(|m| Participant {
                connection_id: m.connection_id,
                is_admin: m.identity == owner,
                identity: m.identity,
            })
            .collect()
    }

    fn remove_from_index(&mut self, room_id: &str, connection_id: Uuid) {
        if let Some(set) = self.room_index.get_mut(room_id) {
            set.remove(&connection_id);
            if set.is_empty() {
                self.room_index.remove(room_id);
            }
        }
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
