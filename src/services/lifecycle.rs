//! Session lifecycle — departure cleanup and room teardown.
//!
//! DESIGN
//! ======
//! Disconnect is the only cancellation signal in the engine and it is
//! handled synchronously here: presence entry removed, registry binding
//! cleared, and either a departure notice broadcast to the remaining members
//! or, when the last connection drops, the room and its presence bucket
//! deleted outright. State is NOT retained across an empty-room window; the
//! next join to the same id creates a brand-new room under the new joiner.

use tracing::info;
use uuid::Uuid;

use crate::event::ServerEvent;
use crate::services::broadcast;
use crate::state::AppState;

/// Transport disconnect: drop the connection entirely, then run departure
/// cleanup for the room it was bound to, if any.
pub async fn handle_disconnect(state: &AppState, connection_id: Uuid) {
    let Some(connection) = state.registry.write().await.deregister(connection_id) else {
        return;
    };
    let Some(room_id) = connection.room_id else {
        return;
    };
    finish_departure(state, connection_id, &room_id, connection.identity.unwrap_or_default()).await;
}

/// Unbind a still-connected client from its current room (rebinding to
/// another room). The same teardown/notice rules as a disconnect apply.
pub async fn leave_current_room(state: &AppState, connection_id: Uuid) {
    let unbound = {
        let mut registry = state.registry.write().await;
        let identity = registry
            .identity_of(connection_id)
            .unwrap_or_default()
            .to_string();
        registry.unbind(connection_id).map(|room_id| (room_id, identity))
    };
    if let Some((room_id, identity)) = unbound {
        finish_departure(state, connection_id, &room_id, identity).await;
    }
}

async fn finish_departure(state: &AppState, connection_id: Uuid, room_id: &str, identity: String) {
    state.presence.write().await.remove(room_id, connection_id);

    let remaining = state
        .registry
        .read()
        .await
        .connections_in_room(room_id)
        .len();
    if remaining == 0 {
        state.rooms.write().await.remove(room_id);
        state.presence.write().await.drop_room(room_id);
        info!(room_id, "last connection left, room deleted");
    } else {
        info!(room_id, %connection_id, remaining, "connection left room");
        broadcast::to_room_all(
            state,
            room_id,
            &ServerEvent::DisconnectNotice { connection_id, identity },
        )
        .await;
    }
}

#[cfg(test)]
#[path = "lifecycle_test.rs"]
mod tests;
