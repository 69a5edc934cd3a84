//! Broadcast router — event delivery to rooms, connections, and identities.
//!
//! DESIGN
//! ======
//! Delivery is fire-and-forget: events are `try_send`-queued into each
//! connection's bounded outbound channel and a full or closed channel drops
//! the frame (at-most-once, no retry, no acknowledgement). Nothing here
//! blocks the caller on a remote peer, so fan-out cannot stall dispatch.
//!
//! Within one room, callers mutate state before fanning out and mutations
//! are serialized by the room store's write guard, so members observe events
//! in the order the server applied them. No ordering is promised across
//! rooms.

use uuid::Uuid;

use crate::event::ServerEvent;
use crate::state::AppState;

/// Deliver to every connection bound to the room, including the sender.
/// Used for membership notifications and chat (the sender must see its own
/// message with the server-assigned id and timestamp).
pub async fn to_room_all(state: &AppState, room_id: &str, event: &ServerEvent) {
    let registry = state.registry.read().await;
    for connection_id in registry.connections_in_room(room_id) {
        if let Some(tx) = registry.sender(connection_id) {
            let _ = tx.try_send(event.clone());
        }
    }
}

/// Deliver to every room connection except one. Used for state-change echoes
/// where the sender already holds the authoritative copy.
pub async fn to_room_except(state: &AppState, room_id: &str, exclude: Uuid, event: &ServerEvent) {
    let registry = state.registry.read().await;
    for connection_id in registry.connections_in_room(room_id) {
        if connection_id == exclude {
            continue;
        }
        if let Some(tx) = registry.sender(connection_id) {
            let _ = tx.try_send(event.clone());
        }
    }
}

/// Deliver a directed event to a single connection.
pub async fn to_connection(state: &AppState, connection_id: Uuid, event: ServerEvent) {
    let registry = state.registry.read().await;
    if let Some(tx) = registry.sender(connection_id) {
        let _ = tx.try_send(event);
    }
}

/// Deliver to every connection claiming an identity, bound or pending.
/// Multiple tabs under one identity all receive the event.
pub async fn to_identity(state: &AppState, identity: &str, event: &ServerEvent) {
    let registry = state.registry.read().await;
    for connection_id in registry.connections_for_identity(identity) {
        if let Some(tx) = registry.sender(connection_id) {
            let _ = tx.try_send(event.clone());
        }
    }
}
