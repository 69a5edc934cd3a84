//! Room store mutations — buffer, drawing log, chat log, language, snapshot.
//!
//! DESIGN
//! ======
//! Every mutation acquires the room-store write guard, applies, and releases
//! before any fan-out happens, so per-room mutation order is the guard
//! acquisition order. Conflict policy per field:
//!
//! - buffer: replaced wholesale, last-write-wins, no operational transform
//! - drawing: append to the log, materialize by record id (last writer per
//!   id wins; replay is idempotent)
//! - chat: append-only with server-assigned strictly increasing ids
//! - language: replaced wholesale, last-write-wins
//!
//! A mutation aimed at an unknown room returns `false`/`None` and the caller
//! drops the event.

use tracing::info;

use crate::state::{AppState, ChatMessage, DrawingOp, RoomSnapshot};

/// Replace the shared text buffer.
pub async fn set_buffer(state: &AppState, room_id: &str, text: &str) -> bool {
    let mut rooms = state.rooms.write().await;
    match rooms.get_mut(room_id) {
        Some(room) => {
            room.buffer = text.to_string();
            true
        }
        None => false,
    }
}

/// Append drawing batches and materialize them into the record set.
pub async fn apply_drawing(state: &AppState, room_id: &str, ops: &[DrawingOp]) -> bool {
    let mut rooms = state.rooms.write().await;
    match rooms.get_mut(room_id) {
        Some(room) => {
            room.apply_drawing(ops);
            true
        }
        None => false,
    }
}

/// Append a chat message. Empty-after-trim text is rejected; attachment URLs
/// are carried opaquely.
pub async fn append_chat(
    state: &AppState,
    room_id: &str,
    identity: &str,
    text: &str,
    attachment_url: Option<String>,
) -> Option<ChatMessage> {
    let text = text.trim();
    if text.is_empty() && attachment_url.is_none() {
        return None;
    }
    let mut rooms = state.rooms.write().await;
    let room = rooms.get_mut(room_id)?;
    let message = room.append_chat(identity, text, attachment_url);
    info!(room_id, identity, id = message.id, "chat message appended");
    Some(message)
}

/// Replace the selected language.
pub async fn set_language(state: &AppState, room_id: &str, language: &str) -> bool {
    let mut rooms = state.rooms.write().await;
    match rooms.get_mut(room_id) {
        Some(room) => {
            room.selected_language = language.to_string();
            true
        }
        None => false,
    }
}

/// Read-only snapshot of the whole room for a directed sync response.
pub async fn snapshot(state: &AppState, room_id: &str) -> Option<RoomSnapshot> {
    let rooms = state.rooms.read().await;
    Some(rooms.get(room_id)?.snapshot())
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
