//! WebSocket handler — event dispatch for the room engine.
//!
//! DESIGN
//! ======
//! On upgrade, generates a connection ID, registers the connection, and
//! enters a `select!` loop:
//! - Incoming client payloads → parse into `ClientEvent` + exhaustive dispatch
//! - Queued events from room peers → forward to client
//!
//! Handler functions validate, call services, and return an `Outcome`; the
//! dispatch layer owns delivery targeting (reply to sender, room-wide,
//! room-except-sender). Admission and removal fan out to extra targets
//! (owner tabs, evicted connections) inside the admission service.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → register connection, unbound
//! 2. Client sends join-intent → admission decides admit/pending/reject
//! 3. Mutation events flow RoomStore → broadcast
//! 4. Close → SessionLifecycle cleanup (presence, membership, teardown)

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::event::{ClientEvent, ServerEvent};
use crate::services::admission::JoinOutcome;
use crate::services::{admission, analysis, broadcast, lifecycle, room};
use crate::state::{AppState, PresenceEntry};

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer uses this to
/// decide who receives what — handlers never send frames directly.
enum Outcome {
    /// Nothing to deliver (event dropped, or the service fanned out itself).
    None,
    /// Directed event to the sender only.
    Reply(ServerEvent),
    /// Broadcast to every room connection including the sender.
    RoomAll { room_id: String, event: ServerEvent },
    /// Broadcast to every room connection except the sender.
    RoomExceptSender { room_id: String, event: ServerEvent },
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();

    // Per-connection channel for events queued by peers and services.
    let (client_tx, mut client_rx) = mpsc::channel::<ServerEvent>(256);
    state.registry.write().await.register(connection_id, client_tx);
    info!(%connection_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        for event in process_event(&state, connection_id, &text).await {
                            let _ = send_event(&mut socket, &event).await;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(event) = client_rx.recv() => {
                if send_event(&mut socket, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    lifecycle::handle_disconnect(&state, connection_id).await;
    info!(%connection_id, "ws: client disconnected");
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Parse and process one inbound payload and return events for the sender.
///
/// This keeps websocket transport concerns separate from event handling, so
/// tests can exercise dispatch and fan-out behavior end-to-end.
pub(crate) async fn process_event(state: &AppState, connection_id: Uuid, text: &str) -> Vec<ServerEvent> {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            // Malformed payloads are dropped before any mutation.
            warn!(%connection_id, error = %e, "ws: dropping malformed event");
            return vec![];
        }
    };

    let outcome = match event {
        ClientEvent::JoinIntent { room_id, identity, password } => {
            handle_join(state, connection_id, room_id, identity, password).await
        }
        ClientEvent::BufferEdit { room_id, text } => {
            handle_buffer_edit(state, connection_id, room_id, text).await
        }
        ClientEvent::DrawingOp { room_id, identity, ops } => {
            handle_drawing_op(state, connection_id, room_id, identity, ops).await
        }
        ClientEvent::ChatMessage { room_id, identity, text, attachment_url } => {
            handle_chat(state, connection_id, room_id, identity, text, attachment_url).await
        }
        ClientEvent::LanguageChange { room_id, language } => {
            handle_language(state, connection_id, room_id, language).await
        }
        ClientEvent::PresenceUpdate { room_id, identity, tool_state } => {
            handle_presence(state, connection_id, room_id, identity, tool_state).await
        }
        ClientEvent::SyncRequest { room_id, connection_id: target } => {
            handle_sync(state, connection_id, room_id, target).await
        }
        ClientEvent::AdminCheck { room_id } => handle_admin_check(state, connection_id, room_id).await,
        ClientEvent::AdminGetPending { room_id } => {
            handle_get_pending(state, connection_id, room_id).await
        }
        ClientEvent::AdminGetParticipants { room_id } => {
            handle_get_participants(state, connection_id, room_id).await
        }
        ClientEvent::AdminAccept { room_id, identity } => {
            admission::accept(state, connection_id, &room_id, &identity).await;
            Outcome::None
        }
        ClientEvent::AdminReject { room_id, identity } => {
            admission::reject(state, connection_id, &room_id, &identity).await;
            Outcome::None
        }
        ClientEvent::AdminRemove { room_id, identity } => {
            match admission::remove(state, connection_id, &room_id, &identity).await {
                Some(participants) => Outcome::Reply(ServerEvent::ParticipantsUpdate { participants }),
                None => Outcome::None,
            }
        }
        ClientEvent::AnalyzeCode { room_id, code } => handle_analyze(state, connection_id, room_id, code),
        ClientEvent::ReviewCode { room_id, code } => handle_review(state, connection_id, room_id, code),
    };

    match outcome {
        Outcome::None => vec![],
        Outcome::Reply(event) => vec![event],
        Outcome::RoomAll { room_id, event } => {
            broadcast::to_room_all(state, &room_id, &event).await;
            vec![]
        }
        Outcome::RoomExceptSender { room_id, event } => {
            broadcast::to_room_except(state, &room_id, connection_id, &event).await;
            vec![]
        }
    }
}

// =============================================================================
// ADMISSION
// =============================================================================

async fn handle_join(
    state: &AppState,
    connection_id: Uuid,
    room_id: String,
    identity: String,
    password: Option<String>,
) -> Outcome {
    match admission::join_request(state, connection_id, &room_id, &identity, password.as_deref()).await {
        JoinOutcome::Admitted { members } => Outcome::RoomAll {
            room_id,
            event: ServerEvent::Joined { members, identity, connection_id },
        },
        JoinOutcome::Pending => Outcome::Reply(ServerEvent::JoinPending { room_id }),
        JoinOutcome::WrongPassword => Outcome::Reply(ServerEvent::PasswordError { room_id }),
    }
}

// =============================================================================
// ROOM MUTATIONS
// =============================================================================

async fn handle_buffer_edit(state: &AppState, connection_id: Uuid, room_id: String, text: String) -> Outcome {
    if !is_bound(state, connection_id, &room_id).await {
        warn!(%connection_id, %room_id, "ws: buffer edit from unbound connection dropped");
        return Outcome::None;
    }
    if room::set_buffer(state, &room_id, &text).await {
        Outcome::RoomExceptSender { room_id, event: ServerEvent::BufferEdit { text } }
    } else {
        Outcome::None
    }
}

async fn handle_drawing_op(
    state: &AppState,
    connection_id: Uuid,
    room_id: String,
    identity: String,
    ops: Vec<crate::state::DrawingOp>,
) -> Outcome {
    if !is_bound(state, connection_id, &room_id).await {
        warn!(%connection_id, %room_id, "ws: drawing op from unbound connection dropped");
        return Outcome::None;
    }
    if room::apply_drawing(state, &room_id, &ops).await {
        Outcome::RoomExceptSender { room_id, event: ServerEvent::DrawingOp { identity, ops } }
    } else {
        Outcome::None
    }
}

async fn handle_chat(
    state: &AppState,
    connection_id: Uuid,
    room_id: String,
    identity: String,
    text: String,
    attachment_url: Option<String>,
) -> Outcome {
    if !is_bound(state, connection_id, &room_id).await {
        warn!(%connection_id, %room_id, "ws: chat from unbound connection dropped");
        return Outcome::None;
    }
    match room::append_chat(state, &room_id, &identity, &text, attachment_url).await {
        // Everyone including the sender sees the server-assigned id/timestamp.
        Some(message) => Outcome::RoomAll { room_id, event: ServerEvent::ChatMessage(message) },
        None => Outcome::None,
    }
}

async fn handle_language(state: &AppState, connection_id: Uuid, room_id: String, language: String) -> Outcome {
    if !is_bound(state, connection_id, &room_id).await {
        warn!(%connection_id, %room_id, "ws: language change from unbound connection dropped");
        return Outcome::None;
    }
    if room::set_language(state, &room_id, &language).await {
        let identity = identity_of(state, connection_id).await.unwrap_or_default();
        Outcome::RoomExceptSender { room_id, event: ServerEvent::LanguageChange { identity, language } }
    } else {
        Outcome::None
    }
}

// =============================================================================
// PRESENCE
// =============================================================================

async fn handle_presence(
    state: &AppState,
    connection_id: Uuid,
    room_id: String,
    identity: String,
    tool_state: serde_json::Value,
) -> Outcome {
    if !is_bound(state, connection_id, &room_id).await {
        // Silently ignore presence before joining.
        return Outcome::None;
    }
    let presences = {
        let mut tracker = state.presence.write().await;
        tracker.upsert(&room_id, PresenceEntry { connection_id, identity, tool_state });
        tracker.presences(&room_id)
    };
    Outcome::RoomExceptSender { room_id, event: ServerEvent::PresenceUpdate { presences } }
}

// =============================================================================
// SYNC
// =============================================================================

async fn handle_sync(
    state: &AppState,
    connection_id: Uuid,
    room_id: String,
    target: Option<Uuid>,
) -> Outcome {
    if !is_bound(state, connection_id, &room_id).await {
        warn!(%connection_id, %room_id, "ws: sync request from unbound connection dropped");
        return Outcome::None;
    }
    let Some(snapshot) = room::snapshot(state, &room_id).await else {
        return Outcome::None;
    };
    let event = ServerEvent::SyncState { room: snapshot };
    match target {
        Some(target) if target != connection_id => {
            broadcast::to_connection(state, target, event).await;
            Outcome::None
        }
        _ => Outcome::Reply(event),
    }
}

// =============================================================================
// ADMIN QUERIES
// =============================================================================

async fn handle_admin_check(state: &AppState, connection_id: Uuid, room_id: String) -> Outcome {
    let identity = identity_of(state, connection_id).await;
    let is_admin = match identity {
        Some(identity) => {
            let rooms = state.rooms.read().await;
            rooms.get(&room_id).is_some_and(|r| r.is_owner(&identity))
        }
        None => false,
    };
    Outcome::Reply(ServerEvent::AdminStatus { is_admin })
}

async fn handle_get_pending(state: &AppState, connection_id: Uuid, room_id: String) -> Outcome {
    let Some(identity) = identity_of(state, connection_id).await else {
        return Outcome::None;
    };
    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(&room_id) else {
        return Outcome::None;
    };
    if !room.is_owner(&identity) {
        return Outcome::None;
    }
    Outcome::Reply(ServerEvent::PendingUpdate { pending_requests: room.pending_requests.clone() })
}

async fn handle_get_participants(state: &AppState, connection_id: Uuid, room_id: String) -> Outcome {
    let owner = {
        let Some(identity) = identity_of(state, connection_id).await else {
            return Outcome::None;
        };
        let rooms = state.rooms.read().await;
        let Some(room) = rooms.get(&room_id) else {
            return Outcome::None;
        };
        if !room.is_owner(&identity) {
            return Outcome::None;
        }
        room.owner.clone()
    };
    let participants = state
        .registry
        .read()
        .await
        .participants_of(&room_id, &owner);
    Outcome::Reply(ServerEvent::ParticipantsUpdate { participants })
}

// =============================================================================
// ANALYSIS (directed, fire-and-forget)
// =============================================================================

fn handle_analyze(state: &AppState, connection_id: Uuid, room_id: String, code: String) -> Outcome {
    info!(%room_id, %connection_id, "ws: code analysis requested");
    let state = state.clone();
    tokio::spawn(async move {
        let event = match &state.llm {
            Some(llm) => match analysis::analyze_code(llm.as_ref(), &code).await {
                Ok(explanations) => ServerEvent::CodeAnalysisResult { explanations, error: None },
                Err(e) => {
                    warn!(error = %e, "code analysis failed");
                    ServerEvent::CodeAnalysisResult {
                        explanations: vec![],
                        error: Some(format!("Failed to analyze code: {e}")),
                    }
                }
            },
            None => ServerEvent::CodeAnalysisResult {
                explanations: vec![],
                error: Some(analysis::AnalysisError::NotConfigured.to_string()),
            },
        };
        broadcast::to_connection(&state, connection_id, event).await;
    });
    Outcome::None
}

fn handle_review(state: &AppState, connection_id: Uuid, room_id: String, code: String) -> Outcome {
    info!(%room_id, %connection_id, "ws: code review requested");
    let state = state.clone();
    tokio::spawn(async move {
        let event = match &state.llm {
            Some(llm) => match analysis::review_code(llm.as_ref(), &code).await {
                Ok(review) => ServerEvent::CodeReviewResult { review: Some(review), error: None },
                Err(e) => {
                    warn!(error = %e, "code review failed");
                    ServerEvent::CodeReviewResult {
                        review: None,
                        error: Some(format!("Failed to review code: {e}")),
                    }
                }
            },
            None => ServerEvent::CodeReviewResult {
                review: None,
                error: Some(analysis::AnalysisError::NotConfigured.to_string()),
            },
        };
        broadcast::to_connection(&state, connection_id, event).await;
    });
    Outcome::None
}

// =============================================================================
// HELPERS
// =============================================================================

async fn is_bound(state: &AppState, connection_id: Uuid, room_id: &str) -> bool {
    state.registry.read().await.is_bound(connection_id, room_id)
}

async fn identity_of(state: &AppState, connection_id: Uuid) -> Option<String> {
    state
        .registry
        .read()
        .await
        .identity_of(connection_id)
        .map(str::to_string)
}

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), ()> {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize event");
            return Err(());
        }
    };
    // Presence updates are high-frequency; keep them out of the log.
    if !matches!(event, ServerEvent::PresenceUpdate { .. }) {
        info!(event = %tag_of(event), "ws: send event");
    }
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

fn tag_of(event: &ServerEvent) -> &'static str {
    match event {
        ServerEvent::Joined { .. } => "joined",
        ServerEvent::JoinPending { .. } => "join-pending",
        ServerEvent::JoinAccepted { .. } => "join-accepted",
        ServerEvent::JoinRejected { .. } => "join-rejected",
        ServerEvent::ParticipantRemoved { .. } => "participant-removed",
        ServerEvent::PasswordError { .. } => "password-error",
        ServerEvent::BufferEdit { .. } => "buffer-edit",
        ServerEvent::DrawingOp { .. } => "drawing-op",
        ServerEvent::ChatMessage(_) => "chat-message",
        ServerEvent::LanguageChange { .. } => "language-change",
        ServerEvent::PresenceUpdate { .. } => "presence-update",
        ServerEvent::SyncState { .. } => "sync-state",
        ServerEvent::AdminStatus { .. } => "admin-status",
        ServerEvent::PendingUpdate { .. } => "pending-update",
        ServerEvent::ParticipantsUpdate { .. } => "participants-update",
        ServerEvent::DisconnectNotice { .. } => "disconnect-notice",
        ServerEvent::CodeAnalysisResult { .. } => "code-analysis-result",
        ServerEvent::CodeReviewResult { .. } => "code-review-result",
    }
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
