//! Wire events — the closed message vocabulary of the room engine.
//!
//! DESIGN
//! ======
//! Every inbound payload is a `ClientEvent` and every outbound payload is a
//! `ServerEvent`, both internally tagged on an `event` field. Dispatch is an
//! exhaustive `match`, so adding an event is a compile-time-checked extension
//! rather than a new string constant plus a new conditional branch.
//!
//! Field names are camelCase on the wire; event tags are kebab-case, with the
//! `admin:*` family carried verbatim.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::{ChatMessage, DrawingOp, PendingRequest, PresenceEntry, RoomSnapshot};

// =============================================================================
// INBOUND
// =============================================================================

/// Events a client may send. Unknown tags or missing fields fail serde
/// deserialization and the payload is dropped before any mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    JoinIntent {
        room_id: String,
        identity: String,
        #[serde(default)]
        password: Option<String>,
    },
    BufferEdit {
        room_id: String,
        text: String,
    },
    DrawingOp {
        room_id: String,
        identity: String,
        ops: Vec<DrawingOp>,
    },
    ChatMessage {
        room_id: String,
        identity: String,
        text: String,
        #[serde(default)]
        attachment_url: Option<String>,
    },
    LanguageChange {
        room_id: String,
        language: String,
    },
    PresenceUpdate {
        room_id: String,
        identity: String,
        tool_state: serde_json::Value,
    },
    SyncRequest {
        room_id: String,
        #[serde(default)]
        connection_id: Option<Uuid>,
    },
    #[serde(rename = "admin:check")]
    AdminCheck { room_id: String },
    #[serde(rename = "admin:get-pending")]
    AdminGetPending { room_id: String },
    #[serde(rename = "admin:get-participants")]
    AdminGetParticipants { room_id: String },
    #[serde(rename = "admin:accept")]
    AdminAccept { room_id: String, identity: String },
    #[serde(rename = "admin:reject")]
    AdminReject { room_id: String, identity: String },
    #[serde(rename = "admin:remove")]
    AdminRemove { room_id: String, identity: String },
    AnalyzeCode {
        room_id: String,
        code: String,
    },
    ReviewCode {
        room_id: String,
        code: String,
    },
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// Events the server delivers. Directed, room-wide, or room-except-sender
/// targeting is chosen by the dispatcher, never encoded in the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    Joined {
        members: Vec<Member>,
        identity: String,
        connection_id: Uuid,
    },
    JoinPending {
        room_id: String,
    },
    JoinAccepted {
        room_id: String,
    },
    JoinRejected {
        room_id: String,
    },
    ParticipantRemoved {
        room_id: String,
    },
    PasswordError {
        room_id: String,
    },
    BufferEdit {
        text: String,
    },
    DrawingOp {
        identity: String,
        ops: Vec<DrawingOp>,
    },
    ChatMessage(ChatMessage),
    LanguageChange {
        identity: String,
        language: String,
    },
    PresenceUpdate {
        presences: Vec<PresenceEntry>,
    },
    SyncState {
        room: RoomSnapshot,
    },
    AdminStatus {
        is_admin: bool,
    },
    PendingUpdate {
        pending_requests: Vec<PendingRequest>,
    },
    ParticipantsUpdate {
        participants: Vec<Participant>,
    },
    DisconnectNotice {
        connection_id: Uuid,
        identity: String,
    },
    CodeAnalysisResult {
        explanations: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    CodeReviewResult {
        #[serde(skip_serializing_if = "Option::is_none")]
        review: Option<CodeReview>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

// =============================================================================
// PAYLOAD TYPES
// =============================================================================

/// A connected room member as seen in `joined` notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub connection_id: Uuid,
    pub identity: String,
}

/// A room member in the owner's participants view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub connection_id: Uuid,
    pub identity: String,
    pub is_admin: bool,
}

/// Structured review returned by the text-analysis collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeReview {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub best_practices: Vec<String>,
}

#[cfg(test)]
#[path = "event_test.rs"]
mod tests;
