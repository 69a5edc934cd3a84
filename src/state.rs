//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the authoritative room store, the connection registry, and the
//! ephemeral presence tracker, each behind its own `RwLock`. Room mutations
//! run under the write guard, so no two mutations of the same room are ever
//! concurrent and per-room event order equals guard-acquisition order.
//!
//! Everything here is process-lifetime state with no external durability:
//! constructed at startup, torn down at shutdown. A room exists exactly while
//! at least one connection is bound to it.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::llm::LlmComplete;
use crate::registry::ConnectionRegistry;
use crate::services::presence::PresenceTracker;

/// Buffer contents seeded into a freshly created room.
const STARTER_BUFFER: &str = "function sayHello() {\n  console.log(\"Hello, World!\");\n}\n";

/// Current time as milliseconds since Unix epoch.
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

// =============================================================================
// ROOM CONTENT TYPES
// =============================================================================

/// One chat log entry. Ids are epoch-millis based and strictly increasing
/// within a room, even for same-millisecond submissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: i64,
    pub identity: String,
    pub text: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
}

/// One drawing operation batch. Records are opaque JSON objects carrying a
/// stable `"id"` field; replay is idempotent because application is
/// last-write-per-id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingOp {
    #[serde(default)]
    pub added_records: Vec<serde_json::Value>,
    #[serde(default)]
    pub updated_records: Vec<RecordUpdate>,
    #[serde(default)]
    pub removed_record_ids: Vec<String>,
}

/// An old/new pair in a drawing update; only `new` is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordUpdate {
    pub old: serde_json::Value,
    pub new: serde_json::Value,
}

/// A queued join request awaiting the owner's decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequest {
    pub identity: String,
    pub requested_at: i64,
}

/// Ephemeral cursor/tool state for one connection. Overwritten wholesale on
/// every update, removed on disconnect; never part of the room snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    pub connection_id: Uuid,
    pub identity: String,
    pub tool_state: serde_json::Value,
}

/// Read-only snapshot of a whole room, sent to one connection on sync-request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub buffer: String,
    pub records: Vec<serde_json::Value>,
    pub chat: Vec<ChatMessage>,
    pub selected_language: String,
}

fn record_id(record: &serde_json::Value) -> Option<&str> {
    record.get("id").and_then(serde_json::Value::as_str)
}

// =============================================================================
// ROOM
// =============================================================================

/// Authoritative per-room state. Created lazily by the first join to an
/// unknown id, destroyed the instant the last bound connection drops.
#[derive(Debug)]
pub struct Room {
    pub buffer: String,
    pub drawing_log: Vec<DrawingOp>,
    /// Materialized drawing records, last write per id wins.
    pub records: HashMap<String, serde_json::Value>,
    pub chat_log: Vec<ChatMessage>,
    pub selected_language: String,
    /// The identity that created the room. Never changes.
    pub owner: String,
    pub approved_members: HashSet<String>,
    pub pending_requests: Vec<PendingRequest>,
    /// Shared secret fixed at creation from the creator's password, if any.
    pub secret: Option<String>,
    last_chat_id: i64,
}

impl Room {
    pub fn create(owner: &str, secret: Option<String>) -> Self {
        Self {
            buffer: STARTER_BUFFER.to_string(),
            drawing_log: Vec::new(),
            records: HashMap::new(),
            chat_log: Vec::new(),
            selected_language: String::new(),
            owner: owner.to_string(),
            approved_members: HashSet::from([owner.to_string()]),
            pending_requests: Vec::new(),
            secret,
            last_chat_id: 0,
        }
    }

    #[must_use]
    pub fn is_owner(&self, identity: &str) -> bool {
        self.owner == identity
    }

    #[must_use]
    pub fn is_approved(&self, identity: &str) -> bool {
        self.approved_members.contains(identity)
    }

    /// A room without a secret admits any password; a room with one requires
    /// an exact match.
    #[must_use]
    pub fn secret_matches(&self, password: Option<&str>) -> bool {
        match &self.secret {
            None => true,
            Some(secret) => password == Some(secret.as_str()),
        }
    }

    /// Deduplicate-insert into the pending queue. Returns whether a new entry
    /// was added.
    pub fn enqueue_pending(&mut self, identity: &str) -> bool {
        if self.pending_requests.iter().any(|p| p.identity == identity) {
            return false;
        }
        self.pending_requests
            .push(PendingRequest { identity: identity.to_string(), requested_at: now_ms() });
        true
    }

    pub fn drop_pending(&mut self, identity: &str) {
        self.pending_requests.retain(|p| p.identity != identity);
    }

    /// Idempotent membership grant.
    pub fn approve(&mut self, identity: &str) {
        self.approved_members.insert(identity.to_string());
    }

    /// Membership revocation. The owner can never be revoked, which keeps the
    /// `owner ∈ approved_members` invariant.
    pub fn revoke(&mut self, identity: &str) {
        if identity == self.owner {
            return;
        }
        self.approved_members.remove(identity);
    }

    /// Append a drawing batch to the log and materialize it into the record
    /// set. Last write per record id wins; replaying a batch is a no-op.
    pub fn apply_drawing(&mut self, ops: &[DrawingOp]) {
        for op in ops {
            for record in &op.added_records {
                if let Some(id) = record_id(record) {
                    self.records.insert(id.to_string(), record.clone());
                }
            }
            for update in &op.updated_records {
                if let Some(id) = record_id(&update.new) {
                    self.records.insert(id.to_string(), update.new.clone());
                }
            }
            for id in &op.removed_record_ids {
                self.records.remove(id);
            }
            self.drawing_log.push(op.clone());
        }
    }

    /// Append a chat message with a server-assigned monotonic id and clock
    /// timestamp.
    pub fn append_chat(&mut self, identity: &str, text: &str, attachment_url: Option<String>) -> ChatMessage {
        let id = now_ms().max(self.last_chat_id + 1);
        self.last_chat_id = id;
        let message = ChatMessage {
            id,
            identity: identity.to_string(),
            text: text.to_string(),
            timestamp: clock_label(),
            attachment_url,
        };
        self.chat_log.push(message.clone());
        message
    }

    #[must_use]
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            buffer: self.buffer.clone(),
            records: self.records.values().cloned().collect(),
            chat: self.chat_log.clone(),
            selected_language: self.selected_language.clone(),
        }
    }
}

// =============================================================================
// CLOCK LABELS
// =============================================================================

fn clock_label() -> String {
    let now = time::OffsetDateTime::now_utc();
    format_clock(now.hour(), now.minute())
}

/// "h:MM AM/PM" wall-clock label for chat messages.
fn format_clock(hour: u8, minute: u8) -> String {
    let suffix = if hour >= 12 { "PM" } else { "AM" };
    let display = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{display}:{minute:02} {suffix}")
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or cheap.
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RwLock<HashMap<String, Room>>>,
    pub registry: Arc<RwLock<ConnectionRegistry>>,
    pub presence: Arc<RwLock<PresenceTracker>>,
    /// Optional text-analysis model. `None` if env vars are not configured.
    pub llm: Option<Arc<dyn LlmComplete>>,
    pub upload_dir: PathBuf,
}

impl AppState {
    #[must_use]
    pub fn new(llm: Option<Arc<dyn LlmComplete>>, upload_dir: PathBuf) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            registry: Arc::new(RwLock::new(ConnectionRegistry::new())),
            presence: Arc::new(RwLock::new(PresenceTracker::new())),
            llm,
            upload_dir,
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
