//! Admission controller — room entry, pending queue, accept/reject/remove.
//!
//! DESIGN
//! ======
//! Join resolution order: secret check, then owner/approved fast path, then
//! the pending queue. Room creation is lazy: the first join to an unknown id
//! creates the room with the joiner as owner and fixes the presented
//! password (if any) as the room secret.
//!
//! Admin commands issued by a non-owner are silent no-ops: the command is
//! dropped before reaching any mutating branch and no error surfaces.
//!
//! Rejection and removal are terminal for the current connection. There is
//! no blacklist; a rejected or removed identity may issue a fresh join
//! request immediately and re-enters the pending queue.

use tracing::info;
use uuid::Uuid;

use crate::event::{Member, Participant, ServerEvent};
use crate::services::{broadcast, lifecycle};
use crate::state::{AppState, PendingRequest, Room};

/// Result of a join request, as seen by the dispatch layer.
#[derive(Debug)]
pub enum JoinOutcome {
    /// The connection is now bound to the room.
    Admitted { members: Vec<Member> },
    /// The request sits in the pending queue; the connection stays unbound.
    Pending,
    /// The presented password did not match the room secret. No mutation.
    WrongPassword,
}

enum Decision {
    Admit,
    Pending { pending: Vec<PendingRequest>, owner: String },
    WrongPassword,
}

/// Resolve a join intent. See `JoinOutcome` for the three possible results.
pub async fn join_request(
    state: &AppState,
    connection_id: Uuid,
    room_id: &str,
    identity: &str,
    password: Option<&str>,
) -> JoinOutcome {
    let decision = {
        let mut rooms = state.rooms.write().await;
        match rooms.get_mut(room_id) {
            None => {
                rooms.insert(room_id.to_string(), Room::create(identity, password.map(str::to_string)));
                info!(room_id, owner = identity, "room created");
                Decision::Admit
            }
            Some(room) => {
                if !room.secret_matches(password) {
                    Decision::WrongPassword
                } else if room.is_owner(identity) || room.is_approved(identity) {
                    Decision::Admit
                } else {
                    if room.enqueue_pending(identity) {
                        info!(room_id, identity, "join request queued");
                    }
                    Decision::Pending { pending: room.pending_requests.clone(), owner: room.owner.clone() }
                }
            }
        }
    };

    match decision {
        Decision::Admit => {
            // Leaving a previously joined room is a full departure, so its
            // teardown/notice rules still apply.
            let previous = state
                .registry
                .read()
                .await
                .room_of(connection_id)
                .map(str::to_string);
            if previous.as_deref().is_some_and(|p| p != room_id) {
                lifecycle::leave_current_room(state, connection_id).await;
            }

            state
                .registry
                .write()
                .await
                .bind(connection_id, identity, room_id);
            let members = state.registry.read().await.members_of(room_id);
            info!(room_id, identity, %connection_id, "connection admitted");
            JoinOutcome::Admitted { members }
        }
        Decision::Pending { pending, owner } => {
            // Claim the identity so accept/reject signals can reach this
            // connection while it waits.
            state
                .registry
                .write()
                .await
                .claim_identity(connection_id, identity);
            broadcast::to_identity(state, &owner, &ServerEvent::PendingUpdate { pending_requests: pending })
                .await;
            JoinOutcome::Pending
        }
        Decision::WrongPassword => JoinOutcome::WrongPassword,
    }
}

/// Owner grants a pending request. Adds the target to the approved set
/// (idempotent), clears its pending entry, signals every connection claiming
/// the target identity, and refreshes the owner's pending view. The accepted
/// client re-issues a join intent, which now resolves on the approved path.
pub async fn accept(state: &AppState, acting_connection: Uuid, room_id: &str, target: &str) {
    let Some(acting) = identity_of(state, acting_connection).await else {
        return;
    };

    let (pending, owner) = {
        let mut rooms = state.rooms.write().await;
        let Some(room) = rooms.get_mut(room_id) else {
            return;
        };
        if !room.is_owner(&acting) {
            return;
        }
        room.approve(target);
        room.drop_pending(target);
        info!(room_id, target, "join request accepted");
        (room.pending_requests.clone(), room.owner.clone())
    };

    broadcast::to_identity(state, target, &ServerEvent::JoinAccepted { room_id: room_id.to_string() }).await;
    broadcast::to_identity(state, &owner, &ServerEvent::PendingUpdate { pending_requests: pending }).await;
}

/// Owner declines a pending request. Clears the pending entry, signals the
/// target, refreshes the owner's view. The approved set is untouched.
pub async fn reject(state: &AppState, acting_connection: Uuid, room_id: &str, target: &str) {
    let Some(acting) = identity_of(state, acting_connection).await else {
        return;
    };

    let (pending, owner) = {
        let mut rooms = state.rooms.write().await;
        let Some(room) = rooms.get_mut(room_id) else {
            return;
        };
        if !room.is_owner(&acting) {
            return;
        }
        room.drop_pending(target);
        info!(room_id, target, "join request rejected");
        (room.pending_requests.clone(), room.owner.clone())
    };

    broadcast::to_identity(state, target, &ServerEvent::JoinRejected { room_id: room_id.to_string() }).await;
    broadcast::to_identity(state, &owner, &ServerEvent::PendingUpdate { pending_requests: pending }).await;
}

/// Owner evicts a member. Revokes membership, force-unbinds every live
/// connection claiming that identity in this room, signals each one, and
/// notifies the remaining members of the departure. Returns the refreshed
/// participants list for the acting owner, or `None` when the command was a
/// no-op (non-owner caller, unknown room, or the owner targeting itself).
pub async fn remove(
    state: &AppState,
    acting_connection: Uuid,
    room_id: &str,
    target: &str,
) -> Option<Vec<Participant>> {
    let acting = identity_of(state, acting_connection).await?;

    let owner = {
        let mut rooms = state.rooms.write().await;
        let room = rooms.get_mut(room_id)?;
        if !room.is_owner(&acting) || room.is_owner(target) {
            return None;
        }
        room.revoke(target);
        room.owner.clone()
    };

    // Force-unbind every connection the removed identity holds in this room.
    let evicted: Vec<Uuid> = {
        let mut registry = state.registry.write().await;
        let targets: Vec<Uuid> = registry
            .connections_for_identity(target)
            .into_iter()
            .filter(|c| registry.is_bound(*c, room_id))
            .collect();
        for connection_id in &targets {
            registry.unbind(*connection_id);
        }
        targets
    };

    {
        let mut presence = state.presence.write().await;
        for connection_id in &evicted {
            presence.remove(room_id, *connection_id);
        }
    }

    for connection_id in &evicted {
        broadcast::to_connection(
            state,
            *connection_id,
            ServerEvent::ParticipantRemoved { room_id: room_id.to_string() },
        )
        .await;
        broadcast::to_room_all(
            state,
            room_id,
            &ServerEvent::DisconnectNotice { connection_id: *connection_id, identity: target.to_string() },
        )
        .await;
    }
    info!(room_id, target, connections = evicted.len(), "participant removed");

    Some(state.registry.read().await.participants_of(room_id, &owner))
}

async fn identity_of(state: &AppState, connection_id: Uuid) -> Option<String> {
    state
        .registry
        .read()
        .await
        .identity_of(connection_id)
        .map(str::to_string)
}

#[cfg(test)]
#[path = "admission_test.rs"]
mod tests;
