//! Room registry — membership bookkeeping, fan-out, and idle-room sweep.
//!
//! DESIGN
//! ======
//! Rooms are created lazily on first reference and destroyed only by the
//! idle sweep: an empty room survives for at least the idle threshold so a
//! brief all-disconnect window (page refresh) does not wipe it. Membership
//! mutations happen under one write guard per call, so a room's member set
//! changes in arrival order.
//!
//! ERROR HANDLING
//! ==============
//! Nothing here raises. Leaving an unknown room or user is a no-op, and a
//! recipient whose channel is full is skipped rather than awaited, so one
//! slow client can never block delivery to the rest of the room.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use events::{MemberInfo, PathPoint, ServerEvent};

use crate::state::{AppState, RoomMember};

const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
const DEFAULT_MAX_IDLE_SECS: u64 = 300;

// =============================================================================
// MEMBERSHIP
// =============================================================================

/// Add a user to a room, creating the room if absent. Idempotent upsert:
/// rejoining replaces the member entry.
pub async fn join(
    state: &AppState,
    room_id: &str,
    user_id: Uuid,
    username: &str,
    color: &str,
    tx: mpsc::Sender<ServerEvent>,
) {
    let mut rooms = state.rooms.write().await;
    let room = rooms.entry(room_id.to_owned()).or_default();
    room.members.insert(
        user_id,
        RoomMember {
            username: username.to_owned(),
            color: color.to_owned(),
            tx,
            current_stroke: None,
        },
    );
    info!(%room_id, %user_id, members = room.members.len(), "user joined room");
}

/// Remove a user from a room. Returns whether a removal occurred; unknown
/// rooms and users are no-ops. The room itself survives empty until the
/// idle sweep collects it.
pub async fn leave(state: &AppState, room_id: &str, user_id: Uuid) -> bool {
    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get_mut(room_id) else {
        return false;
    };
    let removed = room.members.remove(&user_id).is_some();
    if removed {
        info!(%room_id, %user_id, remaining = room.members.len(), "user left room");
    }
    removed
}

/// Snapshot of the room's current members. Empty for absent rooms; callers
/// must not assume any ordering.
pub async fn members_of(state: &AppState, room_id: &str) -> Vec<MemberInfo> {
    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(room_id) else {
        return Vec::new();
    };
    room.members
        .iter()
        .map(|(id, member)| MemberInfo {
            id: *id,
            username: member.username.clone(),
            color: member.color.clone(),
        })
        .collect()
}

/// Number of members currently in a room.
pub async fn count_of(state: &AppState, room_id: &str) -> usize {
    let rooms = state.rooms.read().await;
    rooms.get(room_id).map_or(0, |room| room.members.len())
}

/// Identifiers of every live room.
pub async fn all_rooms(state: &AppState) -> Vec<String> {
    let rooms = state.rooms.read().await;
    rooms.keys().cloned().collect()
}

/// Summary row for the diagnostics listing.
#[derive(Debug, Clone, Serialize)]
pub struct RoomOverview {
    pub id: String,
    pub members: usize,
    pub created_age_ms: u128,
}

/// Summaries of every live room.
pub async fn overview(state: &AppState) -> Vec<RoomOverview> {
    let rooms = state.rooms.read().await;
    rooms
        .iter()
        .map(|(id, room)| RoomOverview {
            id: id.clone(),
            members: room.members.len(),
            created_age_ms: room.created_at.elapsed().as_millis(),
        })
        .collect()
}

// =============================================================================
// STROKE BUFFER
// =============================================================================

/// Open a member's in-progress stroke buffer at the given point.
pub async fn begin_stroke(state: &AppState, room_id: &str, user_id: Uuid, point: PathPoint) {
    let mut rooms = state.rooms.write().await;
    if let Some(member) = rooms.get_mut(room_id).and_then(|room| room.members.get_mut(&user_id)) {
        member.current_stroke = Some(vec![point]);
    }
}

/// Extend a member's in-progress stroke buffer. Points arriving without a
/// preceding draw-start open the buffer.
pub async fn extend_stroke(state: &AppState, room_id: &str, user_id: Uuid, points: &[PathPoint]) {
    let mut rooms = state.rooms.write().await;
    if let Some(member) = rooms.get_mut(room_id).and_then(|room| room.members.get_mut(&user_id)) {
        member.current_stroke.get_or_insert_with(Vec::new).extend_from_slice(points);
    }
}

/// Close a member's in-progress stroke buffer.
pub async fn clear_stroke(state: &AppState, room_id: &str, user_id: Uuid) {
    let mut rooms = state.rooms.write().await;
    if let Some(member) = rooms.get_mut(room_id).and_then(|room| room.members.get_mut(&user_id)) {
        member.current_stroke = None;
    }
}

/// Number of members currently mid-stroke, for diagnostics.
pub async fn active_strokes(state: &AppState, room_id: &str) -> usize {
    let rooms = state.rooms.read().await;
    rooms.get(room_id).map_or(0, |room| {
        room.members.values().filter(|m| m.current_stroke.is_some()).count()
    })
}

// =============================================================================
// BROADCAST
// =============================================================================

/// Deliver an event to every member of a room, optionally excluding one
/// (the sender, for events the originator already rendered locally).
pub async fn broadcast(state: &AppState, room_id: &str, event: &ServerEvent, exclude: Option<Uuid>) {
    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(room_id) else {
        return;
    };

    for (user_id, member) in &room.members {
        if exclude == Some(*user_id) {
            continue;
        }
        // Best-effort: if a client's channel is full, skip it.
        let _ = member.tx.try_send(event.clone());
    }
}

// =============================================================================
// IDLE SWEEP
// =============================================================================

/// Remove rooms that are empty AND were created more than `max_age` ago,
/// along with their drawing state. Populated rooms are never removed,
/// regardless of age. Returns the number of rooms removed.
pub async fn sweep_idle_empty_rooms(state: &AppState, max_age: Duration) -> usize {
    // Lock order: rooms before canvases, so a join racing this sweep cannot
    // resurrect a room whose canvas is about to be dropped.
    let mut rooms = state.rooms.write().await;
    let mut canvases = state.canvases.write().await;

    let stale: Vec<String> = rooms
        .iter()
        .filter(|(_, room)| room.members.is_empty() && room.created_at.elapsed() >= max_age)
        .map(|(id, _)| id.clone())
        .collect();

    for id in &stale {
        rooms.remove(id);
        canvases.remove(id);
    }

    if !stale.is_empty() {
        info!(removed = stale.len(), "swept idle empty rooms");
    }
    stale.len()
}

/// Spawn the background sweep task. Returns a handle for shutdown.
pub fn spawn_sweep_task(state: AppState) -> JoinHandle<()> {
    let interval_secs = env_parse("ROOM_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS);
    let max_idle_secs = env_parse("ROOM_MAX_IDLE_SECS", DEFAULT_MAX_IDLE_SECS);
    info!(interval_secs, max_idle_secs, "idle room sweep configured");
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(interval_secs)).await;
            sweep_idle_empty_rooms(&state, Duration::from_secs(max_idle_secs)).await;
        }
    })
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
