//! Canvas history service — per-room snapshot undo/redo and stroke log.
//!
//! DESIGN
//! ======
//! Each room owns one `DrawingState`: the current authoritative snapshot, a
//! bounded history of committed snapshots with a cursor for undo/redo, and a
//! bounded append-only log of raw stroke operations. Snapshots are opaque
//! client-encoded blobs; the server never inspects them.
//!
//! Stroke completion feeds only the operation log. The snapshot history is
//! fed exclusively by commits: clients decide when a state is a checkpoint
//! (their local undo boundary) and send the resulting snapshot.
//!
//! CONFLICT POLICY
//! ===============
//! Last write wins, in lock-acquisition order. Whatever client timestamps a
//! payload carries are ignored for ordering; the write-guard queue is the
//! authoritative serialization of concurrent commits.

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use uuid::Uuid;

use events::{Snapshot, StrokePoint};

use crate::state::AppState;

/// Maximum committed snapshots retained per room.
pub const HISTORY_CAP: usize = 100;

/// Maximum raw stroke operations retained per room.
pub const OP_LOG_CAP: usize = HISTORY_CAP * 2;

// =============================================================================
// TYPES
// =============================================================================

/// One committed canvas state. `snapshot: None` is the cleared marker.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub snapshot: Option<Snapshot>,
    /// Server arrival time, milliseconds since the Unix epoch.
    pub ts: i64,
}

/// One completed stroke, kept for diagnostics and potential replay. Never
/// consulted for consistency; the log may diverge from the snapshot history
/// after undo/redo.
#[derive(Debug, Clone)]
pub struct StrokeOp {
    pub user_id: Uuid,
    pub path: Vec<StrokePoint>,
    pub ts: i64,
}

/// Per-room drawing state. Created lazily on first mutating touch.
#[derive(Debug, Default)]
pub struct DrawingState {
    /// Authoritative snapshot, always equal to the entry at the cursor
    /// (`None` when the history is empty or the entry is a cleared marker).
    pub current: Option<Snapshot>,
    pub history: Vec<HistoryEntry>,
    /// Index of the current entry. `None` iff the history is empty.
    pub cursor: Option<usize>,
    pub op_log: VecDeque<StrokeOp>,
}

/// Read-only diagnostics view of one room's drawing state.
#[derive(Debug, Clone, Serialize)]
pub struct CanvasStats {
    pub history_len: usize,
    /// Cursor index, `-1` when the history is empty.
    pub history_cursor: i64,
    pub op_count: usize,
    pub can_undo: bool,
    pub can_redo: bool,
    pub has_snapshot: bool,
}

// =============================================================================
// PURE STACK OPERATIONS
// =============================================================================

/// Current time as milliseconds since Unix epoch.
pub(crate) fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

/// Push one entry through the undo-stack discipline: prune the redo branch,
/// append, evict the oldest entry past the cap, leave the cursor at the tip.
fn push_entry(ds: &mut DrawingState, snapshot: Option<Snapshot>, ts: i64) {
    if let Some(cursor) = ds.cursor {
        // Entries past the cursor are an abandoned redo branch.
        ds.history.truncate(cursor + 1);
    }
    ds.history.push(HistoryEntry { snapshot: snapshot.clone(), ts });
    if ds.history.len() > HISTORY_CAP {
        ds.history.remove(0);
    }
    ds.cursor = Some(ds.history.len() - 1);
    ds.current = snapshot;
}

/// Move the cursor one entry back. `None` means the cursor was already at
/// the floor (or the history is empty) and nothing changed.
fn step_back(ds: &mut DrawingState) -> Option<Option<Snapshot>> {
    let cursor = ds.cursor?;
    if cursor == 0 {
        return None;
    }
    ds.cursor = Some(cursor - 1);
    ds.current = ds.history[cursor - 1].snapshot.clone();
    Some(ds.current.clone())
}

/// Move the cursor one entry forward. Mirror of [`step_back`].
fn step_forward(ds: &mut DrawingState) -> Option<Option<Snapshot>> {
    let cursor = ds.cursor?;
    if cursor + 1 >= ds.history.len() {
        return None;
    }
    ds.cursor = Some(cursor + 1);
    ds.current = ds.history[cursor + 1].snapshot.clone();
    Some(ds.current.clone())
}

// =============================================================================
// SERVICE OPERATIONS
// =============================================================================

/// Commit a snapshot as the room's new authoritative state.
///
/// Accepted verbatim: there is no server-side verification that the blob is
/// a valid successor of the prior state. Last write wins.
pub async fn commit_snapshot(state: &AppState, room_id: &str, snapshot: Snapshot) {
    let mut canvases = state.canvases.write().await;
    let ds = canvases.entry(room_id.to_owned()).or_default();
    push_entry(ds, Some(snapshot), now_ms());
}

/// Append a completed stroke to the room's operation log, trimming the
/// oldest entries past the cap.
pub async fn record_operation(state: &AppState, room_id: &str, user_id: Uuid, path: Vec<StrokePoint>) {
    let mut canvases = state.canvases.write().await;
    let ds = canvases.entry(room_id.to_owned()).or_default();
    ds.op_log.push_back(StrokeOp { user_id, path, ts: now_ms() });
    while ds.op_log.len() > OP_LOG_CAP {
        ds.op_log.pop_front();
    }
}

/// Step the room's history cursor back one entry.
///
/// Outer `None` signals a no-op (empty history or cursor at the floor); the
/// inner value is the snapshot now at the cursor, `None` for a cleared
/// marker.
pub async fn undo(state: &AppState, room_id: &str) -> Option<Option<Snapshot>> {
    let mut canvases = state.canvases.write().await;
    let ds = canvases.entry(room_id.to_owned()).or_default();
    step_back(ds)
}

/// Step the room's history cursor forward one entry. Mirror of [`undo`].
pub async fn redo(state: &AppState, room_id: &str) -> Option<Option<Snapshot>> {
    let mut canvases = state.canvases.write().await;
    let ds = canvases.entry(room_id.to_owned()).or_default();
    step_forward(ds)
}

/// Clear the room's canvas: drop the current snapshot, empty the operation
/// log, and push a cleared marker through the same stack discipline as a
/// commit, so the clear itself is undoable.
pub async fn clear_canvas(state: &AppState, room_id: &str) {
    let mut canvases = state.canvases.write().await;
    let ds = canvases.entry(room_id.to_owned()).or_default();
    ds.op_log.clear();
    push_entry(ds, None, now_ms());
}

/// The room's current authoritative snapshot. Read-only; untouched rooms
/// are not vivified.
pub async fn current_snapshot(state: &AppState, room_id: &str) -> Option<Snapshot> {
    let canvases = state.canvases.read().await;
    canvases.get(room_id).and_then(|ds| ds.current.clone())
}

/// Diagnostics counts and flags for one room. Read-only; an untouched room
/// reports the empty view.
pub async fn stats_of(state: &AppState, room_id: &str) -> CanvasStats {
    let canvases = state.canvases.read().await;
    let Some(ds) = canvases.get(room_id) else {
        return CanvasStats {
            history_len: 0,
            history_cursor: -1,
            op_count: 0,
            can_undo: false,
            can_redo: false,
            has_snapshot: false,
        };
    };

    CanvasStats {
        history_len: ds.history.len(),
        history_cursor: ds.cursor.and_then(|c| i64::try_from(c).ok()).unwrap_or(-1),
        op_count: ds.op_log.len(),
        can_undo: ds.cursor.is_some_and(|c| c > 0),
        can_redo: ds.cursor.is_some_and(|c| c + 1 < ds.history.len()),
        has_snapshot: ds.current.is_some(),
    }
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
