//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds two keyed maps: room membership (owned by the registry service) and
//! per-room drawing state (owned by the history service). Both are mutated
//! only under their `RwLock` write guards, one handler at a time, so
//! mutations for a room are serialized in arrival order and never
//! interleave.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::time::Instant;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use events::{PathPoint, ServerEvent};

use crate::services::history::DrawingState;

// =============================================================================
// ROOM MEMBER
// =============================================================================

/// One connected user, owned by its room entry for the connection's
/// lifetime.
pub struct RoomMember {
    /// Generated display name. Duplicates are permitted; the user id is the
    /// real identity.
    pub username: String,
    /// Presence color assigned round-robin from the fixed palette.
    pub color: String,
    /// Sender for outgoing events to this connection.
    pub tx: mpsc::Sender<ServerEvent>,
    /// In-progress stroke buffer. `None` between strokes; discarded with the
    /// member on disconnect.
    pub current_stroke: Option<Vec<PathPoint>>,
}

// =============================================================================
// ROOM STATE
// =============================================================================

/// Per-room membership. Created lazily on first reference; destroyed only by
/// the idle sweep.
pub struct RoomState {
    pub members: HashMap<Uuid, RoomMember>,
    pub created_at: Instant,
}

impl RoomState {
    #[must_use]
    pub fn new() -> Self {
        Self { members: HashMap::new(), created_at: Instant::now() }
    }
}

impl Default for RoomState {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state. Clone is required by Axum — all inner fields
/// are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    /// Room membership, keyed by room id.
    pub rooms: Arc<RwLock<HashMap<String, RoomState>>>,
    /// Canvas history, keyed by room id.
    pub canvases: Arc<RwLock<HashMap<String, DrawingState>>>,
    /// Monotonic counter backing round-robin palette assignment.
    pub palette_cursor: Arc<AtomicUsize>,
}

impl AppState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            canvases: Arc::new(RwLock::new(HashMap::new())),
            palette_cursor: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
