//! WebSocket handler — drawing event relay.
//!
//! DESIGN
//! ======
//! On upgrade, assigns an identity and enters a `select!` loop:
//! - Incoming client events → parse + dispatch by variant
//! - Events fanned out by room peers → forward to this client
//!
//! Handler functions validate and mutate state, then return an `Outcome`.
//! The dispatch layer owns all fan-out — handlers never send events
//! directly. Malformed input is dropped without a reply: an untrusted
//! client must not be able to crash or desynchronize the room, and the
//! only user-visible failure mode is a silent lack of effect.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → join room → send `init` (identity + current snapshot)
//! 2. `user-joined` to peers, refreshed `users` roster to the whole room
//! 3. Client events → dispatch → fan out per Outcome
//! 4. Close → leave → `user-left` + refreshed roster to the room

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use events::{ClientEvent, MemberInfo, PathPoint, ServerEvent, Snapshot, StrokePoint};

use crate::services::history::now_ms;
use crate::services::{history, registry, session};
use crate::state::AppState;

/// Room used when a client connects without naming one. Ordinary data, not
/// a special code path: `?room=<id>` selects any other room.
pub const DEFAULT_ROOM: &str = "main";

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer uses this to
/// decide who receives what.
enum Outcome {
    /// Broadcast to the whole room including the sender. Used for
    /// undo/redo/clear: the sender rendered its outcome optimistically, and
    /// the authoritative echo silently overwrites any divergence.
    Room(ServerEvent),
    /// Broadcast to room peers excluding the sender. Used for draw and
    /// cursor traffic the sender already rendered.
    RoomExcludeSender(ServerEvent),
    /// No fan-out: dropped input or a no-op operation.
    Silent,
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let room_id = params
        .get("room")
        .cloned()
        .unwrap_or_else(|| DEFAULT_ROOM.to_owned());
    ws.on_upgrade(move |socket| run_ws(socket, state, room_id))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, room_id: String) {
    let identity = session::assign_identity(&state);

    // Per-connection channel for receiving events fanned out by peers.
    let (client_tx, mut client_rx) = mpsc::channel::<ServerEvent>(256);

    registry::join(
        &state,
        &room_id,
        identity.user_id,
        &identity.username,
        &identity.color,
        client_tx,
    )
    .await;

    // Init carries the authoritative snapshot so late joiners converge.
    let init = ServerEvent::Init {
        user_id: identity.user_id,
        username: identity.username.clone(),
        color: identity.color.clone(),
        canvas_state: history::current_snapshot(&state, &room_id).await,
    };
    if send_event(&mut socket, &init).await.is_err() {
        registry::leave(&state, &room_id, identity.user_id).await;
        return;
    }

    let joined = ServerEvent::UserJoined(MemberInfo {
        id: identity.user_id,
        username: identity.username.clone(),
        color: identity.color.clone(),
    });
    registry::broadcast(&state, &room_id, &joined, Some(identity.user_id)).await;

    let roster = ServerEvent::Users(registry::members_of(&state, &room_id).await);
    registry::broadcast(&state, &room_id, &roster, None).await;

    info!(%room_id, user_id = %identity.user_id, username = %identity.username, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        dispatch_event(&state, &room_id, identity.user_id, &text).await;
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

    // Leave first: the departing user is then excluded from both the
    // user-left announcement and the refreshed roster by construction.
    if registry::leave(&state, &room_id, identity.user_id).await {
        registry::broadcast(&state, &room_id, &ServerEvent::UserLeft(identity.user_id), None).await;
        let roster = ServerEvent::Users(registry::members_of(&state, &room_id).await);
        registry::broadcast(&state, &room_id, &roster, None).await;
    }
    info!(%room_id, user_id = %identity.user_id, "ws: client disconnected");
}

// =============================================================================
// EVENT DISPATCH
// =============================================================================

/// Parse one inbound text message, apply it, fan out the result.
async fn dispatch_event(state: &AppState, room_id: &str, user_id: Uuid, text: &str) {
    let event = match ClientEvent::parse(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(%user_id, error = %e, "ws: dropped invalid inbound event");
            return;
        }
    };

    // Cursor and mid-stroke traffic is too chatty to log per event.
    if !matches!(event, ClientEvent::CursorMove { .. } | ClientEvent::DrawMove { .. }) {
        info!(%room_id, %user_id, kind = event.kind(), "ws: recv event");
    }

    let outcome = match event {
        ClientEvent::DrawStart { point } => handle_draw_start(state, room_id, user_id, point).await,
        ClientEvent::DrawMove { points } => handle_draw_move(state, room_id, user_id, points).await,
        ClientEvent::DrawEnd { path } => handle_draw_end(state, room_id, user_id, path).await,
        ClientEvent::CursorMove { x, y } => {
            Outcome::RoomExcludeSender(ServerEvent::CursorMove { user_id, x, y })
        }
        ClientEvent::Undo { canvas_state } => {
            handle_undo(state, room_id, user_id, canvas_state).await
        }
        ClientEvent::Redo { canvas_state } => {
            handle_redo(state, room_id, user_id, canvas_state).await
        }
        ClientEvent::ClearCanvas {} => {
            history::clear_canvas(state, room_id).await;
            Outcome::Room(ServerEvent::ClearCanvas {})
        }
    };

    match outcome {
        Outcome::Room(event) => registry::broadcast(state, room_id, &event, None).await,
        Outcome::RoomExcludeSender(event) => {
            registry::broadcast(state, room_id, &event, Some(user_id)).await;
        }
        Outcome::Silent => {}
    }
}

// =============================================================================
// DRAW HANDLERS
// =============================================================================

async fn handle_draw_start(
    state: &AppState,
    room_id: &str,
    user_id: Uuid,
    point: StrokePoint,
) -> Outcome {
    registry::begin_stroke(state, room_id, user_id, PathPoint { x: point.x, y: point.y }).await;
    Outcome::RoomExcludeSender(ServerEvent::DrawStart { user_id, point, timestamp: now_ms() })
}

async fn handle_draw_move(
    state: &AppState,
    room_id: &str,
    user_id: Uuid,
    points: Vec<PathPoint>,
) -> Outcome {
    registry::extend_stroke(state, room_id, user_id, &points).await;
    Outcome::RoomExcludeSender(ServerEvent::DrawMove { user_id, points, timestamp: now_ms() })
}

async fn handle_draw_end(
    state: &AppState,
    room_id: &str,
    user_id: Uuid,
    path: Vec<StrokePoint>,
) -> Outcome {
    registry::clear_stroke(state, room_id, user_id).await;
    // Stroke completion feeds only the operation log; snapshot history is
    // fed by client commits (undo/redo), not by strokes.
    history::record_operation(state, room_id, user_id, path.clone()).await;
    Outcome::RoomExcludeSender(ServerEvent::DrawEnd { user_id, path, timestamp: now_ms() })
}

// =============================================================================
// HISTORY HANDLERS
// =============================================================================

async fn handle_undo(
    state: &AppState,
    room_id: &str,
    user_id: Uuid,
    canvas_state: Option<Snapshot>,
) -> Outcome {
    let resulting = match canvas_state {
        // Client-computed post-undo snapshot: committed verbatim, last
        // write wins.
        Some(snapshot) => {
            history::commit_snapshot(state, room_id, snapshot.clone()).await;
            Some(snapshot)
        }
        // No snapshot attached: walk the server-side history cursor.
        None => match history::undo(state, room_id).await {
            Some(snapshot) => snapshot,
            None => return Outcome::Silent,
        },
    };
    Outcome::Room(ServerEvent::Undo { user_id, canvas_state: resulting })
}

async fn handle_redo(
    state: &AppState,
    room_id: &str,
    user_id: Uuid,
    canvas_state: Option<Snapshot>,
) -> Outcome {
    let resulting = match canvas_state {
        Some(snapshot) => {
            history::commit_snapshot(state, room_id, snapshot.clone()).await;
            Some(snapshot)
        }
        None => match history::redo(state, room_id).await {
            Some(snapshot) => snapshot,
            None => return Outcome::Silent,
        },
    };
    Outcome::Room(ServerEvent::Redo { user_id, canvas_state: resulting })
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), ()> {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, kind = event.kind(), "ws: failed to serialize event");
            return Err(());
        }
    };
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
