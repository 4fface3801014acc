//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One websocket endpoint carries all drawing traffic; a handful of
//! read-only REST endpoints expose room diagnostics. The bundled drawing
//! client is served as static files from `STATIC_DIR`.

pub mod ws;

use std::path::PathBuf;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::services::{history, registry};
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/api/ws", get(ws::handle_ws))
        .route("/api/rooms", get(list_rooms))
        .route("/api/rooms/{id}/stats", get(room_stats))
        .route("/healthz", get(healthz))
        .layer(cors)
        .with_state(state);

    let static_service = ServeDir::new(static_dir()).append_index_html_on_directories(true);
    api.fallback_service(static_service)
}

/// Resolve the directory holding the bundled drawing client.
fn static_dir() -> PathBuf {
    std::env::var("STATIC_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../public"))
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn list_rooms(State(state): State<AppState>) -> Json<Vec<registry::RoomOverview>> {
    Json(registry::overview(&state).await)
}

/// Combined registry + canvas diagnostics for one room. Read-only; an
/// unknown room reports the empty view rather than an error.
#[derive(Debug, Serialize)]
struct RoomStats {
    room_id: String,
    members: usize,
    active_strokes: usize,
    canvas: history::CanvasStats,
}

async fn room_stats(State(state): State<AppState>, Path(room_id): Path<String>) -> Json<RoomStats> {
    Json(RoomStats {
        members: registry::count_of(&state, &room_id).await,
        active_strokes: registry::active_strokes(&state, &room_id).await,
        canvas: history::stats_of(&state, &room_id).await,
        room_id,
    })
}
