//! Shared event model for the realtime drawing wire protocol.
//!
//! This crate owns the wire representation used by both the server and any
//! Rust client (including the integration tests, which act as clients).
//! Every message is a tagged JSON object `{"type": "<kind>", "data": ...}`
//! with camelCase payload fields.
//!
//! DESIGN
//! ======
//! - Closed variant sets: anything on the wire that does not match a known
//!   variant shape fails to parse and is dropped by the server.
//! - Snapshots are opaque blobs. The core never decodes pixel content, so
//!   [`Snapshot`] is a transparent newtype over the encoded string.
//! - [`ClientEvent::parse`] layers semantic validation (non-empty paths) on
//!   top of serde's shape checks, so the server boundary stays one call.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// ERRORS
// =============================================================================

/// Error returned by [`ClientEvent::parse`].
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The text was not a known event shape.
    #[error("malformed event: {0}")]
    Malformed(#[from] serde_json::Error),
    /// A `draw-end` arrived with an empty path.
    #[error("draw-end path must not be empty")]
    EmptyPath,
    /// A `draw-move` arrived with an empty point batch.
    #[error("draw-move batch must not be empty")]
    EmptyBatch,
}

// =============================================================================
// PAYLOAD TYPES
// =============================================================================

/// Opaque encoded bitmap capture of the whole canvas (e.g. a data URL).
///
/// The relay core treats this as an immutable binary blob and never decodes
/// it. Blobs run to hundreds of kilobytes, so `Debug` prints only the length.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(String);

impl Snapshot {
    #[must_use]
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// The raw encoded blob.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Snapshot(<{} bytes>)", self.0.len())
    }
}

/// A styled point opening or composing a stroke.
///
/// Coordinates are in logical canvas units (1200x700 space); mapping from
/// display pixels is a client concern and is not validated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokePoint {
    pub x: f64,
    pub y: f64,
    pub color: String,
    pub width: f64,
    pub tool: String,
}

/// A bare coordinate inside an in-progress stroke. Style is carried by the
/// stroke's opening [`StrokePoint`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub x: f64,
    pub y: f64,
}

/// Presence entry for one connected user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub id: Uuid,
    pub username: String,
    pub color: String,
}

// =============================================================================
// CLIENT -> SERVER
// =============================================================================

/// Inbound events, one variant per wire kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Pen down. Ephemeral: relayed, never persisted.
    DrawStart { point: StrokePoint },
    /// Batched in-progress points. Ephemeral.
    DrawMove { points: Vec<PathPoint> },
    /// Pen up with the full stroke path.
    DrawEnd { path: Vec<StrokePoint> },
    CursorMove { x: f64, y: f64 },
    /// Undo. `canvas_state` is the client-computed post-undo snapshot; when
    /// absent the server walks its own history cursor instead.
    Undo {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        canvas_state: Option<Snapshot>,
    },
    /// Redo, mirror of [`ClientEvent::Undo`].
    Redo {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        canvas_state: Option<Snapshot>,
    },
    ClearCanvas {},
}

impl ClientEvent {
    /// Parse and validate one inbound wire message.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] for unknown variants, missing or mistyped
    /// fields, and semantically empty draw payloads. The server drops all of
    /// these silently.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let event: Self = serde_json::from_str(text)?;
        match &event {
            Self::DrawEnd { path } if path.is_empty() => Err(ParseError::EmptyPath),
            Self::DrawMove { points } if points.is_empty() => Err(ParseError::EmptyBatch),
            _ => Ok(event),
        }
    }

    /// Wire name of this event kind, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DrawStart { .. } => "draw-start",
            Self::DrawMove { .. } => "draw-move",
            Self::DrawEnd { .. } => "draw-end",
            Self::CursorMove { .. } => "cursor-move",
            Self::Undo { .. } => "undo",
            Self::Redo { .. } => "redo",
            Self::ClearCanvas {} => "clear-canvas",
        }
    }
}

// =============================================================================
// SERVER -> CLIENT
// =============================================================================

/// Outbound events fanned out by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// First message on every connection: assigned identity plus the room's
    /// current authoritative snapshot (if any).
    Init {
        user_id: Uuid,
        username: String,
        color: String,
        canvas_state: Option<Snapshot>,
    },
    /// Full refreshed roster for the room.
    Users(Vec<MemberInfo>),
    UserJoined(MemberInfo),
    UserLeft(Uuid),
    DrawStart {
        user_id: Uuid,
        point: StrokePoint,
        timestamp: i64,
    },
    DrawMove {
        user_id: Uuid,
        points: Vec<PathPoint>,
        timestamp: i64,
    },
    DrawEnd {
        user_id: Uuid,
        path: Vec<StrokePoint>,
        timestamp: i64,
    },
    CursorMove { user_id: Uuid, x: f64, y: f64 },
    /// Authoritative post-undo state, echoed to the whole room including the
    /// sender so an optimistic local render is silently overwritten if it
    /// diverged.
    Undo {
        user_id: Uuid,
        canvas_state: Option<Snapshot>,
    },
    Redo {
        user_id: Uuid,
        canvas_state: Option<Snapshot>,
    },
    ClearCanvas {},
}

impl ServerEvent {
    /// Wire name of this event kind, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Users(_) => "users",
            Self::UserJoined(_) => "user-joined",
            Self::UserLeft(_) => "user-left",
            Self::DrawStart { .. } => "draw-start",
            Self::DrawMove { .. } => "draw-move",
            Self::DrawEnd { .. } => "draw-end",
            Self::CursorMove { .. } => "cursor-move",
            Self::Undo { .. } => "undo",
            Self::Redo { .. } => "redo",
            Self::ClearCanvas {} => "clear-canvas",
        }
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
