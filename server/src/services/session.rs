//! Session identity — per-connection names and colors.
//!
//! DESIGN
//! ======
//! There is no authentication and no re-identification: a connection IS a
//! user, identified by a fresh v4 UUID for its lifetime. A reconnect is an
//! entirely new user. Display names are generated, not registered, so
//! duplicates are acceptable; colors cycle a fixed palette round-robin.

use std::sync::atomic::Ordering;

use rand::Rng;
use uuid::Uuid;

use crate::state::AppState;

/// Fixed presence palette. After eight users the ninth reuses the first
/// color.
pub const USER_COLORS: &[&str] = &[
    "#ef4444", "#f97316", "#eab308", "#22c55e", "#14b8a6", "#3b82f6", "#8b5cf6", "#ec4899",
];

const NAME_ADJECTIVES: &[&str] = &[
    "Brisk", "Calm", "Daring", "Eager", "Fuzzy", "Gentle", "Jolly", "Lucky", "Mellow", "Nimble",
    "Quiet", "Swift", "Vivid", "Witty",
];

const NAME_NOUNS: &[&str] = &[
    "Otter", "Falcon", "Badger", "Heron", "Lynx", "Marmot", "Puffin", "Newt", "Stoat", "Walrus",
    "Ibis", "Gecko",
];

/// Identity assigned to one connection.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
    pub color: String,
}

/// Generate a human-readable display name, e.g. `BriskOtter42`.
/// Collision-tolerant: uniqueness is not guaranteed or needed.
#[must_use]
pub fn generate_username() -> String {
    let mut rng = rand::rng();
    let adjective = NAME_ADJECTIVES[rng.random_range(0..NAME_ADJECTIVES.len())];
    let noun = NAME_NOUNS[rng.random_range(0..NAME_NOUNS.len())];
    let number = rng.random_range(10..100);
    format!("{adjective}{noun}{number}")
}

/// Next palette color, cycling once the palette is exhausted.
#[must_use]
pub fn next_color(state: &AppState) -> String {
    let index = state.palette_cursor.fetch_add(1, Ordering::Relaxed);
    USER_COLORS[index % USER_COLORS.len()].to_owned()
}

/// Assign a full identity for a new connection.
#[must_use]
pub fn assign_identity(state: &AppState) -> Identity {
    Identity {
        user_id: Uuid::new_v4(),
        username: generate_username(),
        color: next_color(state),
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
