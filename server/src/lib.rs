//! inkrelay server library.
//!
//! SYSTEM CONTEXT
//! ==============
//! The server relays drawing events between websocket clients sharing a
//! room, and owns the room's canonical canvas history: a bounded snapshot
//! undo/redo stack plus a bounded raw stroke log. Everything lives in
//! memory; a restart starts the world over.
//!
//! Exposed as a library so integration tests can assemble the router and
//! drive it over real sockets.

pub mod routes;
pub mod services;
pub mod state;
