//! Domain services used by the websocket dispatch layer.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the room engine's business logic so the route handlers
//! can stay focused on protocol translation and delivery targeting.

pub mod admission;
pub mod analysis;
pub mod broadcast;
pub mod lifecycle;
pub mod presence;
pub mod room;
