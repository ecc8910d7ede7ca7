//! Arena Duel - combat core for a real-time two-combatant fighting match
//!
//! The simulation is synchronous and single-writer: a [`game::GameMatch`]
//! owns every combatant and attack entity and advances them one tick at a
//! time. [`game::MatchDriver`] runs it on a tokio interval and publishes
//! snapshots for renderers, audio and UI.

pub mod audio;
pub mod config;
pub mod game;
pub mod geometry;
pub mod input;
pub mod protocol;
pub mod render;
pub mod util;
