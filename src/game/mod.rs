//! Game simulation modules

pub mod archetype;
pub mod combat;
pub mod combatant;
pub mod driver;
pub mod r#match;
pub mod physics;
pub mod snapshot;

pub use archetype::{Archetype, ArchetypeKind, AttackTag, MoveId, MoveKind};
pub use combat::{AttackEntity, AttackSpec, HitVolume};
pub use combatant::{ActionError, ActionState, Combatant, Facing};
pub use driver::{MatchDriver, MatchHandle};
pub use r#match::{GameMatch, MatchError, MatchPhase, MatchState};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-combatant intent snapshot for one frame.
///
/// `up`, `light_attack`, `heavy_attack` and `special_pressed` are edges
/// (pressed this frame); the rest are held state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Intent {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub light_attack: bool,
    pub heavy_attack: bool,
    pub special_pressed: bool,
    pub guard_held: bool,
    pub special_held: bool,
}

impl Intent {
    /// Net horizontal direction; opposing inputs cancel out
    pub fn horizontal(&self) -> Option<Facing> {
        match (self.left, self.right) {
            (true, false) => Some(Facing::Left),
            (false, true) => Some(Facing::Right),
            _ => None,
        }
    }

    /// Drop the edge-triggered fields once they have been consumed
    pub fn clear_edges(&mut self) {
        self.up = false;
        self.light_attack = false;
        self.heavy_attack = false;
        self.special_pressed = false;
    }
}

/// Intent received from an input source
#[derive(Debug, Clone)]
pub struct PlayerInput {
    pub combatant_id: Uuid,
    pub intent: Intent,
}
