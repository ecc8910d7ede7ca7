//! Seeded random input source for headless matches and soak runs

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::game::{Facing, Intent};
use crate::protocol::CombatantSnapshot;

/// Produces plausible button mashing, biased toward walking at the opponent
pub struct RandomInputSource {
    rng: ChaCha8Rng,
}

impl RandomInputSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Intent for one combatant given how it currently stands
    pub fn intent_for(&mut self, combatant: &CombatantSnapshot) -> Intent {
        let forward = self.rng.gen_bool(0.6);
        let backward = !forward && self.rng.gen_bool(0.2);
        let (left, right) = match combatant.facing {
            Facing::Left => (forward, backward),
            Facing::Right => (backward, forward),
        };

        Intent {
            left,
            right,
            up: self.rng.gen_bool(0.03),
            down: self.rng.gen_bool(0.15),
            light_attack: self.rng.gen_bool(0.10),
            heavy_attack: self.rng.gen_bool(0.06),
            special_pressed: self.rng.gen_bool(0.02),
            guard_held: self.rng.gen_bool(0.12),
            special_held: self.rng.gen_bool(0.8),
        }
    }

    /// Intent with no knowledge of the combatant
    pub fn next_intent(&mut self) -> Intent {
        let facing = if self.rng.gen_bool(0.5) {
            Facing::Left
        } else {
            Facing::Right
        };
        let mut intent = Intent {
            left: facing == Facing::Left,
            right: facing == Facing::Right,
            ..Intent::default()
        };
        intent.up = self.rng.gen_bool(0.05);
        intent.down = self.rng.gen_bool(0.2);
        intent.light_attack = self.rng.gen_bool(0.15);
        intent.heavy_attack = self.rng.gen_bool(0.1);
        intent.special_pressed = self.rng.gen_bool(0.05);
        intent.guard_held = self.rng.gen_bool(0.2);
        intent.special_held = self.rng.gen_bool(0.7);
        intent
    }
}
