//! Presentation protocol definitions
//! These are the read-only types handed to renderers, audio and UI layers

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::archetype::{AttackTag, MoveId};
use crate::game::combatant::{ActionState, Facing};
use crate::game::r#match::MatchPhase;
use crate::geometry::Vector2;

/// What produced a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum HitSource {
    Melee(AttackTag),
    Special(MoveId),
}

/// How a combatant was taken out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KoCause {
    Knockout,
    RingOut,
}

/// How the match was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    /// Opponent's health reached zero
    Knockout,
    /// Opponent left the ring
    RingOut,
    /// Clock expired with one combatant ahead on health
    TimeUp,
    /// Nobody left standing, or equal health at time up
    Draw,
}

/// Game events (hits, KOs, lifecycle)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum GameEvent {
    /// Countdown finished
    MatchStarted {
        match_id: Uuid,
        tick: u64,
    },

    /// Basic attack swing started
    AttackStarted {
        combatant_id: Uuid,
        attack: AttackTag,
    },

    /// Charge move started
    ChargeStarted {
        combatant_id: Uuid,
        move_id: MoveId,
    },

    /// Attack entity spawned
    SpecialLaunched {
        combatant_id: Uuid,
        attack_id: Uuid,
        move_id: MoveId,
        x: f64,
        y: f64,
        damage: f64,
    },

    /// Hit registered
    Hit {
        attacker_id: Uuid,
        target_id: Uuid,
        source: HitSource,
        damage: f64,
        guarded: bool,
        target_health: f64,
        /// Attacker's combo length after this hit
        combo_count: u32,
        x: f64,
        y: f64,
    },

    /// Health reached zero from a hit
    Knockout {
        combatant_id: Uuid,
        attacker_id: Option<Uuid>,
    },

    /// Combatant left the ring
    RingOut {
        combatant_id: Uuid,
        x: f64,
        y: f64,
    },

    MatchEnded {
        winner_id: Option<Uuid>,
        outcome: MatchOutcome,
    },
}

impl GameEvent {
    /// Audio cue name for this event
    pub fn audio_cue(&self) -> &'static str {
        match self {
            GameEvent::MatchStarted { .. } => "matchStart",
            GameEvent::AttackStarted {
                attack: AttackTag::Light,
                ..
            } => "punch",
            GameEvent::AttackStarted {
                attack: AttackTag::Heavy,
                ..
            } => "kick",
            GameEvent::ChargeStarted { .. } => "charge",
            GameEvent::SpecialLaunched { .. } => "specialLaunch",
            GameEvent::Hit { guarded: true, .. } => "guard",
            GameEvent::Hit { .. } => "hit",
            GameEvent::Knockout { .. } => "ko",
            GameEvent::RingOut { .. } => "ringOut",
            GameEvent::MatchEnded { .. } => "matchEnd",
        }
    }
}

/// Combatant state in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantSnapshot {
    pub id: Uuid,
    pub name: String,
    pub team: u32,
    pub health: f64,
    pub max_health: f64,
    pub meter: f64,
    pub max_meter: f64,
    pub combo_count: u32,
    pub combo_multiplier: f64,
    pub stunned: bool,
    pub invulnerable: bool,
    pub state: ActionState,
    pub position: Vector2,
    pub velocity: Vector2,
    pub facing: Facing,
    pub on_ground: bool,
    pub active: bool,
    /// Move currently being charged
    pub charging: Option<MoveId>,
    /// Match time of the latest basic attack
    pub last_attack_ms: Option<f64>,
}

/// Attack entity state in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackSnapshot {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub move_id: MoveId,
    pub position: Vector2,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
}

/// Post-tick view of a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub match_id: Uuid,
    pub tick: u64,
    pub phase: MatchPhase,
    pub countdown_remaining: f64,
    pub clock_remaining: f64,
    pub combatants: Vec<CombatantSnapshot>,
    pub attacks: Vec<AttackSnapshot>,
    pub winner_id: Option<Uuid>,
    pub loser_id: Option<Uuid>,
    pub outcome: Option<MatchOutcome>,
    /// Events that occurred since the last snapshot
    pub events: Vec<GameEvent>,
}

/// Per-combatant match statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatantStats {
    pub damage_dealt: f64,
    pub damage_taken: f64,
    pub hits_landed: u32,
    pub hits_guarded: u32,
    pub specials_launched: u32,
    pub max_combo: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantReport {
    pub id: Uuid,
    pub name: String,
    pub archetype: String,
    pub final_health: f64,
    pub ko_cause: Option<KoCause>,
    pub stats: CombatantStats,
}

/// Match statistics at end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub match_id: Uuid,
    pub ticks: u64,
    pub duration_secs: f64,
    pub winner_id: Option<Uuid>,
    pub outcome: Option<MatchOutcome>,
    pub combatants: Vec<CombatantReport>,
}
