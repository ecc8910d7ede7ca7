//! Snapshot building for presentation layers

use crate::protocol::{AttackSnapshot, CombatantSnapshot, GameEvent, MatchSnapshot};

use super::combat::AttackEntity;
use super::combatant::Combatant;
use super::r#match::GameMatch;

/// Throttles snapshots and batches the events between them
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
    /// Events not yet delivered in a snapshot
    pending_events: Vec<GameEvent>,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
            pending_events: Vec::new(),
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (used for important events)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    /// Queue a tick's events for the next snapshot
    pub fn record(&mut self, events: impl IntoIterator<Item = GameEvent>) {
        self.pending_events.extend(events);
    }

    pub fn pending(&self) -> usize {
        self.pending_events.len()
    }

    /// Capture the match and hand over every queued event
    pub fn build(&mut self, game: &GameMatch) -> MatchSnapshot {
        let mut snapshot = capture(game);
        snapshot.events = std::mem::take(&mut self.pending_events);
        snapshot
    }
}

/// Point-in-time view of a match, without events
pub fn capture(game: &GameMatch) -> MatchSnapshot {
    let state = game.state();
    MatchSnapshot {
        match_id: state.id,
        tick: state.tick,
        phase: state.phase,
        countdown_remaining: state.countdown_remaining,
        clock_remaining: state.clock_remaining,
        combatants: game.combatants().iter().map(CombatantSnapshot::from).collect(),
        attacks: game.attacks().iter().map(AttackSnapshot::from).collect(),
        winner_id: state.winner_id,
        loser_id: game.loser_id(),
        outcome: state.outcome,
        events: Vec::new(),
    }
}

impl From<&Combatant> for CombatantSnapshot {
    fn from(c: &Combatant) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            team: c.team,
            health: c.health,
            max_health: c.max_health(),
            meter: c.meter,
            max_meter: c.max_meter(),
            combo_count: c.combo.count,
            combo_multiplier: c.combo.multiplier,
            stunned: c.stunned,
            invulnerable: c.invulnerable,
            state: c.state,
            position: c.body.position,
            velocity: c.body.velocity,
            facing: c.facing,
            on_ground: c.on_ground,
            active: c.active,
            charging: c.charge.map(|charge| charge.move_id),
            last_attack_ms: c.last_attack_ms,
        }
    }
}

impl From<&AttackEntity> for AttackSnapshot {
    fn from(a: &AttackEntity) -> Self {
        Self {
            id: a.id,
            owner_id: a.owner_id,
            move_id: a.move_id,
            position: a.position,
            width: a.width,
            height: a.height,
            rotation: a.rotation(),
        }
    }
}
