//! Match state and the authoritative tick pipeline

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{ArenaConfig, ConfigError};
use crate::geometry::{overlaps_box, point_in_box, RayHit, Vector2};
use crate::protocol::{
    CombatantReport, GameEvent, HitSource, KoCause, MatchOutcome, MatchReport, MatchSnapshot,
};
use crate::render::Renderable;

use super::archetype::{Archetype, ArchetypeKind};
use super::combat::{AttackEntity, AttackSpec, HitOutcome, HitResult, HitVolume, IncomingHit};
use super::combatant::{ActionOutcome, ActionState, Combatant};
use super::physics::PhysicsSystem;
use super::snapshot;
use super::Intent;

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Countdown before start
    Countdown,
    /// Match in progress
    InProgress,
    /// Match ended
    Ended,
}

/// Clock and result bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchState {
    pub id: Uuid,
    pub phase: MatchPhase,
    pub tick: u64,
    pub countdown_remaining: f64,
    pub clock_remaining: f64,
    /// Seconds spent in progress
    pub elapsed: f64,
    pub winner_id: Option<Uuid>,
    pub outcome: Option<MatchOutcome>,
}

impl MatchState {
    pub fn new(arena: &ArenaConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            phase: MatchPhase::Countdown,
            tick: 0,
            countdown_remaining: arena.countdown_secs,
            clock_remaining: arena.match_duration_secs,
            elapsed: 0.0,
            winner_id: None,
            outcome: None,
        }
    }

    /// Match time in milliseconds; combo windows are measured on it
    pub fn now_ms(&self) -> f64 {
        self.elapsed * 1000.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("invalid tick delta {0}")]
    InvalidDelta(f64),

    #[error("unknown combatant {0}")]
    UnknownCombatant(Uuid),

    #[error("a match needs at least two combatants, got {0}")]
    NotEnoughCombatants(usize),

    #[error("malformed attack from {owner}")]
    InvalidAttack { owner: Uuid },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// The authoritative game match
pub struct GameMatch {
    state: MatchState,
    arena: ArenaConfig,
    combatants: Vec<Combatant>,
    attacks: Vec<AttackEntity>,
}

impl GameMatch {
    /// Create a match in its countdown phase
    pub fn new(arena: ArenaConfig, combatants: Vec<Combatant>) -> Result<Self, MatchError> {
        arena.validate()?;
        if combatants.len() < 2 {
            return Err(MatchError::NotEnoughCombatants(combatants.len()));
        }

        let mut game = Self {
            state: MatchState::new(&arena),
            arena,
            combatants,
            attacks: Vec::new(),
        };
        game.update_facing();

        info!(
            match_id = %game.state.id,
            combatants = game.combatants.len(),
            countdown_secs = game.arena.countdown_secs,
            "Match created"
        );
        Ok(game)
    }

    /// Two built-in archetypes on the arena's spawn points
    pub fn duel(
        arena: ArenaConfig,
        left: ArchetypeKind,
        right: ArchetypeKind,
    ) -> Result<Self, MatchError> {
        let [left_spawn, right_spawn] = arena.spawn_points;
        let left = Archetype::for_kind(left);
        let right = Archetype::for_kind(right);

        let combatants = vec![
            Combatant::new(format!("P1 {}", left.name), 0, left, left_spawn)?,
            Combatant::new(format!("P2 {}", right.name), 1, right, right_spawn)?,
        ];
        Self::new(arena, combatants)
    }

    pub fn id(&self) -> Uuid {
        self.state.id
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn phase(&self) -> MatchPhase {
        self.state.phase
    }

    pub fn arena(&self) -> &ArenaConfig {
        &self.arena
    }

    pub fn combatants(&self) -> &[Combatant] {
        &self.combatants
    }

    pub fn attacks(&self) -> &[AttackEntity] {
        &self.attacks
    }

    pub fn combatant(&self, id: Uuid) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.id == id)
    }

    pub fn combatant_mut(&mut self, id: Uuid) -> Option<&mut Combatant> {
        self.combatants.iter_mut().find(|c| c.id == id)
    }

    /// The side that did not win, once there is a winner
    pub fn loser_id(&self) -> Option<Uuid> {
        let winner = self.state.winner_id?;
        self.combatants.iter().map(|c| c.id).find(|id| *id != winner)
    }

    /// Replace a combatant's intent for the next tick
    pub fn set_intent(&mut self, id: Uuid, intent: Intent) -> Result<(), MatchError> {
        let combatant = self
            .combatant_mut(id)
            .ok_or(MatchError::UnknownCombatant(id))?;
        combatant.intent = intent;
        Ok(())
    }

    /// Put an attack entity into play on behalf of `owner_id`
    pub fn spawn_attack(&mut self, owner_id: Uuid, spec: AttackSpec) -> Result<Uuid, MatchError> {
        if !spec.is_valid() {
            return Err(MatchError::InvalidAttack { owner: owner_id });
        }
        let owner = self
            .combatant(owner_id)
            .ok_or(MatchError::UnknownCombatant(owner_id))?;

        let attack = AttackEntity::new(owner_id, owner.team, spec);
        let id = attack.id;
        self.attacks.push(attack);
        Ok(id)
    }

    /// Run a single simulation tick of `dt` seconds
    pub fn tick(&mut self, dt: f64) -> Result<Vec<GameEvent>, MatchError> {
        if !(dt.is_finite() && dt >= 0.0) {
            return Err(MatchError::InvalidDelta(dt));
        }

        let mut events = Vec::new();
        self.state.tick += 1;

        match self.state.phase {
            MatchPhase::Countdown => {
                self.state.countdown_remaining -= dt;
                if self.state.countdown_remaining <= 0.0 {
                    self.state.countdown_remaining = 0.0;
                    self.state.phase = MatchPhase::InProgress;
                    events.push(GameEvent::MatchStarted {
                        match_id: self.state.id,
                        tick: self.state.tick,
                    });
                    info!(match_id = %self.state.id, tick = self.state.tick, "Match started!");
                }
            }
            MatchPhase::InProgress => self.run_tick(dt, &mut events),
            MatchPhase::Ended => {}
        }

        Ok(events)
    }

    fn run_tick(&mut self, dt: f64, events: &mut Vec<GameEvent>) {
        self.state.elapsed += dt;
        let now_ms = self.state.now_ms();

        self.apply_intents(dt, now_ms, events);
        self.update_physics(dt);
        self.check_ring_outs(events);
        self.update_facing();
        self.update_attacks(dt);

        let mut hits = self.resolve_attack_hits();
        hits.extend(self.resolve_melee_hits());
        self.separate_combatants();

        for hit in hits {
            self.record_hit(hit, now_ms, events);
        }

        if self.check_win_condition(events) {
            return;
        }
        self.advance_clock(dt, events);
    }

    /// Timers, intents and payloads
    fn apply_intents(&mut self, dt: f64, now_ms: f64, events: &mut Vec<GameEvent>) {
        let rules = &self.arena.combat;
        let mut launches = Vec::new();

        for combatant in self.combatants.iter_mut().filter(|c| c.active) {
            combatant.update_timers(dt, now_ms, rules);

            let intent = combatant.intent;
            combatant.intent.clear_edges();

            for outcome in combatant.apply_intent(&intent, dt, now_ms) {
                match outcome {
                    ActionOutcome::Basic(attack) => events.push(GameEvent::AttackStarted {
                        combatant_id: combatant.id,
                        attack,
                    }),
                    ActionOutcome::ChargeStarted(move_id) => events.push(GameEvent::ChargeStarted {
                        combatant_id: combatant.id,
                        move_id,
                    }),
                    ActionOutcome::Launch(spec) => launches.push((combatant.id, combatant.team, spec)),
                }
            }

            combatant.refresh_hit_volumes();
        }

        for (owner_id, team, spec) in launches {
            self.launch(owner_id, team, spec, events);
        }
    }

    fn launch(&mut self, owner_id: Uuid, team: u32, spec: AttackSpec, events: &mut Vec<GameEvent>) {
        if !spec.is_valid() {
            warn!(match_id = %self.state.id, owner = %owner_id, "Dropping malformed attack payload");
            return;
        }

        let attack = AttackEntity::new(owner_id, team, spec);
        debug!(
            match_id = %self.state.id,
            owner = %owner_id,
            move_id = ?attack.move_id,
            damage = attack.damage,
            "Special launched"
        );
        events.push(GameEvent::SpecialLaunched {
            combatant_id: owner_id,
            attack_id: attack.id,
            move_id: attack.move_id,
            x: attack.position.x,
            y: attack.position.y,
            damage: attack.damage,
        });

        if let Some(owner) = self.combatant_mut(owner_id) {
            owner.stats.specials_launched += 1;
        }
        self.attacks.push(attack);
    }

    /// Integrate, then clamp to the ground plane and arena bounds
    fn update_physics(&mut self, dt: f64) {
        let arena = &self.arena;

        for combatant in self.combatants.iter_mut().filter(|c| c.active) {
            PhysicsSystem::integrate(&mut combatant.body, dt);
            if !combatant.on_ground {
                PhysicsSystem::apply_gravity(&mut combatant.body, arena.gravity, dt);
            }
            combatant.apply_state_damping(dt);

            let grounded = PhysicsSystem::clamp_to_ground(
                &mut combatant.body,
                combatant.archetype.height / 2.0,
                arena.ground_y,
            );
            combatant.set_ground_contact(grounded);

            PhysicsSystem::clamp_to_bounds(
                &mut combatant.body,
                combatant.archetype.width,
                combatant.archetype.height,
                &arena.bounds,
            );
        }
    }

    fn check_ring_outs(&mut self, events: &mut Vec<GameEvent>) {
        let ring = self.arena.ring_out;

        for combatant in self.combatants.iter_mut().filter(|c| c.active) {
            let position = combatant.position();
            if !PhysicsSystem::is_ring_out(position, &ring) {
                continue;
            }

            combatant.apply_lethal();
            events.push(GameEvent::RingOut {
                combatant_id: combatant.id,
                x: position.x,
                y: position.y,
            });
            info!(
                match_id = %self.state.id,
                combatant = %combatant.name,
                x = position.x,
                y = position.y,
                "Ring out"
            );
        }
    }

    /// Non-attacking combatants turn toward their nearest active opponent
    fn update_facing(&mut self) {
        let positions: Vec<(Uuid, u32, Vector2)> = self
            .combatants
            .iter()
            .filter(|c| c.active)
            .map(|c| (c.id, c.team, c.position()))
            .collect();

        for combatant in self.combatants.iter_mut().filter(|c| c.active) {
            let here = combatant.position();
            let nearest = positions
                .iter()
                .filter(|(id, team, _)| *id != combatant.id && *team != combatant.team)
                .min_by(|a, b| {
                    here.distance(a.2)
                        .partial_cmp(&here.distance(b.2))
                        .unwrap_or(Ordering::Equal)
                });

            if let Some((_, _, target)) = nearest {
                combatant.face_towards(target.x);
            }
        }
    }

    /// Advance attack entities; drop expired ones and those out of the world
    fn update_attacks(&mut self, dt: f64) {
        let world = self.arena.world_bounds;
        for attack in &mut self.attacks {
            if !attack.update(dt) || !point_in_box(attack.position, &world) {
                attack.active = false;
            }
        }
        self.attacks.retain(|a| a.active);
    }

    /// Attack entities against hurt volumes
    fn resolve_attack_hits(&mut self) -> Vec<HitResult> {
        let match_id = self.state.id;
        let rules = &self.arena.combat;
        let mut hits = Vec::new();

        for attack in self.attacks.iter_mut() {
            for target in self.combatants.iter_mut() {
                if !attack.active {
                    break;
                }
                if !target.active || target.state == ActionState::Defeated {
                    continue;
                }
                if !attack.can_hit(target.id, target.team) {
                    continue;
                }
                if !overlaps_box(&attack.bounds(), &target.hurtbox()) {
                    continue;
                }

                let incoming = IncomingHit {
                    attacker_id: Some(attack.owner_id),
                    source_position: attack.position,
                    damage: attack.damage,
                    knockback: attack.knockback,
                    blockable: attack.blockable,
                };

                match target.take_damage(&incoming, rules) {
                    Ok(HitOutcome::Landed(applied)) => {
                        let counts_for_combo = attack.register_hit();
                        hits.push(HitResult {
                            attacker_id: attack.owner_id,
                            target_id: target.id,
                            source: HitSource::Special(attack.move_id),
                            applied,
                            position: target.position(),
                            counts_for_combo,
                        });
                    }
                    Ok(HitOutcome::Ignored) => {}
                    Err(error) => {
                        debug!(match_id = %match_id, %error, "Attack hit refused");
                    }
                }
            }
        }

        self.attacks.retain(|a| a.active);
        hits
    }

    /// Hit volumes against hurt volumes for every ordered pair. Volumes are
    /// captured up front so both sides of a trade land.
    fn resolve_melee_hits(&mut self) -> Vec<HitResult> {
        let match_id = self.state.id;
        let volumes: Vec<(usize, Uuid, u32, Vector2, HitVolume)> = self
            .combatants
            .iter()
            .enumerate()
            .filter(|(_, c)| c.active)
            .flat_map(|(i, c)| {
                c.hit_volumes
                    .iter()
                    .map(move |volume| (i, c.id, c.team, c.position(), *volume))
            })
            .collect();

        let mut hits = Vec::new();
        for (attacker_idx, attacker_id, team, origin, volume) in volumes {
            let area = volume.world_area(origin);

            for target_idx in 0..self.combatants.len() {
                if target_idx == attacker_idx {
                    continue;
                }
                let target = &self.combatants[target_idx];
                if !target.active || target.state == ActionState::Defeated || target.team == team {
                    continue;
                }
                if self.combatants[attacker_idx].has_struck(target.id) {
                    continue;
                }
                if !overlaps_box(&area, &target.hurtbox()) {
                    continue;
                }

                let target_id = target.id;
                let incoming = IncomingHit {
                    attacker_id: Some(attacker_id),
                    source_position: origin,
                    damage: volume.damage,
                    knockback: volume.knockback,
                    blockable: true,
                };

                match self.combatants[target_idx].take_damage(&incoming, &self.arena.combat) {
                    Ok(HitOutcome::Landed(applied)) => {
                        self.combatants[attacker_idx].mark_struck(target_id);
                        hits.push(HitResult {
                            attacker_id,
                            target_id,
                            source: HitSource::Melee(volume.tag),
                            applied,
                            position: self.combatants[target_idx].position(),
                            counts_for_combo: true,
                        });
                    }
                    Ok(HitOutcome::Ignored) => {}
                    Err(error) => {
                        debug!(match_id = %match_id, %error, "Melee hit refused");
                    }
                }
            }
        }

        hits
    }

    /// Soft-body push-apart of overlapping combatants
    fn separate_combatants(&mut self) {
        let count = self.combatants.len();
        for i in 0..count {
            for j in (i + 1)..count {
                let (head, tail) = self.combatants.split_at_mut(j);
                let (a, b) = (&mut head[i], &mut tail[0]);
                if !a.active || !b.active {
                    continue;
                }
                if overlaps_box(&a.hurtbox(), &b.hurtbox()) {
                    PhysicsSystem::push_apart(
                        &mut a.body,
                        a.archetype.width,
                        &mut b.body,
                        b.archetype.width,
                    );
                }
            }
        }
    }

    /// Combo bookkeeping, stats and events for one landed hit
    fn record_hit(&mut self, hit: HitResult, now_ms: f64, events: &mut Vec<GameEvent>) {
        let rules = &self.arena.combat;

        let combo_count = match self.combatants.iter_mut().find(|c| c.id == hit.attacker_id) {
            Some(attacker) => {
                if hit.counts_for_combo {
                    attacker.combo.register_hit(now_ms, rules);
                }
                attacker.stats.damage_dealt += hit.applied.damage;
                attacker.stats.hits_landed += 1;
                attacker.stats.max_combo = attacker.stats.max_combo.max(attacker.combo.best);
                attacker.combo.count
            }
            None => 0,
        };

        if hit.applied.guarded {
            if let Some(target) = self.combatant_mut(hit.target_id) {
                target.stats.hits_guarded += 1;
            }
        }

        debug!(
            match_id = %self.state.id,
            attacker = %hit.attacker_id,
            target = %hit.target_id,
            source = ?hit.source,
            damage = hit.applied.damage,
            guarded = hit.applied.guarded,
            combo = combo_count,
            "Hit"
        );
        events.push(GameEvent::Hit {
            attacker_id: hit.attacker_id,
            target_id: hit.target_id,
            source: hit.source,
            damage: hit.applied.damage,
            guarded: hit.applied.guarded,
            target_health: hit.applied.remaining_health,
            combo_count,
            x: hit.position.x,
            y: hit.position.y,
        });

        if hit.applied.defeated {
            info!(match_id = %self.state.id, combatant = %hit.target_id, "Knockout");
            events.push(GameEvent::Knockout {
                combatant_id: hit.target_id,
                attacker_id: Some(hit.attacker_id),
            });
        }
    }

    /// End the match when at most one combatant has health left
    fn check_win_condition(&mut self, events: &mut Vec<GameEvent>) -> bool {
        let mut survivors = self.combatants.iter().filter(|c| c.health > 0.0);
        let winner = survivors.next().map(|c| c.id);
        if survivors.next().is_some() {
            return false;
        }

        let outcome = match winner {
            None => MatchOutcome::Draw,
            Some(_) => match self.combatants.iter().find_map(|c| c.ko_cause) {
                Some(KoCause::RingOut) => MatchOutcome::RingOut,
                _ => MatchOutcome::Knockout,
            },
        };
        self.end_match(winner, outcome, events);
        true
    }

    /// Time up: higher health wins, a tie is a draw
    fn advance_clock(&mut self, dt: f64, events: &mut Vec<GameEvent>) {
        self.state.clock_remaining -= dt;
        if self.state.clock_remaining > 0.0 {
            return;
        }
        self.state.clock_remaining = 0.0;

        let top = self
            .combatants
            .iter()
            .map(|c| c.health)
            .fold(f64::NEG_INFINITY, f64::max);
        let mut leaders = self.combatants.iter().filter(|c| c.health == top);
        let leader = leaders.next().map(|c| c.id);
        let winner = if leaders.next().is_some() { None } else { leader };

        let outcome = match winner {
            Some(_) => MatchOutcome::TimeUp,
            None => MatchOutcome::Draw,
        };
        self.end_match(winner, outcome, events);
    }

    fn end_match(&mut self, winner: Option<Uuid>, outcome: MatchOutcome, events: &mut Vec<GameEvent>) {
        self.state.phase = MatchPhase::Ended;
        self.state.winner_id = winner;
        self.state.outcome = Some(outcome);

        for combatant in &mut self.combatants {
            combatant.deactivate();
        }
        self.attacks.clear();

        events.push(GameEvent::MatchEnded {
            winner_id: winner,
            outcome,
        });
        info!(
            match_id = %self.state.id,
            winner = ?winner,
            outcome = ?outcome,
            elapsed_secs = self.state.elapsed,
            "Match ended"
        );
    }

    /// Active combatants whose bounding box a ray touches, nearest first
    pub fn raycast(
        &self,
        origin: Vector2,
        direction: Vector2,
        max_distance: f64,
    ) -> Vec<RayHit<'_, Combatant>> {
        crate::geometry::raycast(
            origin,
            direction,
            max_distance,
            self.combatants.iter().filter(|c| c.active),
        )
    }

    /// Everything a renderer should draw this frame
    pub fn renderables(&self) -> impl Iterator<Item = &dyn Renderable> + '_ {
        self.combatants
            .iter()
            .map(|c| c as &dyn Renderable)
            .chain(self.attacks.iter().map(|a| a as &dyn Renderable))
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        snapshot::capture(self)
    }

    /// Build match stats
    pub fn report(&self) -> MatchReport {
        MatchReport {
            match_id: self.state.id,
            ticks: self.state.tick,
            duration_secs: self.state.elapsed,
            winner_id: self.state.winner_id,
            outcome: self.state.outcome,
            combatants: self
                .combatants
                .iter()
                .map(|c| CombatantReport {
                    id: c.id,
                    name: c.name.clone(),
                    archetype: c.archetype.name.clone(),
                    final_health: c.health,
                    ko_cause: c.ko_cause,
                    stats: c.stats.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::archetype::MoveId;
    use crate::game::combatant::Facing;
    use crate::geometry::Aabb;

    const DT: f64 = 1.0 / 60.0;

    fn brawler(name: &str, team: u32, x: f64) -> Combatant {
        Combatant::new(
            name,
            team,
            Archetype::for_kind(ArchetypeKind::Brawler),
            Vector2::new(x, 460.0),
        )
        .expect("valid archetype")
    }

    fn started(arena: ArenaConfig, a_x: f64, b_x: f64) -> (GameMatch, Uuid, Uuid) {
        let a = brawler("A", 0, a_x);
        let b = brawler("B", 1, b_x);
        let (a_id, b_id) = (a.id, b.id);
        let mut game = GameMatch::new(
            ArenaConfig {
                countdown_secs: 0.0,
                ..arena
            },
            vec![a, b],
        )
        .expect("valid match");
        game.tick(DT).expect("start tick");
        assert_eq!(game.phase(), MatchPhase::InProgress);
        (game, a_id, b_id)
    }

    fn blast(at: Vector2, piercing: bool) -> AttackSpec {
        AttackSpec {
            move_id: MoveId::KiBlast,
            position: at,
            velocity: Vector2::ZERO,
            width: 20.0,
            height: 20.0,
            damage: 25.0,
            knockback: Vector2::ZERO,
            lifetime: 2.0,
            piercing,
            blockable: true,
            color: 0,
        }
    }

    fn count_hits(events: &[GameEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, GameEvent::Hit { .. }))
            .count()
    }

    #[test]
    fn countdown_then_start() {
        let a = brawler("A", 0, 300.0);
        let b = brawler("B", 1, 700.0);
        let mut game = GameMatch::new(ArenaConfig::default(), vec![a, b]).expect("valid match");

        assert!(game.tick(1.0).expect("tick").is_empty());
        assert!(game.tick(1.0).expect("tick").is_empty());
        assert_eq!(game.phase(), MatchPhase::Countdown);

        let events = game.tick(1.0).expect("tick");
        assert_eq!(game.phase(), MatchPhase::InProgress);
        assert!(matches!(events.as_slice(), [GameEvent::MatchStarted { .. }]));
        assert_eq!(game.state().elapsed, 0.0);
    }

    #[test]
    fn rejects_bad_delta_without_advancing() {
        let (mut game, _, _) = started(ArenaConfig::default(), 300.0, 700.0);
        let tick = game.state().tick;
        assert!(matches!(game.tick(-0.1), Err(MatchError::InvalidDelta(_))));
        assert!(game.tick(f64::NAN).is_err());
        assert_eq!(game.state().tick, tick);
    }

    #[test]
    fn single_combatant_is_a_config_error() {
        let result = GameMatch::new(ArenaConfig::default(), vec![brawler("A", 0, 300.0)]);
        assert!(matches!(result, Err(MatchError::NotEnoughCombatants(1))));
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let (mut game, a, _) = started(ArenaConfig::default(), 300.0, 700.0);
        let stranger = Uuid::new_v4();
        assert!(matches!(
            game.set_intent(stranger, Intent::default()),
            Err(MatchError::UnknownCombatant(id)) if id == stranger
        ));

        let mut bad = blast(Vector2::new(600.0, 460.0), false);
        bad.damage = -1.0;
        assert!(matches!(
            game.spawn_attack(a, bad),
            Err(MatchError::InvalidAttack { .. })
        ));
        assert!(game.attacks().is_empty());
    }

    #[test]
    fn combatants_face_each_other() {
        let (game, a, b) = started(ArenaConfig::default(), 700.0, 300.0);
        assert_eq!(game.combatant(a).map(|c| c.facing), Some(Facing::Left));
        assert_eq!(game.combatant(b).map(|c| c.facing), Some(Facing::Right));
    }

    #[test]
    fn non_piercing_attack_hits_once() {
        let (mut game, a, b) = started(ArenaConfig::default(), 300.0, 600.0);
        game.spawn_attack(a, blast(Vector2::new(590.0, 460.0), false))
            .expect("valid attack");

        let mut hits = 0;
        for _ in 0..40 {
            hits += count_hits(&game.tick(DT).expect("tick"));
        }

        assert_eq!(hits, 1);
        assert!(game.attacks().is_empty());
        assert_eq!(game.combatant(b).map(|c| c.health), Some(75.0));
    }

    #[test]
    fn piercing_attack_credits_combo_once() {
        let (mut game, a, b) = started(ArenaConfig::default(), 300.0, 600.0);
        game.spawn_attack(a, blast(Vector2::new(600.0, 460.0), true))
            .expect("valid attack");

        let mut hits = 0;
        for _ in 0..45 {
            hits += count_hits(&game.tick(DT).expect("tick"));
        }

        assert!(hits >= 2, "piercing attack should hit again after hitstun");
        assert_eq!(game.attacks().len(), 1);
        assert_eq!(game.combatant(a).map(|c| c.combo.count), Some(1));
        assert!(game.combatant(b).map(|c| c.health).unwrap_or(100.0) <= 50.0);
    }

    #[test]
    fn ring_out_is_lethal_through_invulnerability() {
        let arena = ArenaConfig {
            ring_out: Aabb::new(300.0, -1.0e6, 1200.0, 650.0),
            ..ArenaConfig::default()
        };
        let (mut game, a, b) = started(arena, 400.0, 700.0);
        if let Some(c) = game.combatant_mut(a) {
            c.invulnerable = true;
            c.body.position.x = 200.0;
        }

        let events = game.tick(DT).expect("tick");

        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::RingOut { combatant_id, .. } if *combatant_id == a)));
        assert_eq!(game.combatant(a).map(|c| c.health), Some(0.0));
        assert_eq!(game.phase(), MatchPhase::Ended);
        assert_eq!(game.state().winner_id, Some(b));
        assert_eq!(game.state().outcome, Some(MatchOutcome::RingOut));
        assert!(game.combatants().iter().all(|c| !c.active));
    }

    #[test]
    fn double_knockout_is_a_draw() {
        let (mut game, a, b) = started(ArenaConfig::default(), 300.0, 700.0);
        for id in [a, b] {
            if let Some(c) = game.combatant_mut(id) {
                c.health = 0.0;
            }
        }
        game.tick(DT).expect("tick");
        assert_eq!(game.phase(), MatchPhase::Ended);
        assert_eq!(game.state().winner_id, None);
        assert_eq!(game.state().outcome, Some(MatchOutcome::Draw));
    }

    #[test]
    fn equal_health_at_time_up_is_a_draw() {
        let arena = ArenaConfig {
            match_duration_secs: 0.5,
            ..ArenaConfig::default()
        };
        let (mut game, _, _) = started(arena, 300.0, 700.0);
        for _ in 0..40 {
            game.tick(DT).expect("tick");
        }
        assert_eq!(game.phase(), MatchPhase::Ended);
        assert_eq!(game.state().outcome, Some(MatchOutcome::Draw));
        assert_eq!(game.loser_id(), None);
    }

    #[test]
    fn overlapping_combatants_are_pushed_apart() {
        let (mut game, a, b) = started(ArenaConfig::default(), 500.0, 530.0);
        game.tick(DT).expect("tick");
        let ax = game.combatant(a).map(|c| c.position().x).unwrap_or_default();
        let bx = game.combatant(b).map(|c| c.position().x).unwrap_or_default();
        assert!(bx - ax >= 60.0 - 1e-9);
    }

    #[test]
    fn guarded_melee_from_the_front() {
        let (mut game, a, b) = started(ArenaConfig::default(), 500.0, 560.0);
        game.tick(DT).expect("settle onto the ground");

        game.set_intent(
            b,
            Intent {
                guard_held: true,
                ..Intent::default()
            },
        )
        .expect("known combatant");
        game.tick(DT).expect("tick");
        assert_eq!(game.combatant(b).map(|c| c.state), Some(ActionState::Guarding));

        game.set_intent(
            b,
            Intent {
                guard_held: true,
                ..Intent::default()
            },
        )
        .expect("known combatant");
        game.set_intent(
            a,
            Intent {
                light_attack: true,
                ..Intent::default()
            },
        )
        .expect("known combatant");
        let events = game.tick(DT).expect("tick");

        let guarded = events.iter().find_map(|e| match e {
            GameEvent::Hit {
                guarded, damage, ..
            } => Some((*guarded, *damage)),
            _ => None,
        });
        assert_eq!(guarded, Some((true, 3.0)));
        assert!(game.combatant(b).map(|c| c.meter).unwrap_or_default() >= 5.0);
    }

    #[test]
    fn raycast_reports_nearest_first() {
        let (game, a, b) = started(ArenaConfig::default(), 300.0, 700.0);
        let hits = game.raycast(Vector2::new(60.0, 460.0), Vector2::new(1.0, 0.0), 2000.0);
        let ids: Vec<Uuid> = hits.iter().map(|h| h.target.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn report_lists_every_combatant() {
        let (game, _, _) = started(ArenaConfig::default(), 300.0, 700.0);
        let report = game.report();
        assert_eq!(report.combatants.len(), 2);
        assert_eq!(report.outcome, None);
        assert_eq!(game.renderables().count(), 2);
    }
}
