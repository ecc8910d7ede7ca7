//! Combatant state machine
//!
//! One authoritative combatant: body, resources, the discrete
//! [`ActionState`] and every timer that moves it. Intents that are illegal in
//! the current state are refused with an [`ActionError`] and leave the
//! combatant untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{CombatRules, ConfigError};
use crate::geometry::{Aabb, Bounded, Vector2};
use crate::protocol::{CombatantStats, KoCause};

use super::archetype::{
    Archetype, AttackTag, BurstSpec, ChargeSpec, MoveId, MoveKind, ProjectileSpec,
};
use super::combat::{
    AppliedHit, AttackSpec, CombatSystem, ComboTracker, HitOutcome, HitVolume, HitVolumes,
    IncomingHit, HITSTUN_SECS, SPECIAL_RECOVERY_SECS,
};
use super::physics::{
    Kinematics, PhysicsSystem, AIR_DASH_FACTOR, DEFEATED_DAMPING, GUARD_DAMPING, IDLE_DAMPING,
};
use super::Intent;

/// Discrete action state. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    Idle,
    Walking,
    Jumping,
    Attacking,
    Guarding,
    Hitstun,
    Defeated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    pub fn sign(self) -> f64 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }
}

/// Why an intent was refused
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("combatant is stunned")]
    Stunned,

    #[error("combatant is defeated")]
    Defeated,

    #[error("combatant is no longer in the match")]
    Inactive,

    #[error("combatant is busy attacking")]
    Busy,

    #[error("attack on cooldown for {remaining:.2}s")]
    OnCooldown { remaining: f64 },

    #[error("not enough meter: need {needed}, have {available:.1}")]
    InsufficientMeter { needed: f64, available: f64 },

    #[error("combatant is not on the ground")]
    NotGrounded,

    #[error("no air dashes left")]
    NoAirDashes,

    #[error("already charging {0:?}")]
    AlreadyCharging(MoveId),

    #[error("move {0:?} is not in this archetype's move table")]
    UnknownMove(MoveId),

    #[error("invalid damage value {0}")]
    InvalidDamage(f64),
}

/// Result of one accepted action during intent processing
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Basic(AttackTag),
    ChargeStarted(MoveId),
    /// Special payload for the match to turn into an attack entity
    Launch(AttackSpec),
}

/// One melee activation
#[derive(Debug, Clone, PartialEq)]
pub struct Strike {
    pub volume: HitVolume,
    /// Targets this activation already landed on
    hit_targets: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeState {
    pub move_id: MoveId,
    pub held_secs: f64,
}

/// Authoritative combatant state
#[derive(Debug, Clone)]
pub struct Combatant {
    pub id: Uuid,
    pub name: String,
    pub team: u32,
    pub archetype: Archetype,
    pub body: Kinematics,

    pub health: f64,
    pub meter: f64,
    pub state: ActionState,
    pub facing: Facing,
    pub on_ground: bool,
    pub invulnerable: bool,
    pub stunned: bool,
    pub active: bool,
    pub air_dashes_used: u32,

    // Timers (seconds, counting down)
    pub attack_cooldown: f64,
    pub attack_timer: f64,
    pub hitstun_timer: f64,
    pub move_cooldowns: BTreeMap<MoveId, f64>,
    /// Match time of the latest basic attack
    pub last_attack_ms: Option<f64>,

    pub combo: ComboTracker,
    pub strike: Option<Strike>,
    pub charge: Option<ChargeState>,
    pub hit_volumes: HitVolumes,

    /// Latest intent from the input source
    pub intent: Intent,
    pub ko_cause: Option<KoCause>,
    pub stats: CombatantStats,
}

impl Combatant {
    pub fn new(
        name: impl Into<String>,
        team: u32,
        archetype: Archetype,
        position: Vector2,
    ) -> Result<Self, ConfigError> {
        archetype.validate()?;

        Ok(Self {
            id: Uuid::new_v4(),
            name: name.into(),
            team,
            body: Kinematics::at(position, &archetype),
            health: archetype.max_health,
            meter: 0.0,
            state: ActionState::Idle,
            facing: Facing::Right,
            on_ground: false,
            invulnerable: false,
            stunned: false,
            active: true,
            air_dashes_used: 0,
            attack_cooldown: 0.0,
            attack_timer: 0.0,
            hitstun_timer: 0.0,
            move_cooldowns: BTreeMap::new(),
            last_attack_ms: None,
            combo: ComboTracker::default(),
            strike: None,
            charge: None,
            hit_volumes: HitVolumes::new(),
            intent: Intent::default(),
            ko_cause: None,
            stats: CombatantStats::default(),
            archetype,
        })
    }

    pub fn position(&self) -> Vector2 {
        self.body.position
    }

    pub fn hurtbox(&self) -> Aabb {
        Aabb::from_center(self.body.position, self.archetype.width, self.archetype.height)
    }

    pub fn max_health(&self) -> f64 {
        self.archetype.max_health
    }

    pub fn max_meter(&self) -> f64 {
        self.archetype.max_meter
    }

    pub fn is_attacking(&self) -> bool {
        self.state == ActionState::Attacking
    }

    /// Gate shared by every voluntary action
    fn ensure_can_act(&self) -> Result<(), ActionError> {
        if !self.active {
            return Err(ActionError::Inactive);
        }
        match self.state {
            ActionState::Defeated => Err(ActionError::Defeated),
            ActionState::Hitstun => Err(ActionError::Stunned),
            _ if self.stunned => Err(ActionError::Stunned),
            _ => Ok(()),
        }
    }

    /// Advance cooldowns, state timers, meter regeneration and combo expiry
    pub fn update_timers(&mut self, dt: f64, now_ms: f64, rules: &CombatRules) {
        if !self.active {
            return;
        }

        self.attack_cooldown = CombatSystem::update_cooldown(self.attack_cooldown, dt);
        for cooldown in self.move_cooldowns.values_mut() {
            *cooldown = CombatSystem::update_cooldown(*cooldown, dt);
        }

        match self.state {
            ActionState::Hitstun => {
                self.hitstun_timer -= dt;
                if self.hitstun_timer <= 0.0 {
                    self.hitstun_timer = 0.0;
                    self.stunned = false;
                    self.invulnerable = false;
                    self.state = ActionState::Idle;
                }
            }
            // The recovery timer is frozen while a charge is held
            ActionState::Attacking if self.charge.is_none() => {
                self.attack_timer -= dt;
                if self.attack_timer <= 0.0 {
                    self.attack_timer = 0.0;
                    self.strike = None;
                    self.state = ActionState::Idle;
                }
            }
            ActionState::Idle => {
                self.gain_meter(self.archetype.meter_regen_per_sec * dt);
            }
            _ => {}
        }

        self.combo.expire(now_ms, rules.combo_window_ms);
    }

    /// Translate one intent snapshot into state machine actions.
    ///
    /// Refusals are expected (held buttons during cooldowns) and are dropped
    /// here; the individual actions report them to direct callers.
    pub fn apply_intent(&mut self, intent: &Intent, dt: f64, now_ms: f64) -> Vec<ActionOutcome> {
        let mut outcomes = Vec::new();
        if self.ensure_can_act().is_err() {
            return outcomes;
        }

        if self.charge.is_some() {
            if let Some(spec) = self.update_charge(dt, intent.special_held) {
                outcomes.push(ActionOutcome::Launch(spec));
            }
            return outcomes;
        }

        let _ = self.guard(intent.guard_held);
        if self.state == ActionState::Guarding {
            if intent.down {
                let _ = self.power_up(dt);
            }
        } else {
            match intent.horizontal() {
                Some(direction) => {
                    let _ = self.move_horizontal(direction);
                }
                None => self.stop_moving(),
            }
        }

        if intent.up {
            let _ = self.jump();
        }

        let burst = self.archetype.burst.filter(|_| intent.light_attack && intent.heavy_attack);
        let special = if let Some(id) = burst {
            Some(id)
        } else if intent.special_pressed {
            Some(match (intent.down, self.archetype.secondary_special) {
                (true, Some(secondary)) => secondary,
                _ => self.archetype.special,
            })
        } else {
            None
        };

        let result = match special {
            Some(id) => self.special(id).map(Some),
            None if intent.light_attack => self
                .basic_attack(AttackTag::Light, now_ms)
                .map(|tag| Some(ActionOutcome::Basic(tag))),
            None if intent.heavy_attack => self
                .basic_attack(AttackTag::Heavy, now_ms)
                .map(|tag| Some(ActionOutcome::Basic(tag))),
            None => Ok(None),
        };

        match result {
            Ok(Some(outcome)) => outcomes.push(outcome),
            Ok(None) => {}
            Err(error) => {
                tracing::trace!(combatant = %self.name, %error, "attack intent refused");
            }
        }

        outcomes
    }

    /// Walk in `direction` at full speed and face it
    pub fn move_horizontal(&mut self, direction: Facing) -> Result<(), ActionError> {
        self.ensure_can_act()?;

        self.body.velocity.x = direction.sign() * self.archetype.speed;
        self.facing = direction;
        if self.on_ground && matches!(self.state, ActionState::Idle | ActionState::Walking) {
            self.state = ActionState::Walking;
        }
        Ok(())
    }

    pub fn stop_moving(&mut self) {
        if self.state == ActionState::Walking {
            self.state = ActionState::Idle;
        }
    }

    /// Jump from the ground, or air dash while the budget lasts
    pub fn jump(&mut self) -> Result<(), ActionError> {
        self.ensure_can_act()?;
        if self.is_attacking() {
            return Err(ActionError::Busy);
        }

        if self.on_ground {
            self.body.velocity.y = -self.archetype.jump_power;
            self.on_ground = false;
            self.state = ActionState::Jumping;
            Ok(())
        } else if self.air_dashes_used < self.archetype.max_air_dashes {
            self.body.velocity.y = -self.archetype.jump_power * AIR_DASH_FACTOR;
            self.air_dashes_used += 1;
            Ok(())
        } else {
            Err(ActionError::NoAirDashes)
        }
    }

    /// Hold or release guard
    pub fn guard(&mut self, held: bool) -> Result<(), ActionError> {
        self.ensure_can_act()?;

        if !held {
            if self.state == ActionState::Guarding {
                self.state = ActionState::Idle;
            }
            return Ok(());
        }

        if self.is_attacking() {
            return Err(ActionError::Busy);
        }
        if !self.on_ground {
            return Err(ActionError::NotGrounded);
        }
        self.state = ActionState::Guarding;
        Ok(())
    }

    /// Gather meter while guarding low on the ground
    pub fn power_up(&mut self, dt: f64) -> Result<(), ActionError> {
        self.ensure_can_act()?;
        if !self.on_ground {
            return Err(ActionError::NotGrounded);
        }
        self.gain_meter(self.archetype.power_up_per_sec * dt);
        Ok(())
    }

    /// Start a light or heavy attack
    pub fn basic_attack(&mut self, tag: AttackTag, now_ms: f64) -> Result<AttackTag, ActionError> {
        self.ensure_can_act()?;
        if let Some(charge) = self.charge {
            return Err(ActionError::AlreadyCharging(charge.move_id));
        }
        if !CombatSystem::can_fire(self.attack_cooldown) {
            return Err(ActionError::OnCooldown {
                remaining: self.attack_cooldown,
            });
        }

        let spec = self.archetype.basic(tag);
        let damage = CombatSystem::basic_damage(spec, self.combo.count);
        let volume = HitVolume::in_front(spec, self.archetype.width, self.facing.sign(), damage);

        self.attack_cooldown = spec.cooldown;
        self.attack_timer = spec.duration;
        self.state = ActionState::Attacking;
        self.strike = Some(Strike {
            volume,
            hit_targets: Vec::new(),
        });
        self.last_attack_ms = Some(now_ms);
        Ok(tag)
    }

    /// Spend meter on a special move
    pub fn special(&mut self, id: MoveId) -> Result<ActionOutcome, ActionError> {
        self.ensure_can_act()?;
        if let Some(charge) = self.charge {
            return Err(ActionError::AlreadyCharging(charge.move_id));
        }

        let kind = self
            .archetype
            .move_kind(id)
            .cloned()
            .ok_or(ActionError::UnknownMove(id))?;

        if !CombatSystem::can_fire(self.attack_cooldown) {
            return Err(ActionError::OnCooldown {
                remaining: self.attack_cooldown,
            });
        }
        let move_cooldown = self.move_cooldowns.get(&id).copied().unwrap_or(0.0);
        if !CombatSystem::can_fire(move_cooldown) {
            return Err(ActionError::OnCooldown {
                remaining: move_cooldown,
            });
        }
        let cost = kind.cost();
        if self.meter < cost {
            return Err(ActionError::InsufficientMeter {
                needed: cost,
                available: self.meter,
            });
        }

        self.meter -= cost;
        self.state = ActionState::Attacking;
        self.attack_timer = SPECIAL_RECOVERY_SECS;
        self.strike = None;

        let outcome = match kind {
            MoveKind::Projectile(spec) => {
                self.attack_cooldown = spec.cooldown;
                ActionOutcome::Launch(self.projectile_payload(id, &spec))
            }
            MoveKind::Charge(spec) => {
                self.attack_cooldown = spec.cooldown;
                self.charge = Some(ChargeState {
                    move_id: id,
                    held_secs: 0.0,
                });
                ActionOutcome::ChargeStarted(id)
            }
            MoveKind::Burst(spec) => {
                self.move_cooldowns.insert(id, spec.cooldown);
                ActionOutcome::Launch(self.burst_payload(id, &spec))
            }
        };
        Ok(outcome)
    }

    /// Drain meter for a held charge. Releases when the button is let go or
    /// the meter runs dry.
    pub fn update_charge(&mut self, dt: f64, held: bool) -> Option<AttackSpec> {
        let charge = self.charge.as_mut()?;
        charge.held_secs += dt;
        let move_id = charge.move_id;

        let drain = match self.archetype.move_kind(move_id) {
            Some(MoveKind::Charge(spec)) => spec.drain_per_sec * dt,
            _ => 0.0,
        };
        self.meter = (self.meter - drain).max(0.0);

        if held && self.meter > 0.0 {
            return None;
        }
        self.release_charge()
    }

    /// Fire the held charge, scaled by how long it was held
    pub fn release_charge(&mut self) -> Option<AttackSpec> {
        let charge = self.charge.take()?;
        let spec = match self.archetype.move_kind(charge.move_id) {
            Some(MoveKind::Charge(spec)) => spec.clone(),
            _ => return None,
        };

        self.attack_timer = SPECIAL_RECOVERY_SECS;
        Some(self.charge_payload(charge.move_id, &spec, charge.held_secs))
    }

    /// Drop a held charge without firing
    pub fn cancel_charge(&mut self) {
        self.charge = None;
    }

    fn special_damage(&self, base: f64) -> f64 {
        base * CombatSystem::low_health_boost(
            self.health,
            self.archetype.max_health,
            self.archetype.low_health_boost,
        ) * self.combo.multiplier
    }

    fn launch_origin(&self, offset: Vector2) -> Vector2 {
        self.body.position + Vector2::new(offset.x * self.facing.sign(), offset.y)
    }

    fn launch_direction(&self, direction_y: f64) -> Vector2 {
        Vector2::new(self.facing.sign(), direction_y).normalize()
    }

    fn projectile_payload(&self, id: MoveId, spec: &ProjectileSpec) -> AttackSpec {
        let direction = self.launch_direction(spec.direction_y);
        AttackSpec {
            move_id: id,
            position: self.launch_origin(spec.spawn_offset),
            velocity: direction * spec.speed,
            width: spec.width,
            height: spec.height,
            damage: self.special_damage(spec.damage),
            knockback: Vector2::new(direction.x * spec.knockback.x, direction.y * spec.knockback.y),
            lifetime: spec.lifetime,
            piercing: spec.piercing,
            blockable: spec.blockable,
            color: spec.color,
        }
    }

    fn charge_payload(&self, id: MoveId, spec: &ChargeSpec, held_secs: f64) -> AttackSpec {
        let ratio = CombatSystem::charge_ratio(held_secs, spec.max_charge_secs);
        let lerp = |from: f64, to: f64| from + (to - from) * ratio;
        let scale = lerp(spec.min_scale, spec.max_scale);
        let direction = self.launch_direction(spec.direction_y);

        AttackSpec {
            move_id: id,
            position: self.launch_origin(spec.spawn_offset),
            velocity: direction * lerp(spec.min_speed, spec.max_speed),
            width: spec.base_width * scale,
            height: spec.base_height * scale,
            damage: self.special_damage(lerp(spec.min_damage, spec.max_damage)),
            knockback: Vector2::new(direction.x * spec.knockback.x, direction.y * spec.knockback.y),
            lifetime: spec.lifetime,
            piercing: spec.piercing,
            blockable: spec.blockable,
            color: spec.color,
        }
    }

    fn burst_payload(&self, id: MoveId, spec: &BurstSpec) -> AttackSpec {
        let sign = self.facing.sign();
        let reach = Vector2::new(spec.spawn_offset.x + spec.range / 2.0, spec.spawn_offset.y);

        AttackSpec {
            move_id: id,
            position: self.launch_origin(reach),
            velocity: Vector2::ZERO,
            width: spec.range,
            height: spec.range,
            damage: self.special_damage(spec.damage),
            knockback: Vector2::new(spec.knockback.x * sign, spec.knockback.y),
            lifetime: spec.lifetime,
            piercing: false,
            blockable: spec.blockable,
            color: spec.color,
        }
    }

    /// Rebuild this tick's hit volumes from the current action state
    pub fn refresh_hit_volumes(&mut self) {
        self.hit_volumes.clear();
        if self.state != ActionState::Attacking {
            return;
        }
        if let Some(strike) = &self.strike {
            self.hit_volumes.push(strike.volume);
        }
    }

    /// Whether the current melee activation already landed on `target`
    pub fn has_struck(&self, target: Uuid) -> bool {
        self.strike
            .as_ref()
            .is_some_and(|strike| strike.hit_targets.contains(&target))
    }

    pub fn mark_struck(&mut self, target: Uuid) {
        if let Some(strike) = self.strike.as_mut() {
            strike.hit_targets.push(target);
        }
    }

    /// Take a hit. Invulnerable targets ignore it; a guard facing a blockable
    /// hit scales it down and refunds meter.
    pub fn take_damage(
        &mut self,
        hit: &IncomingHit,
        rules: &CombatRules,
    ) -> Result<HitOutcome, ActionError> {
        if !(hit.damage.is_finite() && hit.damage >= 0.0) {
            return Err(ActionError::InvalidDamage(hit.damage));
        }
        if !self.active {
            return Err(ActionError::Inactive);
        }
        if self.state == ActionState::Defeated {
            return Err(ActionError::Defeated);
        }
        if self.invulnerable {
            return Ok(HitOutcome::Ignored);
        }

        let guarded = self.state == ActionState::Guarding
            && hit.blockable
            && CombatSystem::is_in_front(self.body.position, self.facing.sign(), hit.source_position);

        let (damage, knockback) = if guarded {
            self.gain_meter(rules.guard_meter_refund);
            CombatSystem::guarded(hit.damage, hit.knockback, rules)
        } else {
            (hit.damage, hit.knockback)
        };

        let before = self.health;
        let (health, defeated) = CombatSystem::apply_damage(self.health, damage);
        self.health = health;
        self.stats.damage_taken += before - health;
        self.body.velocity += knockback;

        self.cancel_charge();
        self.strike = None;
        self.hit_volumes.clear();

        if defeated {
            self.defeat(KoCause::Knockout);
        } else {
            self.state = ActionState::Hitstun;
            self.stunned = true;
            self.invulnerable = true;
            self.hitstun_timer = HITSTUN_SECS;
        }

        Ok(HitOutcome::Landed(AppliedHit {
            damage: before - health,
            knockback,
            guarded,
            remaining_health: health,
            defeated,
        }))
    }

    /// Lethal damage that ignores guard and invulnerability, used for
    /// ring-outs. Returns the health that was removed.
    pub fn apply_lethal(&mut self) -> f64 {
        let removed = self.health;
        self.health = 0.0;
        self.stats.damage_taken += removed;
        self.defeat(KoCause::RingOut);
        self.active = false;
        removed
    }

    fn defeat(&mut self, cause: KoCause) {
        self.health = 0.0;
        self.state = ActionState::Defeated;
        self.body.velocity = Vector2::ZERO;
        self.stunned = false;
        self.invulnerable = false;
        self.cancel_charge();
        self.strike = None;
        self.hit_volumes.clear();
        self.ko_cause.get_or_insert(cause);
    }

    /// Called once the match is over
    pub fn deactivate(&mut self) {
        self.active = false;
        self.cancel_charge();
        self.strike = None;
        self.hit_volumes.clear();
    }

    pub fn gain_meter(&mut self, amount: f64) {
        self.meter = (self.meter + amount).clamp(0.0, self.archetype.max_meter);
    }

    /// Turn toward `x` unless mid-attack
    pub fn face_towards(&mut self, x: f64) {
        if self.is_attacking() {
            return;
        }
        let dx = x - self.body.position.x;
        if dx > 0.0 {
            self.facing = Facing::Right;
        } else if dx < 0.0 {
            self.facing = Facing::Left;
        }
    }

    /// Record ground contact after the ground clamp. Landing resets the air
    /// dash budget and ends a jump.
    pub fn set_ground_contact(&mut self, grounded: bool) {
        if grounded && !self.on_ground {
            self.air_dashes_used = 0;
            if self.state == ActionState::Jumping {
                self.state = ActionState::Idle;
            }
        }
        self.on_ground = grounded;
    }

    /// State-specific horizontal damping over `dt` seconds
    pub fn apply_state_damping(&mut self, dt: f64) {
        let factor = match self.state {
            ActionState::Idle => IDLE_DAMPING,
            ActionState::Guarding => GUARD_DAMPING,
            ActionState::Defeated => DEFEATED_DAMPING,
            _ => return,
        };
        PhysicsSystem::damp_horizontal(&mut self.body, factor, dt);
    }
}

impl Bounded for Combatant {
    fn bounds(&self) -> Aabb {
        self.hurtbox()
    }

    fn position(&self) -> Vector2 {
        self.body.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::archetype::ArchetypeKind;

    fn grounded(kind: ArchetypeKind) -> Combatant {
        let mut c = Combatant::new("test", 0, Archetype::for_kind(kind), Vector2::new(400.0, 460.0))
            .expect("valid archetype");
        c.on_ground = true;
        c
    }

    fn hit_from(x: f64, damage: f64) -> IncomingHit {
        IncomingHit {
            attacker_id: Some(Uuid::new_v4()),
            source_position: Vector2::new(x, 460.0),
            damage,
            knockback: Vector2::new(-100.0, -50.0),
            blockable: true,
        }
    }

    #[test]
    fn invalid_archetype_never_builds() {
        let mut archetype = Archetype::for_kind(ArchetypeKind::Brawler);
        archetype.mass = -1.0;
        assert!(Combatant::new("x", 0, archetype, Vector2::ZERO).is_err());
    }

    #[test]
    fn walking_and_stopping() {
        let mut c = grounded(ArchetypeKind::Brawler);
        c.move_horizontal(Facing::Left).expect("can move");
        assert_eq!(c.state, ActionState::Walking);
        assert_eq!(c.facing, Facing::Left);
        assert_eq!(c.body.velocity.x, -c.archetype.speed);

        c.stop_moving();
        assert_eq!(c.state, ActionState::Idle);
    }

    #[test]
    fn movement_keeps_attack_state() {
        let mut c = grounded(ArchetypeKind::Brawler);
        c.basic_attack(AttackTag::Light, 0.0).expect("can attack");
        c.move_horizontal(Facing::Left).expect("velocity still applies");
        assert_eq!(c.state, ActionState::Attacking);
    }

    #[test]
    fn air_dash_budget() {
        let mut c = grounded(ArchetypeKind::Brawler);
        c.jump().expect("ground jump");
        assert_eq!(c.state, ActionState::Jumping);
        assert!(!c.on_ground);

        c.jump().expect("dash 1");
        c.jump().expect("dash 2");
        assert_eq!(c.jump(), Err(ActionError::NoAirDashes));
        assert!((c.body.velocity.y + c.archetype.jump_power * AIR_DASH_FACTOR).abs() < 1e-9);

        c.set_ground_contact(true);
        assert_eq!(c.air_dashes_used, 0);
        assert_eq!(c.state, ActionState::Idle);
    }

    #[test]
    fn guard_needs_ground() {
        let mut c = grounded(ArchetypeKind::Brawler);
        c.on_ground = false;
        assert_eq!(c.guard(true), Err(ActionError::NotGrounded));

        c.on_ground = true;
        c.guard(true).expect("guard");
        assert_eq!(c.state, ActionState::Guarding);
        c.guard(false).expect("release");
        assert_eq!(c.state, ActionState::Idle);
    }

    #[test]
    fn basic_attack_respects_cooldown() {
        let mut c = grounded(ArchetypeKind::Brawler);
        c.basic_attack(AttackTag::Light, 0.0).expect("first");
        assert!(matches!(
            c.basic_attack(AttackTag::Heavy, 0.0),
            Err(ActionError::OnCooldown { .. })
        ));

        c.refresh_hit_volumes();
        assert_eq!(c.hit_volumes.len(), 1);
        assert_eq!(c.hit_volumes[0].damage, 10.0);
    }

    #[test]
    fn hit_volumes_clear_when_attack_ends() {
        let rules = CombatRules::default();
        let mut c = grounded(ArchetypeKind::Brawler);
        c.basic_attack(AttackTag::Heavy, 0.0).expect("attack");
        for _ in 0..30 {
            c.update_timers(1.0 / 60.0, 0.0, &rules);
            c.refresh_hit_volumes();
        }
        assert_eq!(c.state, ActionState::Idle);
        assert!(c.hit_volumes.is_empty());
        assert!(c.strike.is_none());
    }

    #[test]
    fn guarded_front_hit_takes_fraction() {
        let rules = CombatRules::default();
        let mut c = grounded(ArchetypeKind::Brawler);
        c.facing = Facing::Right;
        c.guard(true).expect("guard");

        let outcome = c.take_damage(&hit_from(450.0, 100.0), &rules).expect("valid hit");
        let HitOutcome::Landed(applied) = outcome else {
            panic!("hit should land");
        };
        assert!(applied.guarded);
        assert_eq!(applied.damage, 30.0);
        assert_eq!(c.health, 70.0);
        assert_eq!(c.meter, 5.0);
        assert_eq!(c.state, ActionState::Hitstun);
    }

    #[test]
    fn guard_does_not_cover_the_back() {
        let rules = CombatRules::default();
        let mut c = grounded(ArchetypeKind::Brawler);
        c.facing = Facing::Right;
        c.guard(true).expect("guard");

        c.take_damage(&hit_from(350.0, 20.0), &rules).expect("valid hit");
        assert_eq!(c.health, 80.0);
        assert_eq!(c.meter, 0.0);
    }

    #[test]
    fn hitstun_blocks_intents_then_recovers() {
        let rules = CombatRules::default();
        let mut c = grounded(ArchetypeKind::Brawler);
        c.take_damage(&hit_from(450.0, 10.0), &rules).expect("valid hit");

        assert!(c.stunned && c.invulnerable);
        assert_eq!(c.jump(), Err(ActionError::Stunned));
        assert_eq!(
            c.take_damage(&hit_from(450.0, 10.0), &rules),
            Ok(HitOutcome::Ignored)
        );
        assert_eq!(c.health, 90.0);

        c.update_timers(HITSTUN_SECS + 0.01, 0.0, &rules);
        assert_eq!(c.state, ActionState::Idle);
        assert!(!c.stunned && !c.invulnerable);
    }

    #[test]
    fn lethal_hit_defeats_and_clamps() {
        let rules = CombatRules::default();
        let mut c = grounded(ArchetypeKind::Brawler);
        c.health = 5.0;
        c.body.velocity = Vector2::new(50.0, 0.0);

        let outcome = c.take_damage(&hit_from(450.0, 40.0), &rules).expect("valid hit");
        assert!(matches!(outcome, HitOutcome::Landed(AppliedHit { defeated: true, .. })));
        assert_eq!(c.health, 0.0);
        assert_eq!(c.state, ActionState::Defeated);
        assert_eq!(c.body.velocity, Vector2::ZERO);
        assert_eq!(c.ko_cause, Some(KoCause::Knockout));
        assert_eq!(c.take_damage(&hit_from(450.0, 1.0), &rules), Err(ActionError::Defeated));
    }

    #[test]
    fn negative_damage_is_rejected_without_mutation() {
        let rules = CombatRules::default();
        let mut c = grounded(ArchetypeKind::Brawler);
        assert_eq!(
            c.take_damage(&hit_from(450.0, -5.0), &rules),
            Err(ActionError::InvalidDamage(-5.0))
        );
        assert_eq!(c.health, 100.0);
        assert_eq!(c.state, ActionState::Idle);
    }

    #[test]
    fn ring_out_bypasses_invulnerability() {
        let mut c = grounded(ArchetypeKind::Brawler);
        c.invulnerable = true;
        c.guard(true).expect("guard");
        assert_eq!(c.apply_lethal(), 100.0);
        assert_eq!(c.health, 0.0);
        assert!(!c.active);
        assert_eq!(c.ko_cause, Some(KoCause::RingOut));
    }

    #[test]
    fn special_needs_meter_and_spends_it() {
        let mut c = grounded(ArchetypeKind::Brawler);
        c.meter = 10.0;
        assert!(matches!(
            c.special(MoveId::KiBlast),
            Err(ActionError::InsufficientMeter { .. })
        ));
        assert_eq!(c.state, ActionState::Idle);

        c.meter = 30.0;
        let outcome = c.special(MoveId::KiBlast).expect("enough meter");
        let ActionOutcome::Launch(spec) = outcome else {
            panic!("ki blast launches immediately");
        };
        assert_eq!(c.meter, 10.0);
        assert_eq!(spec.damage, 25.0);
        assert_eq!(spec.velocity, Vector2::new(400.0, 0.0));
        assert_eq!(c.special(MoveId::FinalFlash), Err(ActionError::UnknownMove(MoveId::FinalFlash)));
    }

    #[test]
    fn charge_scales_with_hold_time() {
        let mut c = grounded(ArchetypeKind::Brawler);
        c.meter = 100.0;
        assert_eq!(c.special(MoveId::ChargeBeam), Ok(ActionOutcome::ChargeStarted(MoveId::ChargeBeam)));
        assert_eq!(c.meter, 50.0);

        assert!(c.update_charge(0.5, true).is_none());
        assert!(c.update_charge(0.5, true).is_none());
        assert_eq!(c.meter, 20.0);

        let spec = c.update_charge(0.0, false).expect("release fires");
        // one second of a two second charge
        assert!((spec.damage - 70.0).abs() < 1e-9);
        assert!((spec.width - 45.0).abs() < 1e-9);
        assert!((spec.velocity.x - 400.0).abs() < 1e-9);
        assert!(spec.piercing);
        assert!(c.charge.is_none());
    }

    #[test]
    fn charge_releases_when_meter_runs_out() {
        let mut c = grounded(ArchetypeKind::Brawler);
        c.meter = 55.0;
        c.special(MoveId::ChargeBeam).expect("start");

        let spec = c.update_charge(0.5, true).expect("meter ran dry");
        assert_eq!(c.meter, 0.0);
        assert!((spec.damage - 55.0).abs() < 1e-9);
    }

    #[test]
    fn being_hit_cancels_charge() {
        let rules = CombatRules::default();
        let mut c = grounded(ArchetypeKind::Brawler);
        c.meter = 100.0;
        c.special(MoveId::ChargeBeam).expect("start");
        c.take_damage(&hit_from(450.0, 10.0), &rules).expect("valid hit");
        assert!(c.charge.is_none());
        assert!(c.release_charge().is_none());
    }

    #[test]
    fn deactivation_drops_a_held_charge() {
        let mut c = grounded(ArchetypeKind::Brawler);
        c.meter = 100.0;
        c.special(MoveId::ChargeBeam).expect("start");
        c.deactivate();
        assert!(c.charge.is_none());
        assert!(c.update_charge(1.0 / 60.0, false).is_none());
    }

    #[test]
    fn charged_blast_caps_at_max_damage() {
        let mut c = grounded(ArchetypeKind::Prince);
        c.meter = 100.0;
        let intent = Intent {
            down: true,
            special_pressed: true,
            special_held: true,
            ..Intent::default()
        };
        let outcomes = c.apply_intent(&intent, 1.0 / 60.0, 0.0);
        assert_eq!(outcomes, vec![ActionOutcome::ChargeStarted(MoveId::ChargedBlast)]);

        // 1.5s fills the charge; keep holding well past it
        for _ in 0..120 {
            assert!(c.update_charge(1.0 / 60.0, true).is_none());
        }
        assert!(c.meter > 0.0);

        let spec = c.update_charge(0.0, false).expect("release fires");
        assert_eq!(spec.move_id, MoveId::ChargedBlast);
        assert_eq!(spec.damage, 80.0);
        assert_eq!(spec.width, 20.0);
    }

    #[test]
    fn prince_has_a_ki_blast() {
        let mut c = grounded(ArchetypeKind::Prince);
        c.meter = 20.0;
        let ActionOutcome::Launch(spec) = c.special(MoveId::KiBlast).expect("ki blast") else {
            panic!("ki blast launches immediately");
        };
        assert_eq!(spec.move_id, MoveId::KiBlast);
        assert_eq!(spec.damage, 25.0);
        assert_eq!(c.meter, 0.0);
    }

    #[test]
    fn idle_slide_settles_the_same_at_any_tick_rate() {
        let slide = |steps: u32| {
            let mut c = grounded(ArchetypeKind::Brawler);
            c.body.velocity.x = 300.0;
            let dt = 1.0 / f64::from(steps);
            for _ in 0..steps {
                PhysicsSystem::integrate(&mut c.body, dt);
                c.apply_state_damping(dt);
            }
            (c.body.position.x - 400.0, c.body.velocity.x)
        };

        let (fine_distance, fine_velocity) = slide(60);
        let (coarse_distance, coarse_velocity) = slide(30);
        assert!((fine_velocity - coarse_velocity).abs() < 1e-9);
        assert!(fine_distance > 0.0);
        assert!(coarse_distance / fine_distance < 1.2);
    }

    #[test]
    fn burst_has_its_own_cooldown() {
        let mut c = grounded(ArchetypeKind::Prince);
        c.meter = 100.0;
        c.facing = Facing::Left;

        let ActionOutcome::Launch(spec) = c.special(MoveId::BigBang).expect("burst") else {
            panic!("burst launches immediately");
        };
        assert_eq!(spec.damage, 60.0);
        assert_eq!(spec.knockback, Vector2::new(-300.0, -150.0));
        assert!(spec.position.x < c.position().x);
        assert!(!spec.blockable);
        assert_eq!(c.attack_cooldown, 0.0);
        assert!(matches!(c.special(MoveId::BigBang), Err(ActionError::OnCooldown { .. })));
    }

    #[test]
    fn low_health_boosts_specials() {
        let mut c = grounded(ArchetypeKind::Prince);
        c.meter = 100.0;
        c.health = 50.0;
        let ActionOutcome::Launch(spec) = c.special(MoveId::FinalFlash).expect("flash") else {
            panic!("flash launches immediately");
        };
        assert!((spec.damage - 80.0 * 1.25).abs() < 1e-9);
    }

    #[test]
    fn meter_regenerates_only_while_idle() {
        let rules = CombatRules::default();
        let mut c = grounded(ArchetypeKind::Brawler);
        c.update_timers(0.5, 0.0, &rules);
        assert!((c.meter - 10.0).abs() < 1e-9);

        c.guard(true).expect("guard");
        c.update_timers(0.5, 0.0, &rules);
        assert!((c.meter - 10.0).abs() < 1e-9);

        c.meter = 99.0;
        c.guard(false).expect("release");
        c.update_timers(1.0, 0.0, &rules);
        assert_eq!(c.meter, 100.0);
    }

    #[test]
    fn intent_maps_secondary_and_power_up() {
        let mut c = grounded(ArchetypeKind::Brawler);
        c.meter = 30.0;
        let intent = Intent {
            down: true,
            special_pressed: true,
            special_held: true,
            ..Intent::default()
        };
        let outcomes = c.apply_intent(&intent, 1.0 / 60.0, 0.0);
        assert!(matches!(
            outcomes.as_slice(),
            [ActionOutcome::Launch(AttackSpec { move_id: MoveId::KiBlast, .. })]
        ));

        let mut c = grounded(ArchetypeKind::Brawler);
        let intent = Intent {
            down: true,
            guard_held: true,
            ..Intent::default()
        };
        c.apply_intent(&intent, 0.5, 0.0);
        assert_eq!(c.state, ActionState::Guarding);
        assert!((c.meter - 20.0).abs() < 1e-9);
    }
}
