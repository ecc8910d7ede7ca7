//! Combat system - hit volumes, attack entities, damage and combo rules

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::CombatRules;
use crate::geometry::{Aabb, Bounded, Vector2};
use crate::protocol::HitSource;

use super::archetype::{AttackTag, BasicAttackSpec, MoveId};

/// Upper bound on simultaneous hit volumes per combatant
pub const MAX_HIT_VOLUMES: usize = 4;

/// Tick-scoped hit volume buffer
pub type HitVolumes = ArrayVec<HitVolume, MAX_HIT_VOLUMES>;

/// How long a combatant stays stunned after taking a hit (seconds)
pub const HITSTUN_SECS: f64 = 0.3;

/// Recovery time after launching a special move (seconds)
pub const SPECIAL_RECOVERY_SECS: f64 = 0.4;

/// Melee hit box, stored relative to its owner's position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitVolume {
    pub area: Aabb,
    pub damage: f64,
    pub knockback: Vector2,
    pub tag: AttackTag,
}

impl HitVolume {
    /// Place a basic attack in front of a body of `owner_width`.
    /// `facing` is +1 for right, -1 for left.
    pub fn in_front(spec: &BasicAttackSpec, owner_width: f64, facing: f64, damage: f64) -> Self {
        let x = if facing > 0.0 {
            owner_width / 2.0
        } else {
            -owner_width / 2.0 - spec.reach_width
        };

        Self {
            area: Aabb::from_xywh(x, spec.offset_y, spec.reach_width, spec.reach_height),
            damage,
            knockback: Vector2::new(spec.knockback.x * facing, spec.knockback.y),
            tag: spec.tag,
        }
    }

    pub fn world_area(&self, owner: Vector2) -> Aabb {
        self.area.translate(owner)
    }
}

/// Payload produced by a special move, ready to become an [`AttackEntity`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackSpec {
    pub move_id: MoveId,
    /// Spawn center
    pub position: Vector2,
    pub velocity: Vector2,
    pub width: f64,
    pub height: f64,
    pub damage: f64,
    pub knockback: Vector2,
    pub lifetime: f64,
    pub piercing: bool,
    pub blockable: bool,
    pub color: u32,
}

impl AttackSpec {
    /// Malformed payloads never reach the match
    pub fn is_valid(&self) -> bool {
        self.damage.is_finite()
            && self.damage >= 0.0
            && self.width > 0.0
            && self.height > 0.0
            && self.lifetime.is_finite()
            && self.position.x.is_finite()
            && self.position.y.is_finite()
    }
}

/// In-flight attack owned by the match
#[derive(Debug, Clone)]
pub struct AttackEntity {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub team: u32,
    pub move_id: MoveId,
    pub position: Vector2,
    pub velocity: Vector2,
    pub width: f64,
    pub height: f64,
    pub damage: f64,
    pub knockback: Vector2,
    pub lifetime_remaining: f64,
    pub has_hit: bool,
    pub piercing: bool,
    pub blockable: bool,
    pub active: bool,
    pub color: u32,
    /// Owner's combo already credited by this entity
    combo_registered: bool,
}

impl AttackEntity {
    pub fn new(owner_id: Uuid, team: u32, spec: AttackSpec) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            team,
            move_id: spec.move_id,
            position: spec.position,
            velocity: spec.velocity,
            width: spec.width,
            height: spec.height,
            damage: spec.damage,
            knockback: spec.knockback,
            lifetime_remaining: spec.lifetime,
            has_hit: false,
            piercing: spec.piercing,
            blockable: spec.blockable,
            active: true,
            color: spec.color,
            combo_registered: false,
        }
    }

    /// Update position and lifetime, returns false if expired
    pub fn update(&mut self, dt: f64) -> bool {
        self.position += self.velocity * dt;
        self.lifetime_remaining -= dt;
        self.lifetime_remaining > 0.0
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(self.position, self.width, self.height)
    }

    pub fn rotation(&self) -> f64 {
        if self.velocity == Vector2::ZERO {
            0.0
        } else {
            self.velocity.angle()
        }
    }

    /// Owner, teammates and spent non-piercing attacks are skipped
    pub fn can_hit(&self, target_id: Uuid, target_team: u32) -> bool {
        self.active
            && target_id != self.owner_id
            && target_team != self.team
            && !(self.has_hit && !self.piercing)
    }

    /// Mark a successful hit. Non-piercing attacks are spent immediately.
    /// Returns true the first time, when the owner's combo should advance.
    pub fn register_hit(&mut self) -> bool {
        self.has_hit = true;
        if !self.piercing {
            self.active = false;
        }
        !std::mem::replace(&mut self.combo_registered, true)
    }
}

impl Bounded for AttackEntity {
    fn bounds(&self) -> Aabb {
        AttackEntity::bounds(self)
    }

    fn position(&self) -> Vector2 {
        self.position
    }
}

/// A hit as seen by its target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncomingHit {
    pub attacker_id: Option<Uuid>,
    /// Where the hit comes from; decides whether a guard faces it
    pub source_position: Vector2,
    pub damage: f64,
    pub knockback: Vector2,
    pub blockable: bool,
}

/// Damage actually applied to a target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppliedHit {
    pub damage: f64,
    pub knockback: Vector2,
    pub guarded: bool,
    pub remaining_health: f64,
    pub defeated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitOutcome {
    /// Target was invulnerable
    Ignored,
    Landed(AppliedHit),
}

/// Hit result from combat resolution
#[derive(Debug, Clone)]
pub struct HitResult {
    pub attacker_id: Uuid,
    pub target_id: Uuid,
    pub source: HitSource,
    pub applied: AppliedHit,
    pub position: Vector2,
    /// Whether this hit advances the attacker's combo
    pub counts_for_combo: bool,
}

/// Per-combatant combo chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComboTracker {
    /// Hits landed in the current chain; 0 when no chain is active
    pub count: u32,
    pub last_hit_ms: Option<f64>,
    pub multiplier: f64,
    /// Longest chain so far
    pub best: u32,
}

impl Default for ComboTracker {
    fn default() -> Self {
        Self {
            count: 0,
            last_hit_ms: None,
            multiplier: 1.0,
            best: 0,
        }
    }
}

impl ComboTracker {
    /// Count a landed hit at `now_ms`. Returns the new chain length.
    pub fn register_hit(&mut self, now_ms: f64, rules: &CombatRules) -> u32 {
        let within_window = self
            .last_hit_ms
            .is_some_and(|last| now_ms - last <= rules.combo_window_ms);

        self.count = if within_window { self.count + 1 } else { 1 };
        self.last_hit_ms = Some(now_ms);
        self.multiplier = CombatSystem::combo_multiplier(self.count, rules);
        self.best = self.best.max(self.count);
        self.count
    }

    /// Drop the chain once the window since the last hit has passed
    pub fn expire(&mut self, now_ms: f64, window_ms: f64) {
        if let Some(last) = self.last_hit_ms {
            if now_ms - last > window_ms {
                self.count = 0;
                self.multiplier = 1.0;
            }
        }
    }
}

/// Combat rules that don't need combatant state
pub struct CombatSystem;

impl CombatSystem {
    /// Check if an attack can start (cooldown check)
    pub fn can_fire(cooldown: f64) -> bool {
        cooldown <= 0.0
    }

    /// Update a cooldown, never below zero
    pub fn update_cooldown(cooldown: f64, dt: f64) -> f64 {
        (cooldown - dt).max(0.0)
    }

    /// Melee damage grows with the hits already landed in the chain
    pub fn basic_damage(spec: &BasicAttackSpec, combo_count: u32) -> f64 {
        spec.base_damage + combo_count as f64 * spec.per_hit_bonus
    }

    pub fn combo_multiplier(count: u32, rules: &CombatRules) -> f64 {
        let steps = count.saturating_sub(1) as f64;
        (1.0 + steps * rules.combo_multiplier_step).min(rules.combo_multiplier_cap)
    }

    /// Charge progress in [0, 1]
    pub fn charge_ratio(held_secs: f64, max_secs: f64) -> f64 {
        if max_secs <= 0.0 {
            return 1.0;
        }
        (held_secs / max_secs).clamp(0.0, 1.0)
    }

    /// Damage multiplier that grows as health drops
    pub fn low_health_boost(health: f64, max_health: f64, boost: f64) -> f64 {
        if max_health <= 0.0 {
            return 1.0;
        }
        1.0 + (1.0 - health / max_health).clamp(0.0, 1.0) * boost
    }

    /// True if `source` is on the side `facing` points to. A source level
    /// with the target counts as in front.
    pub fn is_in_front(target: Vector2, facing: f64, source: Vector2) -> bool {
        let dx = source.x - target.x;
        dx == 0.0 || dx.signum() == facing.signum()
    }

    /// Scale a guarded hit
    pub fn guarded(damage: f64, knockback: Vector2, rules: &CombatRules) -> (f64, Vector2) {
        (
            damage * rules.guard_damage_fraction,
            knockback * rules.guard_knockback_fraction,
        )
    }

    /// Apply damage to health, returns (new_health, is_dead)
    pub fn apply_damage(current_health: f64, damage: f64) -> (f64, bool) {
        let new_health = (current_health - damage).max(0.0);
        (new_health, new_health <= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::archetype::{Archetype, ArchetypeKind, AttackTag};

    #[test]
    fn combo_resets_outside_window() {
        let rules = CombatRules::default();

        let mut combo = ComboTracker::default();
        combo.register_hit(0.0, &rules);
        assert_eq!(combo.register_hit(1999.0, &rules), 2);
        assert!((combo.multiplier - 1.1).abs() < 1e-12);

        let mut combo = ComboTracker::default();
        combo.register_hit(0.0, &rules);
        assert_eq!(combo.register_hit(2001.0, &rules), 1);
        assert_eq!(combo.multiplier, 1.0);
        assert_eq!(combo.best, 1);
    }

    #[test]
    fn combo_multiplier_is_capped() {
        let rules = CombatRules::default();
        assert_eq!(CombatSystem::combo_multiplier(1, &rules), 1.0);
        assert_eq!(CombatSystem::combo_multiplier(11, &rules), 2.0);
        assert_eq!(CombatSystem::combo_multiplier(40, &rules), 2.0);
    }

    #[test]
    fn combo_expires_when_idle() {
        let rules = CombatRules::default();
        let mut combo = ComboTracker::default();
        combo.register_hit(0.0, &rules);
        combo.register_hit(500.0, &rules);

        combo.expire(2400.0, rules.combo_window_ms);
        assert_eq!(combo.count, 2);

        combo.expire(2600.0, rules.combo_window_ms);
        assert_eq!(combo.count, 0);
        assert_eq!(combo.multiplier, 1.0);
        assert_eq!(combo.best, 2);
    }

    #[test]
    fn expired_chain_restarts_at_base_damage() {
        let rules = CombatRules::default();
        let brawler = Archetype::for_kind(ArchetypeKind::Brawler);
        let light = brawler.basic(AttackTag::Light);
        let mut combo = ComboTracker::default();
        combo.register_hit(0.0, &rules);
        combo.register_hit(500.0, &rules);
        assert_eq!(CombatSystem::basic_damage(light, combo.count), 14.0);

        combo.expire(3000.0, rules.combo_window_ms);
        assert_eq!(CombatSystem::basic_damage(light, combo.count), 10.0);
        assert_eq!(combo.register_hit(3100.0, &rules), 1);
        assert_eq!(CombatSystem::basic_damage(light, combo.count), 12.0);
    }

    #[test]
    fn guard_scales_damage_and_knockback() {
        let rules = CombatRules::default();
        let (damage, knockback) = CombatSystem::guarded(100.0, Vector2::new(200.0, -100.0), &rules);
        assert_eq!(damage, 30.0);
        assert_eq!(knockback, Vector2::new(40.0, -20.0));
    }

    #[test]
    fn light_volume_mirrors_with_facing() {
        let archetype = Archetype::for_kind(ArchetypeKind::Brawler);
        let right = HitVolume::in_front(&archetype.light, 60.0, 1.0, 10.0);
        let left = HitVolume::in_front(&archetype.light, 60.0, -1.0, 10.0);

        assert_eq!(right.area, Aabb::new(30.0, -10.0, 70.0, 20.0));
        assert_eq!(left.area, Aabb::new(-70.0, -10.0, -30.0, 20.0));
        assert_eq!(right.knockback, Vector2::new(150.0, -50.0));
        assert_eq!(left.knockback, Vector2::new(-150.0, -50.0));
    }

    fn spec(piercing: bool) -> AttackSpec {
        AttackSpec {
            move_id: MoveId::KiBlast,
            position: Vector2::ZERO,
            velocity: Vector2::new(400.0, 0.0),
            width: 20.0,
            height: 20.0,
            damage: 25.0,
            knockback: Vector2::new(100.0, 0.0),
            lifetime: 0.05,
            piercing,
            blockable: true,
            color: 0,
        }
    }

    #[test]
    fn non_piercing_attack_is_spent_by_first_hit() {
        let owner = Uuid::new_v4();
        let target = Uuid::new_v4();
        let mut attack = AttackEntity::new(owner, 0, spec(false));

        assert!(!attack.can_hit(owner, 1));
        assert!(!attack.can_hit(target, 0));
        assert!(attack.can_hit(target, 1));

        assert!(attack.register_hit());
        assert!(!attack.active);
        assert!(!attack.can_hit(target, 1));
    }

    #[test]
    fn piercing_attack_credits_combo_once() {
        let mut attack = AttackEntity::new(Uuid::new_v4(), 0, spec(true));
        assert!(attack.register_hit());
        assert!(!attack.register_hit());
        assert!(attack.active);
        assert!(attack.can_hit(Uuid::new_v4(), 1));
    }

    #[test]
    fn attack_expires_after_lifetime() {
        let mut attack = AttackEntity::new(Uuid::new_v4(), 0, spec(false));
        assert!(attack.update(0.02));
        assert!(!attack.update(0.04));
        assert!((attack.position.x - 24.0).abs() < 1e-9);
    }

    #[test]
    fn front_check_uses_facing_side() {
        let me = Vector2::new(100.0, 0.0);
        assert!(CombatSystem::is_in_front(me, 1.0, Vector2::new(150.0, 0.0)));
        assert!(!CombatSystem::is_in_front(me, 1.0, Vector2::new(50.0, 0.0)));
        assert!(CombatSystem::is_in_front(me, -1.0, Vector2::new(50.0, 0.0)));
        assert!(CombatSystem::is_in_front(me, -1.0, me));
    }
}
