//! Combatant archetypes: stat tables and move tables
//!
//! A combatant is one state machine parameterized by an archetype. Special
//! moves are looked up by [`MoveId`] and dispatched on their [`MoveKind`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::geometry::Vector2;

/// Built-in archetypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchetypeKind {
    /// Fast, light, charge-beam special
    Brawler,
    /// Heavier, piercing flash special, gets stronger when hurt
    Prince,
}

impl Default for ArchetypeKind {
    fn default() -> Self {
        Self::Brawler
    }
}

/// Special move identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveId {
    KiBlast,
    ChargeBeam,
    ChargedBlast,
    FinalFlash,
    BigBang,
}

/// Melee attack kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackTag {
    Light,
    Heavy,
}

/// Basic (melee) attack parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicAttackSpec {
    pub tag: AttackTag,
    /// Hit volume size
    pub reach_width: f64,
    pub reach_height: f64,
    /// Vertical offset of the hit volume's top edge from the owner's center
    pub offset_y: f64,
    pub base_damage: f64,
    /// Added per hit already landed in the current combo
    pub per_hit_bonus: f64,
    /// Knockback for a right-facing attacker; x is mirrored by facing
    pub knockback: Vector2,
    pub cooldown: f64,
    /// How long the attacker stays in `Attacking`
    pub duration: f64,
}

/// Straight-line projectile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSpec {
    pub cost: f64,
    pub cooldown: f64,
    pub damage: f64,
    pub speed: f64,
    pub width: f64,
    pub height: f64,
    pub lifetime: f64,
    /// Per-axis knockback scale applied to the launch direction
    pub knockback: Vector2,
    pub piercing: bool,
    pub blockable: bool,
    /// Spawn point relative to the owner (x mirrored by facing)
    pub spawn_offset: Vector2,
    /// Vertical component of the launch direction before normalizing
    pub direction_y: f64,
    pub color: u32,
}

/// Hold-to-charge projectile. Output scales linearly with the charge ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeSpec {
    pub cost: f64,
    pub cooldown: f64,
    /// Meter drained per second while charging
    pub drain_per_sec: f64,
    /// Charge time that yields full power
    pub max_charge_secs: f64,
    pub min_damage: f64,
    pub max_damage: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    pub base_width: f64,
    pub base_height: f64,
    pub lifetime: f64,
    /// Per-axis knockback scale applied to the launch direction
    pub knockback: Vector2,
    pub piercing: bool,
    pub blockable: bool,
    pub spawn_offset: Vector2,
    pub direction_y: f64,
    pub color: u32,
}

/// Short-lived stationary blast in front of the owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurstSpec {
    pub cost: f64,
    /// Move-specific cooldown, independent of the attack cooldown
    pub cooldown: f64,
    pub damage: f64,
    /// Side length of the blast area
    pub range: f64,
    pub lifetime: f64,
    /// Knockback for a right-facing owner; x is mirrored by facing
    pub knockback: Vector2,
    pub blockable: bool,
    pub spawn_offset: Vector2,
    pub color: u32,
}

/// Tagged special move variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MoveKind {
    Projectile(ProjectileSpec),
    Charge(ChargeSpec),
    Burst(BurstSpec),
}

impl MoveKind {
    pub fn cost(&self) -> f64 {
        match self {
            MoveKind::Projectile(spec) => spec.cost,
            MoveKind::Charge(spec) => spec.cost,
            MoveKind::Burst(spec) => spec.cost,
        }
    }
}

/// Stat table plus move table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archetype {
    pub name: String,
    pub width: f64,
    pub height: f64,
    pub mass: f64,
    /// Per-second velocity retention in (0, 1]
    pub friction: f64,
    pub bounce: f64,
    pub max_health: f64,
    pub max_meter: f64,
    /// Horizontal walk speed
    pub speed: f64,
    pub jump_power: f64,
    pub max_air_dashes: u32,
    /// Passive meter regeneration while idle
    pub meter_regen_per_sec: f64,
    /// Meter gained per second while powering up
    pub power_up_per_sec: f64,
    /// Extra special-move damage at zero health (0.5 = +50%)
    pub low_health_boost: f64,
    pub light: BasicAttackSpec,
    pub heavy: BasicAttackSpec,
    pub special: MoveId,
    pub secondary_special: Option<MoveId>,
    pub burst: Option<MoveId>,
    pub moves: BTreeMap<MoveId, MoveKind>,
    pub primary_color: u32,
    pub secondary_color: u32,
}

impl Archetype {
    pub fn for_kind(kind: ArchetypeKind) -> Self {
        match kind {
            ArchetypeKind::Brawler => Self {
                name: "Brawler".to_string(),
                speed: 350.0,
                jump_power: 550.0,
                special: MoveId::ChargeBeam,
                secondary_special: Some(MoveId::KiBlast),
                burst: None,
                low_health_boost: 0.0,
                moves: BTreeMap::from([
                    (MoveId::KiBlast, ki_blast()),
                    (MoveId::ChargeBeam, charge_beam()),
                ]),
                primary_color: 0xff6600,
                secondary_color: 0x0066ff,
                ..Self::base()
            },
            ArchetypeKind::Prince => Self {
                name: "Prince".to_string(),
                mass: 1.2,
                speed: 320.0,
                jump_power: 500.0,
                special: MoveId::FinalFlash,
                secondary_special: Some(MoveId::ChargedBlast),
                burst: Some(MoveId::BigBang),
                low_health_boost: 0.5,
                moves: BTreeMap::from([
                    (MoveId::KiBlast, ki_blast()),
                    (MoveId::FinalFlash, final_flash()),
                    (MoveId::ChargedBlast, charged_blast()),
                    (MoveId::BigBang, big_bang()),
                ]),
                primary_color: 0x000080,
                secondary_color: 0xffffff,
                ..Self::base()
            },
        }
    }

    /// Shared body and melee stats
    fn base() -> Self {
        Self {
            name: String::new(),
            width: 60.0,
            height: 80.0,
            mass: 1.0,
            friction: 0.8,
            bounce: 0.3,
            max_health: 100.0,
            max_meter: 100.0,
            speed: 300.0,
            jump_power: 500.0,
            max_air_dashes: 2,
            meter_regen_per_sec: 20.0,
            power_up_per_sec: 40.0,
            low_health_boost: 0.0,
            light: BasicAttackSpec {
                tag: AttackTag::Light,
                reach_width: 40.0,
                reach_height: 30.0,
                offset_y: -10.0,
                base_damage: 10.0,
                per_hit_bonus: 2.0,
                knockback: Vector2::new(150.0, -50.0),
                cooldown: 0.3,
                duration: 0.4,
            },
            heavy: BasicAttackSpec {
                tag: AttackTag::Heavy,
                reach_width: 50.0,
                reach_height: 40.0,
                offset_y: 0.0,
                base_damage: 15.0,
                per_hit_bonus: 3.0,
                knockback: Vector2::new(200.0, -80.0),
                cooldown: 0.4,
                duration: 0.4,
            },
            special: MoveId::KiBlast,
            secondary_special: None,
            burst: None,
            moves: BTreeMap::from([(MoveId::KiBlast, ki_blast())]),
            primary_color: 0xff6600,
            secondary_color: 0x0066ff,
        }
    }

    pub fn basic(&self, tag: AttackTag) -> &BasicAttackSpec {
        match tag {
            AttackTag::Light => &self.light,
            AttackTag::Heavy => &self.heavy,
        }
    }

    pub fn move_kind(&self, id: MoveId) -> Option<&MoveKind> {
        self.moves.get(&id)
    }

    /// Reject stat tables that would break the simulation
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |reason: &str| ConfigError::InvalidArchetype {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if !(self.mass > 0.0 && self.mass.is_finite()) {
            return Err(fail("mass must be positive"));
        }
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(fail("body size must be positive"));
        }
        if !(self.max_health > 0.0) {
            return Err(fail("max health must be positive"));
        }
        if !(self.max_meter >= 0.0) {
            return Err(fail("max meter must not be negative"));
        }
        if !(self.friction > 0.0 && self.friction <= 1.0) {
            return Err(fail("friction must be within (0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.bounce) {
            return Err(fail("bounce must be within [0, 1]"));
        }
        for spec in [&self.light, &self.heavy] {
            if !(spec.base_damage >= 0.0 && spec.per_hit_bonus >= 0.0) {
                return Err(fail("melee damage must not be negative"));
            }
            if !(spec.duration > 0.0) {
                return Err(fail("melee duration must be positive"));
            }
        }

        let bound = [Some(self.special), self.secondary_special, self.burst];
        for id in bound.into_iter().flatten() {
            if !self.moves.contains_key(&id) {
                return Err(fail(&format!("{id:?} is bound but missing from the move table")));
            }
        }
        if let Some(id) = self.burst {
            if !matches!(self.moves.get(&id), Some(MoveKind::Burst(_))) {
                return Err(fail("burst binding must reference a burst move"));
            }
        }
        for kind in self.moves.values() {
            if !(kind.cost() >= 0.0) {
                return Err(fail("move cost must not be negative"));
            }
            if let MoveKind::Charge(spec) = kind {
                if !(spec.max_charge_secs > 0.0) {
                    return Err(fail("max charge time must be positive"));
                }
            }
        }

        Ok(())
    }
}

fn ki_blast() -> MoveKind {
    MoveKind::Projectile(ProjectileSpec {
        cost: 20.0,
        cooldown: 0.5,
        damage: 25.0,
        speed: 400.0,
        width: 20.0,
        height: 20.0,
        lifetime: 3.0,
        knockback: Vector2::new(100.0, 50.0),
        piercing: false,
        blockable: true,
        spawn_offset: Vector2::new(40.0, -20.0),
        direction_y: 0.0,
        color: 0x00aaff,
    })
}

fn charge_beam() -> MoveKind {
    MoveKind::Charge(ChargeSpec {
        cost: 50.0,
        cooldown: 1.0,
        drain_per_sec: 30.0,
        max_charge_secs: 2.0,
        min_damage: 40.0,
        max_damage: 100.0,
        min_scale: 1.0,
        max_scale: 2.0,
        min_speed: 300.0,
        max_speed: 500.0,
        base_width: 30.0,
        base_height: 30.0,
        lifetime: 4.0,
        knockback: Vector2::new(250.0, 100.0),
        piercing: true,
        blockable: true,
        spawn_offset: Vector2::new(30.0, -10.0),
        direction_y: 0.0,
        color: 0x00aaff,
    })
}

fn charged_blast() -> MoveKind {
    MoveKind::Charge(ChargeSpec {
        cost: 40.0,
        cooldown: 1.0,
        drain_per_sec: 25.0,
        max_charge_secs: 1.5,
        min_damage: 35.0,
        max_damage: 80.0,
        min_scale: 1.0,
        max_scale: 1.0,
        min_speed: 350.0,
        max_speed: 350.0,
        base_width: 20.0,
        base_height: 20.0,
        lifetime: 3.0,
        knockback: Vector2::new(200.0, 80.0),
        piercing: false,
        blockable: true,
        spawn_offset: Vector2::new(30.0, -15.0),
        direction_y: -0.2,
        color: 0x9900ff,
    })
}

fn final_flash() -> MoveKind {
    MoveKind::Projectile(ProjectileSpec {
        cost: 60.0,
        cooldown: 1.0,
        damage: 80.0,
        speed: 400.0,
        width: 60.0,
        height: 30.0,
        lifetime: 2.0,
        knockback: Vector2::new(400.0, 200.0),
        piercing: true,
        blockable: true,
        spawn_offset: Vector2::new(40.0, -10.0),
        direction_y: 0.0,
        color: 0xffff00,
    })
}

fn big_bang() -> MoveKind {
    MoveKind::Burst(BurstSpec {
        cost: 50.0,
        cooldown: 4.0,
        damage: 60.0,
        range: 100.0,
        lifetime: 0.25,
        knockback: Vector2::new(300.0, -150.0),
        blockable: false,
        spawn_offset: Vector2::new(20.0, -20.0),
        color: 0x66ccff,
    })
}
