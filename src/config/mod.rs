//! Configuration module - environment variable parsing and arena constants

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geometry::{Aabb, Vector2};

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Seed for the demo input source; random when unset
    pub seed: Option<u64>,
    /// Arena constants handed to the match at construction
    pub arena: ArenaConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut arena = match env::var("ARENA_CONFIG") {
            Ok(path) => ArenaConfig::from_json_file(PathBuf::from(path))?,
            Err(_) => ArenaConfig::default(),
        };

        if let Some(secs) = parse_var::<f64>("MATCH_DURATION_SECS")? {
            arena.match_duration_secs = secs;
        }
        if let Some(secs) = parse_var::<f64>("COUNTDOWN_SECS")? {
            arena.countdown_secs = secs;
        }

        arena.validate()?;

        Ok(Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            seed: parse_var("MATCH_SEED")?,
            arena,
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => {
            let parsed = raw.trim().parse::<T>();
            parsed
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue { var: name, value: raw })
        }
        Err(_) => Ok(None),
    }
}

/// Damage, guard and combo tuning shared by every combatant in a match
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatRules {
    /// Max gap between two hits by the same attacker that keeps a combo alive
    pub combo_window_ms: f64,
    /// Damage multiplier added per combo hit after the first
    pub combo_multiplier_step: f64,
    /// Ceiling for the combo damage multiplier
    pub combo_multiplier_cap: f64,
    /// Fraction of raw damage taken when a hit is guarded
    pub guard_damage_fraction: f64,
    /// Fraction of knockback taken when a hit is guarded
    pub guard_knockback_fraction: f64,
    /// Meter granted for a successful guard
    pub guard_meter_refund: f64,
}

impl Default for CombatRules {
    fn default() -> Self {
        Self {
            combo_window_ms: 2000.0,
            combo_multiplier_step: 0.1,
            combo_multiplier_cap: 2.0,
            guard_damage_fraction: 0.3,
            guard_knockback_fraction: 0.2,
            guard_meter_refund: 5.0,
        }
    }
}

/// Arena constants. Not negotiated at runtime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Playable area combatants are clamped into (sides and ceiling)
    pub bounds: Aabb,
    /// Height of the ground plane
    pub ground_y: f64,
    /// Leaving this rectangle is an instant KO
    pub ring_out: Aabb,
    /// Attack entities outside this rectangle are destroyed
    pub world_bounds: Aabb,
    /// Downward acceleration applied to airborne combatants
    pub gravity: f64,
    /// Countdown before the match becomes active (seconds)
    pub countdown_secs: f64,
    /// Match clock start value (seconds)
    pub match_duration_secs: f64,
    /// Spawn positions for the left and right combatant
    pub spawn_points: [Vector2; 2],
    pub combat: CombatRules,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            bounds: Aabb::new(50.0, 50.0, 1150.0, 550.0),
            ground_y: 500.0,
            ring_out: Aabb::new(0.0, -1.0e6, 1200.0, 650.0),
            world_bounds: Aabb::new(-100.0, -100.0, 1300.0, 700.0),
            gravity: 800.0,
            countdown_secs: 3.0,
            match_duration_secs: 99.0,
            spawn_points: [Vector2::new(200.0, 400.0), Vector2::new(1000.0, 400.0)],
            combat: CombatRules::default(),
        }
    }
}

impl ArenaConfig {
    /// Read an arena definition from a JSON file. Missing fields fall back
    /// to the defaults.
    pub fn from_json_file(path: PathBuf) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Reject arenas the simulation cannot run in
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, rect) in [
            ("bounds", &self.bounds),
            ("ring_out", &self.ring_out),
            ("world_bounds", &self.world_bounds),
        ] {
            if !rect.is_well_formed() || rect.width() <= 0.0 || rect.height() <= 0.0 {
                return Err(ConfigError::InvalidArena(format!("{name} rectangle is empty or inverted")));
            }
        }

        if !(self.gravity.is_finite() && self.gravity >= 0.0) {
            return Err(ConfigError::InvalidArena("gravity must be finite and non-negative".into()));
        }
        if !(self.match_duration_secs > 0.0) {
            return Err(ConfigError::InvalidArena("match duration must be positive".into()));
        }
        if !(self.countdown_secs >= 0.0) {
            return Err(ConfigError::InvalidArena("countdown must not be negative".into()));
        }

        let rules = &self.combat;
        if !(rules.combo_window_ms > 0.0) {
            return Err(ConfigError::InvalidArena("combo window must be positive".into()));
        }
        if !(rules.combo_multiplier_cap >= 1.0) || !(rules.combo_multiplier_step >= 0.0) {
            return Err(ConfigError::InvalidArena("combo multiplier must not shrink damage".into()));
        }
        for (name, fraction) in [
            ("guard_damage_fraction", rules.guard_damage_fraction),
            ("guard_knockback_fraction", rules.guard_knockback_fraction),
        ] {
            if !(0.0..=1.0).contains(&fraction) {
                return Err(ConfigError::InvalidArena(format!("{name} must be within [0, 1]")));
            }
        }
        if !(rules.guard_meter_refund >= 0.0) {
            return Err(ConfigError::InvalidArena("guard meter refund must not be negative".into()));
        }

        Ok(())
    }
}

/// Configuration errors. Fatal at construction time.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed arena definition: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid arena: {0}")]
    InvalidArena(String),

    #[error("Invalid archetype {name}: {reason}")]
    InvalidArchetype { name: String, reason: String },
}
