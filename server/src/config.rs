//! Game configuration.
//!
//! Loaded from a JSON file; every field has a default so an empty object is a
//! valid configuration. Per-team values fall back to the `default_*` fields.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use shared::constants::EXPLODE_TIME;
use shared::TeamColor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Side length of the square arena, centered on the origin.
    pub world_size: f32,
    /// Seconds of simulated time before the game ends.
    pub time_limit: f64,
    pub max_shots: usize,
    /// Seconds a tank stays dead before respawning.
    pub respawn_time: f32,
    pub friendly_fire: bool,
    pub default_tanks: usize,
    pub default_posnoise: f32,
    pub default_angnoise: f32,
    pub default_velnoise: f32,
    pub default_true_positive: f32,
    pub default_true_negative: f32,
    /// Edge length of the window returned by `occgrid`.
    pub occgrid_width: usize,
    pub no_report_obstacles: bool,
    pub puppy_guard_zone: f32,
    /// Seeds all simulation randomness when set.
    pub random_seed: Option<u64>,
    /// Target period of the simulation loop in milliseconds.
    pub loop_timeout_ms: u64,
    pub bind_host: String,
    pub teams: BTreeMap<TeamColor, TeamConfig>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            world_size: 800.0,
            time_limit: 300_000.0,
            max_shots: 10,
            respawn_time: EXPLODE_TIME,
            friendly_fire: false,
            default_tanks: 10,
            default_posnoise: 0.0,
            default_angnoise: 0.0,
            default_velnoise: 0.0,
            default_true_positive: 1.0,
            default_true_negative: 1.0,
            occgrid_width: 100,
            no_report_obstacles: false,
            puppy_guard_zone: 0.0,
            random_seed: None,
            loop_timeout_ms: 10,
            bind_host: "0.0.0.0".to_string(),
            teams: BTreeMap::new(),
        }
    }
}

/// Overrides for a single team. Unset fields use the game-wide defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamConfig {
    pub tanks: Option<usize>,
    /// Listening port; 0 or unset picks an ephemeral port.
    pub port: Option<u16>,
    pub posnoise: Option<f32>,
    pub angnoise: Option<f32>,
    pub velnoise: Option<f32>,
    pub true_positive: Option<f32>,
    pub true_negative: Option<f32>,
}

/// Gaussian standard deviations applied to what a team observes about others.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorNoise {
    pub posnoise: f32,
    pub angnoise: f32,
    /// Parsed and validated but not yet applied: no reply carries another
    /// team's velocity.
    pub velnoise: f32,
}

/// Team settings after applying defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamSettings {
    pub tanks: usize,
    pub port: u16,
    pub noise: SensorNoise,
    pub true_positive: f32,
    pub true_negative: f32,
}

impl GameConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: &str| ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.to_string(),
        };
        if !(self.world_size.is_finite() && self.world_size > 0.0) {
            return Err(invalid("world_size", "must be a positive number"));
        }
        if !(self.time_limit.is_finite() && self.time_limit > 0.0) {
            return Err(invalid("time_limit", "must be a positive number"));
        }
        if self.respawn_time < 0.0 {
            return Err(invalid("respawn_time", "must not be negative"));
        }
        if self.loop_timeout_ms == 0 {
            return Err(invalid("loop_timeout_ms", "must be at least 1"));
        }
        for color in TeamColor::ALL {
            let team = self.team(color);
            let noise = [team.noise.posnoise, team.noise.angnoise, team.noise.velnoise];
            if noise.iter().any(|n| !n.is_finite() || *n < 0.0) {
                return Err(invalid(
                    &format!("teams.{color}"),
                    "noise must be a non-negative number",
                ));
            }
            for p in [team.true_positive, team.true_negative] {
                if !(0.0..=1.0).contains(&p) {
                    return Err(invalid(
                        &format!("teams.{color}"),
                        "sensor probabilities must lie in [0, 1]",
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn team(&self, color: TeamColor) -> TeamSettings {
        let team = self.teams.get(&color).cloned().unwrap_or_default();
        TeamSettings {
            tanks: team.tanks.unwrap_or(self.default_tanks),
            port: team.port.unwrap_or(0),
            noise: SensorNoise {
                posnoise: team.posnoise.unwrap_or(self.default_posnoise),
                angnoise: team.angnoise.unwrap_or(self.default_angnoise),
                velnoise: team.velnoise.unwrap_or(self.default_velnoise),
            },
            true_positive: team.true_positive.unwrap_or(self.default_true_positive),
            true_negative: team.true_negative.unwrap_or(self.default_true_negative),
        }
    }
}
