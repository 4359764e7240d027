//! Configuration file support for Halflife.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/halflife/config.toml`.

use crate::profiles::{
    build_profile_table, ProfileTable, DEFAULT_BASELINE_LEVEL, DEFAULT_HALF_LIFE_HOURS,
};
use crate::types::{AbsorptionProfile, IntakeKind};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Pharmacokinetic model configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Elimination half-life applied to every kind
    #[serde(default = "default_half_life_hours")]
    pub default_half_life_hours: f64,

    /// Level treated as effectively zero for time-to-baseline
    #[serde(default = "default_baseline_level")]
    pub baseline_level: f64,

    /// Give up the time-to-baseline scan after this many hours
    #[serde(default = "default_baseline_cap_hours")]
    pub baseline_cap_hours: i64,

    /// Per-kind absorption overrides, e.g. `[model.profiles.vape]`.
    /// An entry replaces the built-in profile for that kind wholesale.
    #[serde(default)]
    pub profiles: HashMap<IntakeKind, AbsorptionProfile>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default_half_life_hours: default_half_life_hours(),
            baseline_level: default_baseline_level(),
            baseline_cap_hours: default_baseline_cap_hours(),
            profiles: HashMap::new(),
        }
    }
}

impl ModelConfig {
    /// Build the absorption table: built-in per-kind shapes at the
    /// configured half-life, with any `[model.profiles.*]` entries layered
    /// on top
    pub fn profile_table(&self) -> ProfileTable {
        let mut table = build_profile_table(self.default_half_life_hours);
        for (kind, profile) in &self.profiles {
            table.insert(*kind, *profile);
        }
        table
    }
}

/// Query clamping bounds applied by the CLI before invoking the engine
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_window_hours")]
    pub max_window_hours: i64,

    #[serde(default = "default_min_step_minutes")]
    pub min_step_minutes: u32,

    #[serde(default = "default_max_step_minutes")]
    pub max_step_minutes: u32,

    #[serde(default = "default_max_days")]
    pub max_days: i64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_window_hours: default_max_window_hours(),
            min_step_minutes: default_min_step_minutes(),
            max_step_minutes: default_max_step_minutes(),
            max_days: default_max_days(),
        }
    }
}

impl LimitsConfig {
    // The bounds come from a user-edited config file, so each clamp repairs
    // degenerate limits (zero maxima, min above max) instead of letting
    // `clamp` assert on an inverted range.
    pub fn clamp_hours(&self, hours: i64) -> i64 {
        hours.clamp(1, self.max_window_hours.max(1))
    }

    pub fn clamp_step_minutes(&self, step_minutes: u32) -> u32 {
        let min = self.min_step_minutes.max(1);
        let max = self.max_step_minutes.max(min);
        step_minutes.clamp(min, max)
    }

    pub fn clamp_days(&self, days: i64) -> i64 {
        days.clamp(1, self.max_days.max(1))
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        let home = std::env::var("HOME").expect("HOME environment variable not set");
        PathBuf::from(home).join(".local/share")
    });
    base.join("halflife")
}

fn default_half_life_hours() -> f64 {
    DEFAULT_HALF_LIFE_HOURS
}

fn default_baseline_level() -> f64 {
    DEFAULT_BASELINE_LEVEL
}

fn default_baseline_cap_hours() -> i64 {
    48
}

fn default_max_window_hours() -> i64 {
    168
}

fn default_min_step_minutes() -> u32 {
    5
}

fn default_max_step_minutes() -> u32 {
    240
}

fn default_max_days() -> i64 {
    90
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            let home = std::env::var("HOME").expect("HOME environment variable not set");
            PathBuf::from(home).join(".config")
        });
        base.join("halflife").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
