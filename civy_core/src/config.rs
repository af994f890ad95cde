//! Configuration file support for Civy.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/civy/config.toml`.

use crate::{Error, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub economy: EconomyConfig,
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

impl DataConfig {
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("ledger.json")
    }

    pub fn journal_path(&self) -> PathBuf {
        self.data_dir.join("journal.jsonl")
    }
}

/// Amounts and cooldown windows of the economy
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EconomyConfig {
    /// Gold credited to a newly opened account
    #[serde(default = "default_starting_gold")]
    pub starting_gold: u64,

    #[serde(default = "default_mine_amount")]
    pub mine_amount: u32,

    #[serde(default = "default_mine_cooldown_secs")]
    pub mine_cooldown_secs: u32,

    #[serde(default = "default_daily_amount")]
    pub daily_amount: u32,

    #[serde(default = "default_daily_cooldown_hours")]
    pub daily_cooldown_hours: u32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_gold: default_starting_gold(),
            mine_amount: default_mine_amount(),
            mine_cooldown_secs: default_mine_cooldown_secs(),
            daily_amount: default_daily_amount(),
            daily_cooldown_hours: default_daily_cooldown_hours(),
        }
    }
}

impl EconomyConfig {
    pub fn mine_cooldown(&self) -> Duration {
        Duration::seconds(i64::from(self.mine_cooldown_secs))
    }

    pub fn daily_cooldown(&self) -> Duration {
        Duration::hours(i64::from(self.daily_cooldown_hours))
    }

    /// Check that every grant is positive and both windows stay within bounds
    pub fn validate(&self) -> Result<()> {
        if self.mine_amount == 0 {
            return Err(Error::Config("economy.mine_amount must be positive".into()));
        }
        if self.daily_amount == 0 {
            return Err(Error::Config("economy.daily_amount must be positive".into()));
        }
        if self.mine_cooldown_secs > MAX_MINE_COOLDOWN_SECS {
            return Err(Error::Config(format!(
                "economy.mine_cooldown_secs must be at most {}",
                MAX_MINE_COOLDOWN_SECS
            )));
        }
        if self.daily_cooldown_hours == 0 || self.daily_cooldown_hours > MAX_DAILY_COOLDOWN_HOURS {
            return Err(Error::Config(format!(
                "economy.daily_cooldown_hours must be between 1 and {}",
                MAX_DAILY_COOLDOWN_HOURS
            )));
        }
        Ok(())
    }
}

/// One day
const MAX_MINE_COOLDOWN_SECS: u32 = 86_400;

/// One leap year
const MAX_DAILY_COOLDOWN_HOURS: u32 = 8_784;

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("civy")
}

fn default_starting_gold() -> u64 {
    100
}

fn default_mine_amount() -> u32 {
    10
}

fn default_mine_cooldown_secs() -> u32 {
    30
}

fn default_daily_amount() -> u32 {
    100
}

fn default_daily_cooldown_hours() -> u32 {
    24
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.economy.validate()
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("civy").join("config.toml")
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
