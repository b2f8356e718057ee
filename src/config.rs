//! Consolidator configuration management

use crate::consolidation::rules::{default_rules, ConsolidationRule, MinerThresholds};
use crate::error::{Error, Result};
use crate::memory::Framework;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main Consolidator configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidatorConfig {
    /// Memory API gateway configuration
    pub gateway: GatewayConfig,

    /// Pattern mining and ranking configuration
    pub mining: MiningConfig,

    /// Periodic consolidation schedule
    pub schedule: ScheduleConfig,
}

impl ConsolidatorConfig {
    /// Load a TOML configuration file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, else from the default location if it exists,
    /// else fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load(path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.gateway.validate()?;
        self.mining.validate()?;
        self.schedule.validate()
    }
}

/// Default config file location: `<config dir>/consolidator/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|dir| dir.join("consolidator").join("config.toml"))
}

/// Memory API gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of the memory API
    pub api_base_url: String,

    /// Per-call timeout in seconds
    pub call_timeout_secs: u64,

    /// Maximum episodic entries fetched per run
    pub fetch_limit: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            call_timeout_secs: 10,
            fetch_limit: 100,
        }
    }
}

impl GatewayConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(Error::Config("gateway.api_base_url must not be empty".to_string()));
        }
        if self.call_timeout_secs == 0 {
            return Err(Error::Config("gateway.call_timeout_secs must be > 0".to_string()));
        }
        if self.fetch_limit == 0 {
            return Err(Error::Config("gateway.fetch_limit must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Pattern mining and ranking configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Patterns below this confidence are discarded
    pub min_confidence: f32,

    /// Maximum patterns kept per run
    pub max_patterns: usize,

    /// Importance added to an episodic entry per referencing pattern,
    /// multiplied by that pattern's confidence
    pub importance_boost_factor: f32,

    /// Rules resolving the miner thresholds
    pub rules: Vec<ConsolidationRule>,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            max_patterns: 10,
            importance_boost_factor: 0.2,
            rules: default_rules(),
        }
    }
}

impl MiningConfig {
    /// Thresholds the miners run with
    pub fn thresholds(&self) -> MinerThresholds {
        MinerThresholds::from_rules(&self.rules)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(Error::Config(format!(
                "mining.min_confidence must be within 0.0..=1.0, got {}",
                self.min_confidence
            )));
        }
        if self.max_patterns == 0 {
            return Err(Error::Config("mining.max_patterns must be > 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.importance_boost_factor) {
            return Err(Error::Config(format!(
                "mining.importance_boost_factor must be within 0.0..=1.0, got {}",
                self.importance_boost_factor
            )));
        }
        for rule in &self.rules {
            rule.validate()?;
        }
        Ok(())
    }
}

/// Periodic consolidation schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Enable the scheduler
    pub enabled: bool,

    /// Seconds between consolidation rounds
    pub interval_secs: u64,

    /// Episodic window consolidated by each run, in hours
    pub window_hours: u64,

    /// Frameworks consolidated every round
    pub frameworks: Vec<Framework>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 86_400,
            window_hours: 24,
            frameworks: vec![Framework::Universal],
        }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_hours.saturating_mul(3600))
    }

    fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(Error::Config("schedule.interval_secs must be > 0".to_string()));
        }
        if self.window_hours == 0 {
            return Err(Error::Config("schedule.window_hours must be > 0".to_string()));
        }
        Ok(())
    }
}
