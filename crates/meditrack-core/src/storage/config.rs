//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Notification preferences
//! - Reminder and escalation offsets around the dose time
//! - Analytics trend depth
//!
//! Configuration is stored at `~/.config/meditrack/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, Result};
use crate::planner::{DEFAULT_FOLLOW_UP_MIN, DEFAULT_LEAD_MIN};
use crate::stats::DEFAULT_TREND_WEEKS;

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/meditrack/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub notifications: NotificationsConfig,
    /// Minutes before the dose time that the reminder fires.
    #[serde(default = "default_lead_min")]
    pub reminder_lead_min: i64,
    /// Minutes after the dose time that the escalation fires.
    #[serde(default = "default_follow_up_min")]
    pub escalation_delay_min: i64,
    /// Number of weekly buckets reported in the adherence trend.
    #[serde(default = "default_trend_weeks")]
    pub trend_weeks: usize,
}

fn default_true() -> bool {
    true
}
fn default_lead_min() -> i64 {
    DEFAULT_LEAD_MIN
}
fn default_follow_up_min() -> i64 {
    DEFAULT_FOLLOW_UP_MIN
}
fn default_trend_weeks() -> usize {
    DEFAULT_TREND_WEEKS
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            notifications: NotificationsConfig::default(),
            reminder_lead_min: DEFAULT_LEAD_MIN,
            escalation_delay_min: DEFAULT_FOLLOW_UP_MIN,
            trend_weeks: DEFAULT_TREND_WEEKS,
        }
    }
}

impl Config {
    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing the default config on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}
