//! Configuration management for pensum

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::timer::TimeValue;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Default timer duration used when creating a timer without an
    /// explicit configuration
    #[serde(default = "default_timer_hours")]
    pub default_timer_hours: u8,
    #[serde(default = "default_timer_minutes")]
    pub default_timer_minutes: u8,
    #[serde(default = "default_timer_seconds")]
    pub default_timer_seconds: u8,

    /// Countdown advance interval in seconds (default: 1)
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,

    /// Log file retention in days (default: 7)
    #[serde(default = "default_log_retention_days")]
    pub log_retention_days: u64,
}

fn default_timer_hours() -> u8 {
    0
}

fn default_timer_minutes() -> u8 {
    3
}

fn default_timer_seconds() -> u8 {
    5
}

fn default_tick_interval() -> u64 {
    1
}

fn default_log_retention_days() -> u64 {
    7
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_timer_hours: default_timer_hours(),
            default_timer_minutes: default_timer_minutes(),
            default_timer_seconds: default_timer_seconds(),
            tick_interval_secs: default_tick_interval(),
            log_retention_days: default_log_retention_days(),
        }
    }
}

impl Config {
    /// Load configuration from file, or return default if not found
    pub fn load() -> Result<Self> {
        let path = config_file_path();
        if path.exists() {
            let content = std::fs::read_to_string(&path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let path = config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// The configured default timer duration as a TimeValue
    pub fn default_timer_value(&self) -> TimeValue {
        TimeValue::from_parts(
            self.default_timer_hours,
            self.default_timer_minutes,
            self.default_timer_seconds,
        )
    }
}

/// Get the base configuration directory (~/.pensum)
/// Falls back to ./.pensum if home directory cannot be determined
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| {
        tracing::warn!("Could not determine home directory, using current directory for config");
        PathBuf::from(".pensum")
    })
}

/// Try to get the base configuration directory, returning None if home dir is unavailable
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".pensum"))
}

/// Get the path to the config file
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Get the path to the data directory (persisted timers and subjects)
pub fn data_dir() -> PathBuf {
    config_dir().join("data")
}

/// Get the path to the logs directory
pub fn logs_dir() -> PathBuf {
    config_dir().join("logs")
}

/// Ensure all required directories exist
pub fn ensure_directories() -> Result<()> {
    std::fs::create_dir_all(config_dir()).context("Failed to create config directory")?;

    std::fs::create_dir_all(data_dir()).context("Failed to create data directory")?;

    std::fs::create_dir_all(logs_dir()).context("Failed to create logs directory")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.default_timer_hours, 0);
        assert_eq!(config.default_timer_minutes, 3);
        assert_eq!(config.default_timer_seconds, 5);
        assert_eq!(config.tick_interval_secs, 1);
    }

    #[test]
    fn test_default_timer_value() {
        let config = Config::default();
        let value = config.default_timer_value();
        assert_eq!(value.total_seconds(), 3 * 60 + 5);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.default_timer_minutes, parsed.default_timer_minutes);
        assert_eq!(config.tick_interval_secs, parsed.tick_interval_secs);
    }

    #[test]
    fn test_partial_config_uses_field_defaults() {
        let parsed: Config = toml::from_str("default_timer_minutes = 25").unwrap();
        assert_eq!(parsed.default_timer_minutes, 25);
        assert_eq!(parsed.default_timer_seconds, 5);
        assert_eq!(parsed.tick_interval_secs, 1);
    }

    #[test]
    fn test_config_dir_does_not_panic() {
        let dir = config_dir();
        assert!(dir.ends_with(".pensum"));
    }

    #[test]
    fn test_data_and_logs_dirs_nest_under_config() {
        assert!(data_dir().starts_with(config_dir()));
        assert!(logs_dir().starts_with(config_dir()));
    }
}
