//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/footfall/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/footfall/` (~/.config/footfall/)
//! - Data: `$XDG_DATA_HOME/footfall/` (~/.local/share/footfall/)
//! - State/Logs: `$XDG_STATE_HOME/footfall/` (~/.local/state/footfall/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Rollup job configuration
    #[serde(default)]
    pub rollup: RollupConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Rollup job configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RollupConfig {
    /// Seconds between scheduled rollup runs
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Days of raw events kept after aggregation
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for RollupConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            retention_days: default_retention_days(),
        }
    }
}

// 60s stands in for a once-daily schedule in real deployments.
fn default_interval_secs() -> u64 {
    60
}

fn default_retention_days() -> u32 {
    7
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/footfall/config.toml` (~/.config/footfall/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("footfall").join("config.toml")
    }

    /// Returns the data directory path (for the SQLite database)
    ///
    /// `$XDG_DATA_HOME/footfall/` (~/.local/share/footfall/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("footfall")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/footfall/` (~/.local/state/footfall/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("footfall")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/footfall/analytics.db`
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("analytics.db")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/footfall/footfall.log`
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("footfall.log")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path
    /// behavior before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
