//! Configuration system
//!
//! Loads configuration from a TOML file with serde defaults. Pool size,
//! the split-execution flag, and backend selection all live here and are
//! passed explicitly to the components that need them, never read from
//! process-wide state.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file read error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}

/// Backend selection and pool sizing
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Registered backend kind to build the pool from
    #[serde(default = "default_backend_kind")]
    pub kind: String,

    /// Number of pre-established connection handles
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Whether eligible time-range scans are split across the pool
    #[serde(default = "default_split_enabled")]
    pub split_enabled: bool,
}

fn default_backend_kind() -> String {
    "memory".to_string()
}

fn default_pool_size() -> usize {
    10
}

fn default_split_enabled() -> bool {
    false
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: default_backend_kind(),
            pool_size: default_pool_size(),
            split_enabled: default_split_enabled(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON-formatted events
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "flowquery=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
