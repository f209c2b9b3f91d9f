//! Configuration resolution for fanmux.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Config file (`--config` or `FANMUX_CONFIG`)
//! 3. Environment variables
//! 4. CLI arguments (highest priority, applied by the binary)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Complete fanmux configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub multiplexer: MultiplexerConfig,
}

/// Session defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiplexerConfig {
    /// Default per-step timeout in milliseconds. `None` waits indefinitely.
    pub timeout_ms: Option<u64>,
    /// Buffered events per producer before its emitter waits.
    pub producer_capacity: usize,
}

impl Default for MultiplexerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            producer_capacity: 16,
        }
    }
}

impl MultiplexerConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Reject values a session could not run with.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == Some(0) {
            return Err(Error::Configuration(
                "timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.producer_capacity == 0 {
            return Err(Error::Configuration(
                "producer_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.multiplexer.validate()
    }
}

/// Load configuration with hierarchical resolution.
///
/// An explicit `path` must exist; the `FANMUX_CONFIG` fallback is skipped
/// when the file it names is missing.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(path) = path {
        config = load_config_file(path)?;
    } else if let Some(env_path) = std::env::var_os("FANMUX_CONFIG").map(PathBuf::from)
        && env_path.exists()
    {
        config = load_config_file(&env_path)?;
    }

    apply_env_overrides(&mut config);
    config.validate()?;

    Ok(config)
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Configuration(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Configuration(format!(
            "Failed to parse config file {}: {}",
            path.display(),
            e
        ))
    })
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(val) = std::env::var("FANMUX_TIMEOUT_MS")
        && let Ok(n) = val.parse()
    {
        config.multiplexer.timeout_ms = Some(n);
    }
    if let Ok(val) = std::env::var("FANMUX_PRODUCER_CAPACITY")
        && let Ok(n) = val.parse()
    {
        config.multiplexer.producer_capacity = n;
    }
}
