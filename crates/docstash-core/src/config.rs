//! Store configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/docstash/config.toml)
//! 3. Environment variables (DOCSTASH_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix
const ENV_PREFIX: &str = "DOCSTASH";

/// Default upper bound on writes per batch commit
pub const DEFAULT_MAX_BATCH_WRITES: usize = 500;

/// Store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of writes a single batch may commit
    #[serde(default = "default_max_batch_writes")]
    pub max_batch_writes: usize,

    /// JSON file used to seed a fresh store (CLI only)
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_batch_writes: DEFAULT_MAX_BATCH_WRITES,
            seed_file: None,
        }
    }
}

impl StoreConfig {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (DOCSTASH_MAX_BATCH_WRITES, DOCSTASH_SEED)
    /// 2. Config file (~/.config/docstash/config.toml or DOCSTASH_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: StoreConfig =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        // DOCSTASH_MAX_BATCH_WRITES
        if let Ok(val) = std::env::var(format!("{}_MAX_BATCH_WRITES", ENV_PREFIX)) {
            self.max_batch_writes = val
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}_MAX_BATCH_WRITES: {:?}", ENV_PREFIX, val))?;
        }

        // DOCSTASH_SEED
        if let Ok(val) = std::env::var(format!("{}_SEED", ENV_PREFIX)) {
            self.seed_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with DOCSTASH_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("docstash")
            .join("config.toml")
    }
}

fn default_max_batch_writes() -> usize {
    DEFAULT_MAX_BATCH_WRITES
}
