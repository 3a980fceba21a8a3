//! Tasklist configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::scheduler::AutoClearConfig;

/// Project-local config file name
pub const LOCAL_CONFIG: &str = ".tasklist.yml";

/// Main tasklist configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR); CLI flag wins
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Ask before clear-completed / clear-all
    #[serde(rename = "confirm-bulk")]
    pub confirm_bulk: bool,

    /// Where the list is persisted
    pub storage: StorageConfig,

    /// Auto-clear of completed items
    #[serde(rename = "auto-clear")]
    pub auto_clear: AutoClearConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: None,
            confirm_bulk: true,
            storage: StorageConfig::default(),
            auto_clear: AutoClearConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::candidates() {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", candidate.display(), e);
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are ignored here; `load` reports them once logging exists.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let paths = match config_path {
            Some(path) => vec![path.clone()],
            None => Self::candidates(),
        };
        paths
            .iter()
            .filter(|path| path.exists())
            .find_map(|path| Self::load_from_file(path).ok())
            .and_then(|config| config.log_level)
    }

    /// Implicit config locations, highest priority first
    fn candidates() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        // ~/.config/tasklist/tasklist.yml
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("tasklist").join("tasklist.yml"));
        }
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the store file; `~/` is expanded
    pub dir: String,

    /// Key prefix, so several lists can share one directory
    pub namespace: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // Use XDG data directory (~/.local/share/tasklist on Linux)
        let dir = dirs::data_dir()
            .map(|d| d.join("tasklist"))
            .unwrap_or_else(|| PathBuf::from(".tasklist"))
            .to_string_lossy()
            .into_owned();

        Self {
            dir,
            namespace: "tasklist".to_string(),
        }
    }
}

impl StorageConfig {
    /// Storage directory with `~/` resolved against the home directory
    pub fn expanded_dir(&self) -> PathBuf {
        match self.dir.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .map(|home| home.join(rest))
                .unwrap_or_else(|| PathBuf::from(&self.dir)),
            None => PathBuf::from(&self.dir),
        }
    }
}
