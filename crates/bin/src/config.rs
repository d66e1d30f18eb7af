//! CLI configuration file.
//!
//! A JSON file with optional `engine`, `valuation` and `batch` sections.
//! Missing sections and fields take their defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use vantage::metrics::EngineConfig;
use vantage::valuation::ValuationConfig;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    /// Config file could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Config file is not valid JSON.
    #[error("invalid config {path}: {source}")]
    Json {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
}

/// Batch runner settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct BatchConfig {
    /// Contexts evaluated concurrently.
    pub concurrency: usize,
    /// Per-context time limit in milliseconds.
    pub timeout_ms: u64,
}

impl BatchConfig {
    pub(crate) const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            timeout_ms: 5_000,
        }
    }
}

/// All CLI settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct CliConfig {
    pub engine: EngineConfig,
    pub valuation: ValuationConfig,
    pub batch: BatchConfig,
}

impl CliConfig {
    /// Load `path` if given, else the default config file if it exists, else
    /// defaults.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_path(path),
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::from_path(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }
}

/// Get the default config file path.
///
/// Uses platform-specific config directories:
/// - Linux: `~/.config/vantage/config.json`
/// - macOS: `~/Library/Application Support/vantage/config.json`
/// - Windows: `%APPDATA%\vantage\config.json`
pub(crate) fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("vantage").join("config.json"))
}
