//! Configuration module for CornCob.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation, defaults, and a builder pattern for
//! programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration for a CornCob client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub graph: GraphConfig,
    pub retry: RetryConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            graph: GraphConfig::default(),
            retry: RetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Local commit-graph and scratch-directory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Root directory holding the local commit graph.
    pub root: PathBuf,
    /// Conventional branch name the protocol publishes (`SPEC_FULL.md` §4.3).
    pub default_branch: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            default_branch: "main".to_string(),
        }
    }
}

/// Retry/backoff tuning for transient adapter failures (`SPEC_FULL.md` §4.4's
/// retry policy, applied by `corncob-engine`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 16_000,
        }
    }
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Tries to load from `path`; falls back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Resolves the default config file location: `$XDG_CONFIG_HOME/corncob/config.yaml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("corncob").join("config.yaml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.graph.default_branch, "main");
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn load_or_default_falls_back_on_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/corncob.yaml"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn round_trips_through_yaml() {
        let config = Config::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, serde_yaml::to_string(&config).unwrap()).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.graph.default_branch, config.graph.default_branch);
    }
}
