//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/callpulse/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/callpulse/` (~/.config/callpulse/)
//! - Data: `$XDG_DATA_HOME/callpulse/` (~/.local/share/callpulse/)
//! - State/Logs: `$XDG_STATE_HOME/callpulse/` (~/.local/state/callpulse/)

use crate::analytics::{DashboardOptions, ValidationMode};
use crate::error::{Error, Result};
use crate::types::Granularity;
use serde::Deserialize;
use std::path::{Path, PathBuf};

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
    /// Aggregation engine configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// Dashboard defaults
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Aggregation engine configuration
#[derive(Debug, Deserialize, Default)]
pub struct EngineConfig {
    /// What to do with records whose period is malformed: "skip" or "strict"
    #[serde(default)]
    pub validation: ValidationMode,
}

/// Dashboard defaults
#[derive(Debug, Deserialize, Default)]
pub struct DashboardConfig {
    /// Metric selected when no metric is given
    pub default_metric: Option<String>,

    /// Granularity forced on metric selection instead of each metric's default
    pub granularity_override: Option<Granularity>,
}

/// Storage configuration
#[derive(Debug, Deserialize, Default)]
pub struct StorageConfig {
    /// Override for the SQLite database location
    pub database_path: Option<PathBuf>,
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
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if let Some(id) = &self.dashboard.default_metric {
            if id.trim().is_empty() {
                return Err(Error::Config(
                    "dashboard.default_metric must not be empty".to_string(),
                ));
            }
        }
        if self.logging.max_files == 0 {
            return Err(Error::Config(
                "logging.max_files must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Dashboard options derived from this configuration
    pub fn dashboard_options(&self) -> DashboardOptions {
        DashboardOptions {
            validation: self.engine.validation,
            granularity_override: self.dashboard.granularity_override,
        }
    }

    /// Database path, honoring `storage.database_path`
    pub fn resolved_database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(Self::database_path)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/callpulse/config.toml` (~/.config/callpulse/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("callpulse").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/callpulse/` (~/.local/share/callpulse/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("callpulse")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/callpulse/` (~/.local/state/callpulse/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("callpulse")
    }

    /// Returns the default database file path
    ///
    /// `$XDG_DATA_HOME/callpulse/kpi.db` (~/.local/share/callpulse/kpi.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("kpi.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.engine.validation, ValidationMode::Skip);
        assert!(config.dashboard.default_metric.is_none());
        assert!(config.dashboard.granularity_override.is_none());
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[engine]
validation = "strict"

[dashboard]
default_metric = "aht"
granularity_override = "half_year"

[storage]
database_path = "/tmp/kpi.db"

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.engine.validation, ValidationMode::Strict);
        assert_eq!(config.dashboard.default_metric.as_deref(), Some("aht"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.resolved_database_path(), PathBuf::from("/tmp/kpi.db"));

        let options = config.dashboard_options();
        assert_eq!(options.validation, ValidationMode::Strict);
        assert_eq!(options.granularity_override, Some(Granularity::HalfYear));
    }

    #[test]
    fn test_invalid_granularity_rejected() {
        let toml = r#"
[dashboard]
granularity_override = "week"
"#;
        assert!(toml::from_str::<Config>(toml).is_err());

        let toml = "[dashboard]\ngranularity_override = \"halfyear\"\n";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.dashboard.granularity_override, Some(Granularity::HalfYear));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[logging]\nmax_files = 0\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));

        std::fs::write(&path, "[engine]\nvalidation = \"skip\"\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.engine.validation, ValidationMode::Skip);
    }
}
