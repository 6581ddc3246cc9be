use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::knowledge::ranking;
use crate::knowledge::tier::TierThresholds;
use crate::knowledge::write::SuggestionSettings;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TenetConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub suggestion: SuggestionConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SuggestionConfig {
    pub thresholds: TierThresholds,
    pub default_limit: usize,
    pub default_min_score: f64,
}

impl Default for TenetConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            suggestion: SuggestionConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            host: "127.0.0.1".into(),
            port: 8217,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_tenet_dir()
            .join("knowledge.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            thresholds: TierThresholds::default(),
            default_limit: ranking::DEFAULT_LIMIT,
            default_min_score: ranking::DEFAULT_MIN_SCORE,
        }
    }
}

/// Returns `~/.tenet/`
pub fn default_tenet_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".tenet")
}

/// Returns the default config file path: `~/.tenet/config.toml`
pub fn default_config_path() -> PathBuf {
    default_tenet_dir().join("config.toml")
}

impl TenetConfig {
    /// Load config from TOML file (if it exists), apply env var overrides,
    /// then validate. Invalid tier thresholds are fatal here — before any
    /// request is served.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides and validate.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            TenetConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides (TENET_DB, TENET_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TENET_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("TENET_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    /// Startup-time validation.
    pub fn validate(&self) -> Result<()> {
        if let Err(e) = self.suggestion.thresholds.validate() {
            bail!("invalid configuration: {e}");
        }
        if self.suggestion.default_limit == 0 {
            bail!("invalid configuration: suggestion.default_limit must be at least 1");
        }
        Ok(())
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// The per-request suggestion settings derived from this config.
    pub fn suggestion_settings(&self) -> SuggestionSettings {
        SuggestionSettings {
            thresholds: self.suggestion.thresholds,
            limit: self.suggestion.default_limit,
            min_score: self.suggestion.default_min_score,
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = TenetConfig::default();
        assert_eq!(config.server.transport, "stdio");
        assert_eq!(config.server.log_level, "info");
        assert!(config.storage.db_path.ends_with("knowledge.db"));
        assert_eq!(config.suggestion.thresholds.gentle_nudge, 35.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"

[storage]
db_path = "/tmp/test.db"

[suggestion]
default_limit = 10

[suggestion.thresholds]
gentle_nudge = 30.0
"#;
        let config: TenetConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(config.suggestion.default_limit, 10);
        assert_eq!(config.suggestion.thresholds.gentle_nudge, 30.0);
        // defaults still apply for unset fields
        assert_eq!(config.suggestion.thresholds.hard_block, 45.0);
    }

    #[test]
    fn misordered_thresholds_fail_validation() {
        let toml_str = r#"
[suggestion.thresholds]
gentle_nudge = 70.0
hard_block = 45.0
auto_update = 60.0
"#;
        let config: TenetConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = TenetConfig::default();
        std::env::set_var("TENET_DB", "/tmp/override.db");
        std::env::set_var("TENET_LOG_LEVEL", "trace");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.server.log_level, "trace");

        // Clean up
        std::env::remove_var("TENET_DB");
        std::env::remove_var("TENET_LOG_LEVEL");
    }
}
