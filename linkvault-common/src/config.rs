//! Configuration for the LinkVault bot.
//!
//! Configuration is read from `~/.linkvault/config.json` when the file
//! exists, then overridden by environment variables:
//!
//! - `TELEGRAM_BOT_TOKEN` → telegram.bot_token
//! - `LINKVAULT_DB_PATH` → storage.db_path
//! - `LINKVAULT_LOG_LEVEL` → observability.log_level
//! - `LINKVAULT_LOG_FORMAT` → observability.log_format

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".linkvault"),
        |dirs| dirs.home_dir().join(".linkvault"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Top-level bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Telegram credentials
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Link storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Telegram bot credentials.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelegramConfig {
    /// Bot API token from @BotFather
    #[serde(default)]
    pub bot_token: String,
}

/// Link storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    config_dir().join("links.db")
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Base log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Output format: "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

impl Config {
    /// Load configuration: file values first, then environment overrides.
    pub fn load() -> Result<Self> {
        let path = config_path();
        let mut config = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Ok(db_path) = std::env::var("LINKVAULT_DB_PATH") {
            self.storage.db_path = PathBuf::from(db_path);
        }
        if let Ok(level) = std::env::var("LINKVAULT_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(format) = std::env::var("LINKVAULT_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }

    /// The bot cannot run without a token; refuse to start rather than
    /// poll with empty credentials.
    fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.is_empty() {
            anyhow::bail!(
                "TELEGRAM_BOT_TOKEN is not set (environment variable or telegram.bot_token in {})",
                config_path().display()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(config.telegram.bot_token.is_empty());
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.observability.log_format, "pretty");
        assert!(config.storage.db_path.ends_with("links.db"));
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"telegram": {"bot_token": "123:ABC"}, "observability": {"log_level": "debug"}}"#,
        )
        .unwrap();
        assert_eq!(config.telegram.bot_token, "123:ABC");
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.observability.log_format, "pretty");
    }

    #[test]
    fn missing_token_fails_validation() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn present_token_passes_validation() {
        let mut config = Config::default();
        config.telegram.bot_token = "123:ABC".into();
        assert!(config.validate().is_ok());
    }
}
