//! Application configuration management.
//!
//! This module handles loading and saving the local configuration, which
//! holds the backend base URL and the last used email.
//!
//! Configuration is stored at `~/.config/segnala/config.json`. The
//! `SEGNALA_API_URL` environment variable overrides the stored base URL.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application name used for config/state directory paths
const APP_NAME: &str = "segnala";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable that overrides the configured base URL.
pub const API_URL_ENV: &str = "SEGNALA_API_URL";

/// A broken base URL is unrecoverable at runtime; callers are expected to
/// abort startup with the message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no backend base URL configured; set {API_URL_ENV} or add base_url to the config file")]
    MissingBaseUrl,
    #[error("invalid backend base URL {0:?}: expected an http:// or https:// address")]
    InvalidBaseUrl(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub base_url: Option<String>,
    pub last_email: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Resolve the backend base URL: environment first, then the config file.
    pub fn backend_base(&self) -> Result<String, ConfigError> {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                return normalize_base(&url);
            }
        }
        match &self.base_url {
            Some(url) => normalize_base(url),
            None => Err(ConfigError::MissingBaseUrl),
        }
    }
}

/// Directory for persisted session state (`~/.local/share/segnala` on Linux).
pub fn state_dir() -> Result<PathBuf> {
    let data_dir =
        dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
    Ok(data_dir.join(APP_NAME))
}

fn normalize_base(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingBaseUrl);
    }
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(ConfigError::InvalidBaseUrl(trimmed.to_string()));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}
