//! Application configuration management.
//!
//! This module handles loading the application configuration:
//! the backend API base, the login page location, which paths skip the
//! session check, and where the token is kept.
//!
//! Configuration is stored at `~/.config/sessiongate/config.json`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "sessiongate";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `api_base`
pub const ENV_API_BASE: &str = "SESSIONGATE_API_BASE";

/// Environment variable overriding `store`
pub const ENV_STORE: &str = "SESSIONGATE_STORE";

const DEFAULT_API_BASE: &str = "http://localhost:8000/api";
const DEFAULT_LOGIN_PATH: &str = "/login.html";
const DEFAULT_LANDING_PATH: &str = "/";

/// How long the session check waits for `/auth/me` before giving up
const DEFAULT_VALIDATION_TIMEOUT_SECS: u64 = 5;

/// Where the bearer token is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Keyring,
    File,
}

impl std::str::FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyring" => Ok(StoreKind::Keyring),
            "file" => Ok(StoreKind::File),
            other => Err(anyhow::anyhow!("Unknown token store: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base: String,
    pub login_path: String,
    pub exempt_paths: Vec<String>,
    pub validation_timeout_secs: u64,
    pub store: StoreKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            exempt_paths: vec![
                DEFAULT_LANDING_PATH.to_string(),
                DEFAULT_LOGIN_PATH.to_string(),
            ],
            validation_timeout_secs: DEFAULT_VALIDATION_TIMEOUT_SECS,
            store: StoreKind::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply `SESSIONGATE_*` environment overrides
    pub fn apply_env(&mut self) {
        if let Ok(base) = std::env::var(ENV_API_BASE) {
            self.api_base = base;
        }
        if let Ok(store) = std::env::var(ENV_STORE) {
            match store.parse() {
                Ok(kind) => self.store = kind,
                Err(e) => warn!(error = %e, "Ignoring {}", ENV_STORE),
            }
        }
    }

    pub fn validation_timeout(&self) -> Duration {
        Duration::from_secs(self.validation_timeout_secs)
    }

    /// Full URL for an endpoint under the API base
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
