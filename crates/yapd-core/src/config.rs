//! Runtime configuration.
//!
//! Non-secret settings live in `config.json` inside the config directory,
//! next to the encrypted `setup.json`. The config directory is taken from
//! `CONFIG_DIR` when set, otherwise `~/.config/yapd`. Session mirrors and
//! the dashboard unlock stamp go to the cache directory (`~/.cache/yapd`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "yapd";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Overrides the config directory (same variable the web deployment uses)
pub const CONFIG_DIR_ENV: &str = "CONFIG_DIR";

/// Overrides the cache directory
pub const CACHE_DIR_ENV: &str = "YAPD_CACHE_DIR";

pub const REQUEST_TIMEOUT_ENV: &str = "YAPD_REQUEST_TIMEOUT_SECS";
pub const ACCEPT_INVALID_CERTS_ENV: &str = "YAPD_ACCEPT_INVALID_CERTS";

/// Upstream request deadline in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

/// How long an unlocked dashboard stays unlocked.
const DEFAULT_DASHBOARD_UNLOCK_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub request_timeout_secs: u64,
    /// Trust policy for upstream TLS. Pi-hole ships a self-signed
    /// certificate, so the default accepts it.
    pub accept_invalid_certs: bool,
    pub dashboard_unlock_hours: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            accept_invalid_certs: true,
            dashboard_unlock_hours: DEFAULT_DASHBOARD_UNLOCK_HOURS,
        }
    }
}

impl Config {
    /// Load from the default config directory and apply environment overrides.
    pub fn load() -> Result<Self> {
        let dir = Self::config_dir()?;
        let mut config = Self::load_from(&dir)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_dir()?)
    }

    pub fn save_to(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join(CONFIG_FILE), contents)?;
        Ok(())
    }

    /// Apply `YAPD_*` overrides. Unparseable values are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(REQUEST_TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.request_timeout_secs = secs,
                _ => warn!(value = %raw, "Ignoring invalid {}", REQUEST_TIMEOUT_ENV),
            }
        }
        if let Some(raw) = lookup(ACCEPT_INVALID_CERTS_ENV) {
            match parse_bool(&raw) {
                Some(accept) => self.accept_invalid_certs = accept,
                None => warn!(value = %raw, "Ignoring invalid {}", ACCEPT_INVALID_CERTS_ENV),
            }
        }
    }

    pub fn config_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME))
    }

    pub fn cache_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var(CACHE_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn dashboard_unlock_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.dashboard_unlock_hours.max(0))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
