// Single shared passphrase guarding the dashboard itself.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{debug, info};

use crate::api::ApiError;
use crate::models::{normalize_url, SetupConfig};

use super::manager::SessionManager;

/// Unlock stamp file name in cache directory
const UNLOCK_FILE: &str = "dashboard.json";

/// Endpoint name used in errors about the dashboard password itself
const DASHBOARD: &str = "dashboard";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UnlockStamp {
    unlocked_at: DateTime<Utc>,
}

impl UnlockStamp {
    fn is_expired(&self, ttl: Duration) -> bool {
        Utc::now() > self.unlocked_at + ttl
    }
}

/// How the dashboard password is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateMode {
    /// No password configured
    Open,
    /// Password is the Pi-hole password of this endpoint
    PiholeAuth(String),
    /// Password is the stored yapd password
    Password(String),
}

pub struct DashboardGate {
    sessions: Arc<SessionManager>,
    stamp_path: PathBuf,
    ttl: Duration,
}

impl DashboardGate {
    pub fn new(sessions: Arc<SessionManager>, cache_dir: &Path, ttl: Duration) -> Self {
        Self {
            sessions,
            stamp_path: cache_dir.join(UNLOCK_FILE),
            ttl,
        }
    }

    /// Fails when a store exists but cannot be read, so a wrong
    /// passphrase never opens the dashboard.
    pub fn mode(&self) -> Result<GateMode, ApiError> {
        let store = self.sessions.credentials();
        let config = match store.load() {
            Ok(config) => config,
            Err(e) if store.exists() => return Err(e.into()),
            Err(_) => SetupConfig::default(),
        };
        let settings = &config.settings;

        if settings.pihole_auth_enabled() {
            let url = settings
                .main_url
                .as_deref()
                .map(normalize_url)
                .or_else(|| config.endpoints.first().map(|e| e.url.clone()))
                .ok_or_else(|| {
                    ApiError::ConfigUnreadable(
                        "pi-hole auth is enabled but no endpoint is configured".to_string(),
                    )
                })?;
            return Ok(GateMode::PiholeAuth(url));
        }

        Ok(match settings.yapd_password {
            Some(ref password) if !password.is_empty() => GateMode::Password(password.clone()),
            _ => GateMode::Open,
        })
    }

    /// Check `password` and, on success, keep the dashboard unlocked for the TTL.
    pub async fn unlock(&self, password: &str) -> Result<()> {
        match self.mode()? {
            GateMode::Open => {}
            GateMode::PiholeAuth(url) => {
                self.sessions.login(&url, password).await?;
            }
            GateMode::Password(expected) => {
                if !password_matches(expected.as_bytes(), password.as_bytes()) {
                    return Err(ApiError::AuthRejected {
                        endpoint: DASHBOARD.to_string(),
                        message: "incorrect password".to_string(),
                    }
                    .into());
                }
            }
        }

        self.write_stamp()?;
        info!("Dashboard unlocked");
        Ok(())
    }

    pub fn is_unlocked(&self) -> bool {
        if matches!(self.mode(), Ok(GateMode::Open)) {
            return true;
        }
        match self.read_stamp() {
            Ok(Some(stamp)) => !stamp.is_expired(self.ttl),
            Ok(None) => false,
            Err(e) => {
                debug!(error = %e, "Unreadable unlock stamp");
                false
            }
        }
    }

    /// Forget the unlock stamp.
    pub fn lock(&self) -> Result<()> {
        if self.stamp_path.exists() {
            std::fs::remove_file(&self.stamp_path)?;
        }
        Ok(())
    }

    fn read_stamp(&self) -> Result<Option<UnlockStamp>> {
        if !self.stamp_path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.stamp_path)
            .context("Failed to read unlock stamp")?;
        Ok(Some(serde_json::from_str(&contents).context("Failed to parse unlock stamp")?))
    }

    fn write_stamp(&self) -> Result<()> {
        if let Some(parent) = self.stamp_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let stamp = UnlockStamp {
            unlocked_at: Utc::now(),
        };
        std::fs::write(&self.stamp_path, serde_json::to_string(&stamp)?)
            .context("Failed to write unlock stamp")?;
        Ok(())
    }
}

/// Compare a guess against the expected password. Work depends only on
/// the expected length.
fn password_matches(expected: &[u8], guess: &[u8]) -> bool {
    let mut padded = vec![0u8; expected.len()];
    let shared = expected.len().min(guess.len());
    padded[..shared].copy_from_slice(&guess[..shared]);

    let same_len = (expected.len() as u64).ct_eq(&(guess.len() as u64));
    bool::from(padded.as_slice().ct_eq(expected) & same_len)
}
