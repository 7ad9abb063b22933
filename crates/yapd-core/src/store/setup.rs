use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::ApiError;
use crate::models::{normalize_url, EndpointConfig, GlobalSettings, SetupConfig};

use super::{write_atomic, CryptoError, SecretCipher};

/// Credential file name in the config directory
const SETUP_FILE: &str = "setup.json";

#[derive(Error, Debug)]
pub enum StoreError {
    /// Missing or corrupt backing file. Callers treat this as "nothing configured".
    #[error("configuration unreadable: {0}")]
    ConfigUnreadable(String),

    #[error("failed to seal secret: {0}")]
    Crypto(#[from] CryptoError),

    #[error("failed to write configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConfigUnreadable(message) => ApiError::ConfigUnreadable(message),
            other => ApiError::ConfigUnreadable(other.to_string()),
        }
    }
}

/// Persistence for endpoint credentials and dashboard settings.
pub trait ConfigStore: Send + Sync {
    fn load(&self) -> Result<SetupConfig, StoreError>;

    /// Rewrite the whole store.
    fn save(&self, config: &SetupConfig) -> Result<(), StoreError>;

    /// Whether anything has been saved yet, readable or not.
    fn exists(&self) -> bool {
        self.load().is_ok()
    }

    /// `load`, with an unreadable store treated as an empty one.
    fn load_or_empty(&self) -> SetupConfig {
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Credential store unreadable, treating as empty");
                SetupConfig::default()
            }
        }
    }

    /// Current secret for one endpoint, read fresh from the store.
    fn secret_for(&self, url: &str) -> Result<String, ApiError> {
        let config = self.load()?;
        config
            .endpoint(url)
            .map(|e| e.secret.clone())
            .ok_or_else(|| ApiError::UnknownEndpoint(normalize_url(url)))
    }
}

/// On-disk layout of `setup.json`. Secret fields hold sealed hex records.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSetup {
    #[serde(default)]
    piholes: Vec<StoredEndpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    main_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    use_pihole_auth: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    yapd_password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredEndpoint {
    url: String,
    password: String,
}

/// `setup.json` sealed with a process-wide `SecretCipher`.
pub struct FileConfigStore {
    path: PathBuf,
    cipher: Arc<SecretCipher>,
}

impl FileConfigStore {
    pub fn new(config_dir: &Path, cipher: Arc<SecretCipher>) -> Self {
        Self {
            path: config_dir.join(SETUP_FILE),
            cipher,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unreadable(&self, reason: impl std::fmt::Display) -> StoreError {
        StoreError::ConfigUnreadable(format!("{}: {}", self.path.display(), reason))
    }

    fn open(&self, record: &str, what: &str) -> Result<String, StoreError> {
        self.cipher
            .decrypt(record)
            .map_err(|e| self.unreadable(format!("{} could not be decrypted: {}", what, e)))
    }
}

impl ConfigStore for FileConfigStore {
    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn load(&self) -> Result<SetupConfig, StoreError> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| self.unreadable(e))?;
        let stored: StoredSetup = serde_json::from_str(&contents).map_err(|e| self.unreadable(e))?;

        let mut endpoints = Vec::with_capacity(stored.piholes.len());
        for item in &stored.piholes {
            let secret = self.open(&item.password, &format!("secret for {}", item.url))?;
            endpoints.push(EndpointConfig::new(&item.url, &secret));
        }

        let use_pihole_auth = stored.use_pihole_auth;
        let yapd_password = match stored.yapd_password {
            Some(ref record) if !use_pihole_auth.unwrap_or(false) => {
                Some(self.open(record, "dashboard password")?)
            }
            _ => None,
        };

        debug!(path = %self.path.display(), endpoints = endpoints.len(), "Loaded credential store");
        Ok(SetupConfig {
            endpoints,
            settings: GlobalSettings {
                main_url: stored.main_url,
                use_pihole_auth,
                yapd_password,
            },
        })
    }

    fn save(&self, config: &SetupConfig) -> Result<(), StoreError> {
        let mut piholes = Vec::with_capacity(config.endpoints.len());
        for endpoint in &config.endpoints {
            piholes.push(StoredEndpoint {
                url: endpoint.url.clone(),
                password: self.cipher.encrypt(&endpoint.secret)?,
            });
        }

        let yapd_password = match config.settings.yapd_password {
            Some(ref password) => Some(self.cipher.encrypt(password)?),
            None => None,
        };

        let stored = StoredSetup {
            piholes,
            main_url: config.settings.main_url.clone(),
            use_pihole_auth: config.settings.use_pihole_auth,
            yapd_password,
        };

        let contents = serde_json::to_string_pretty(&stored)?;
        write_atomic(&self.path, &contents)?;
        debug!(path = %self.path.display(), endpoints = config.endpoints.len(), "Saved credential store");
        Ok(())
    }
}
