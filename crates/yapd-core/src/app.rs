//! Wiring for the core services.
//!
//! `App` owns one instance of each collaborator and shares them the way
//! the services expect: the credential store and upstream transport are
//! injected into the session manager, the gateway sits on top of it, and
//! the aggregator reads endpoints from the same store.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::aggregate::Aggregator;
use crate::api::{Gateway, PiholeClient, Upstream};
use crate::auth::{DashboardGate, FileSessionStore, SessionManager, SessionStore};
use crate::config::Config;
use crate::store::{ConfigStore, FileConfigStore, SecretCipher};

pub struct App {
    pub config: Config,
    pub credentials: Arc<dyn ConfigStore>,
    pub sessions: Arc<SessionManager>,
    pub gateway: Gateway,
    pub aggregator: Aggregator,
    pub gate: DashboardGate,
}

impl App {
    /// Open the on-disk stores and talk to real Pi-holes.
    ///
    /// Derives the store key from `passphrase`, which is slow; do this once.
    pub fn open(config: Config, passphrase: &str) -> Result<Self> {
        let config_dir = Config::config_dir()?;
        let cache_dir = Config::cache_dir()?;

        let cipher = Arc::new(SecretCipher::from_passphrase(passphrase)?);
        let credentials: Arc<dyn ConfigStore> = Arc::new(FileConfigStore::new(&config_dir, cipher));
        let upstream: Arc<dyn Upstream> = Arc::new(PiholeClient::new(&config)?);
        let session_store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(&cache_dir));

        info!(
            config_dir = %config_dir.display(),
            cache_dir = %cache_dir.display(),
            timeout_secs = config.request_timeout_secs,
            accept_invalid_certs = config.accept_invalid_certs,
            "Opening yapd"
        );
        Ok(Self::with_parts(config, credentials, upstream, session_store, &cache_dir))
    }

    pub fn with_parts(
        config: Config,
        credentials: Arc<dyn ConfigStore>,
        upstream: Arc<dyn Upstream>,
        session_store: Arc<dyn SessionStore>,
        cache_dir: &Path,
    ) -> Self {
        let sessions = Arc::new(SessionManager::new(
            Arc::clone(&upstream),
            Arc::clone(&credentials),
            session_store,
        ));
        let gateway = Gateway::new(Arc::clone(&sessions), upstream);
        let aggregator = Aggregator::new(Arc::clone(&credentials), gateway.clone());
        let gate = DashboardGate::new(Arc::clone(&sessions), cache_dir, config.dashboard_unlock_ttl());

        Self {
            config,
            credentials,
            sessions,
            gateway,
            aggregator,
            gate,
        }
    }
}
