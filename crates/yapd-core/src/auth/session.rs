use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::write_atomic;
use crate::utils::lock;

/// Session mirror file name in cache directory
const SESSION_FILE: &str = "sessions.json";

/// An authenticated FTL session for one endpoint.
///
/// Renewal produces a new `Session`; existing values are never mutated.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub endpoint_url: String,
    pub sid: String,
    pub csrf: String,
    pub obtained_at: DateTime<Utc>,
}

impl Session {
    pub fn new(endpoint_url: &str, sid: String, csrf: String) -> Self {
        Self {
            endpoint_url: endpoint_url.to_string(),
            sid,
            csrf,
            obtained_at: Utc::now(),
        }
    }
}

// Tokens are bearer credentials; keep them out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("endpoint_url", &self.endpoint_url)
            .field("sid", &"<redacted>")
            .field("csrf", &"<redacted>")
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

/// Persisted mirror of the session cache, so sessions survive restarts.
pub trait SessionStore: Send + Sync {
    fn load_all(&self) -> Result<HashMap<String, Session>>;
    fn save(&self, session: &Session) -> Result<()>;
    fn remove(&self, endpoint_url: &str) -> Result<()>;
}

/// `sessions.json` in the cache directory, keyed by endpoint URL.
pub struct FileSessionStore {
    path: PathBuf,
    // Serialises read-modify-write cycles on the file.
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            path: cache_dir.join(SESSION_FILE),
            write_lock: Mutex::new(()),
        }
    }

    fn read(&self) -> Result<HashMap<String, Session>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read session file")?;
        serde_json::from_str(&contents).context("Failed to parse session file")
    }

    fn write(&self, sessions: &HashMap<String, Session>) -> Result<()> {
        let contents = serde_json::to_string_pretty(sessions)?;
        write_atomic(&self.path, &contents).context("Failed to write session file")
    }

    /// Current file contents; a corrupt file is discarded rather than blocking writes.
    fn read_for_update(&self) -> HashMap<String, Session> {
        self.read().unwrap_or_else(|e| {
            warn!(error = %e, "Discarding unreadable session file");
            HashMap::new()
        })
    }
}

impl SessionStore for FileSessionStore {
    fn load_all(&self) -> Result<HashMap<String, Session>> {
        let sessions = self.read()?;
        debug!(count = sessions.len(), "Loaded persisted sessions");
        Ok(sessions)
    }

    fn save(&self, session: &Session) -> Result<()> {
        let _guard = lock(&self.write_lock);
        let mut sessions = self.read_for_update();
        sessions.insert(session.endpoint_url.clone(), session.clone());
        self.write(&sessions)
    }

    fn remove(&self, endpoint_url: &str) -> Result<()> {
        let _guard = lock(&self.write_lock);
        let mut sessions = self.read_for_update();
        if sessions.remove(endpoint_url).is_some() {
            self.write(&sessions)?;
        }
        Ok(())
    }
}

/// Non-persistent store, for embedding without a cache directory.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sessions(sessions: impl IntoIterator<Item = Session>) -> Self {
        Self {
            sessions: Mutex::new(
                sessions
                    .into_iter()
                    .map(|s| (s.endpoint_url.clone(), s))
                    .collect(),
            ),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load_all(&self) -> Result<HashMap<String, Session>> {
        Ok(lock(&self.sessions).clone())
    }

    fn save(&self, session: &Session) -> Result<()> {
        lock(&self.sessions).insert(session.endpoint_url.clone(), session.clone());
        Ok(())
    }

    fn remove(&self, endpoint_url: &str) -> Result<()> {
        lock(&self.sessions).remove(endpoint_url);
        Ok(())
    }
}
