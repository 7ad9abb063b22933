use std::fmt;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One upstream Pi-hole and the secret used to log in to it.
///
/// The URL is the unique key for an endpoint everywhere in the crate.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub url: String,
    pub secret: String,
}

impl EndpointConfig {
    pub fn new(url: &str, secret: &str) -> Self {
        Self {
            url: normalize_url(url),
            secret: secret.to_string(),
        }
    }
}

// Keep secrets out of logs and panic messages.
impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("url", &self.url)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Dashboard-wide settings stored next to the endpoint list.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct GlobalSettings {
    /// Endpoint used to check the dashboard password when `use_pihole_auth` is set
    pub main_url: Option<String>,
    pub use_pihole_auth: Option<bool>,
    /// Dashboard password, only meaningful when pi-hole auth is off
    pub yapd_password: Option<String>,
}

impl GlobalSettings {
    pub fn pihole_auth_enabled(&self) -> bool {
        self.use_pihole_auth.unwrap_or(false)
    }
}

impl fmt::Debug for GlobalSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalSettings")
            .field("main_url", &self.main_url)
            .field("use_pihole_auth", &self.use_pihole_auth)
            .field("yapd_password", &self.yapd_password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Decrypted view of the whole credential store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetupConfig {
    pub endpoints: Vec<EndpointConfig>,
    pub settings: GlobalSettings,
}

impl SetupConfig {
    pub fn endpoint(&self, url: &str) -> Option<&EndpointConfig> {
        let url = normalize_url(url);
        self.endpoints.iter().find(|e| e.url == url)
    }

    /// Insert an endpoint, replacing any existing entry with the same URL.
    pub fn upsert_endpoint(&mut self, endpoint: EndpointConfig) {
        match self.endpoints.iter_mut().find(|e| e.url == endpoint.url) {
            Some(existing) => *existing = endpoint,
            None => self.endpoints.push(endpoint),
        }
    }

    /// Remove an endpoint. Returns false if it was not configured.
    pub fn remove_endpoint(&mut self, url: &str) -> bool {
        let url = normalize_url(url);
        let before = self.endpoints.len();
        self.endpoints.retain(|e| e.url != url);
        self.endpoints.len() != before
    }

    pub fn urls(&self) -> Vec<String> {
        self.endpoints.iter().map(|e| e.url.clone()).collect()
    }
}

/// Trim whitespace and trailing slashes so `http://pi.hole/` and
/// `http://pi.hole` name the same endpoint.
pub fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// A URL that cannot address a Pi-hole.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid endpoint URL '{url}': {reason}")]
pub struct InvalidUrl {
    pub url: String,
    pub reason: String,
}

/// Parse `url` as an http(s) address with a host and return its normalized form.
pub fn validate_url(url: &str) -> Result<String, InvalidUrl> {
    let normalized = normalize_url(url);
    let invalid = |reason: String| InvalidUrl {
        url: url.to_string(),
        reason,
    };

    let parsed = Url::parse(&normalized).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(normalized),
        _ => Err(invalid("missing host".to_string())),
    }
}
