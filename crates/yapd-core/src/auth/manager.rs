use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::api::{ApiError, RequestSpec, Upstream};
use crate::models::normalize_url;
use crate::store::ConfigStore;
use crate::utils::lock;

use super::session::{Session, SessionStore};

/// FTL login resource, relative to `/api/`
const AUTH_PATH: &str = "auth";

/// One renewal in progress; every caller for the endpoint awaits a clone.
type Renewal = Shared<BoxFuture<'static, Result<Session, ApiError>>>;

type SessionCache = Arc<Mutex<HashMap<String, Session>>>;

#[derive(Debug, Deserialize)]
struct AuthResponse {
    session: Option<AuthSession>,
}

#[derive(Debug, Deserialize)]
struct AuthSession {
    valid: Option<bool>,
    sid: Option<String>,
    csrf: Option<String>,
    message: Option<String>,
}

/// Owns the per-endpoint session cache.
///
/// At most one session per endpoint is cached. Renewals for the same
/// endpoint are collapsed into a single login, keyed by endpoint URL; the
/// entry is dropped once that login settles.
pub struct SessionManager {
    upstream: Arc<dyn Upstream>,
    credentials: Arc<dyn ConfigStore>,
    store: Arc<dyn SessionStore>,
    cache: SessionCache,
    in_flight: Arc<Mutex<HashMap<String, Renewal>>>,
}

impl SessionManager {
    /// Build a manager, seeding the cache from the persisted mirror.
    pub fn new(
        upstream: Arc<dyn Upstream>,
        credentials: Arc<dyn ConfigStore>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let cached = store.load_all().unwrap_or_else(|e| {
            warn!(error = %e, "Could not restore persisted sessions");
            HashMap::new()
        });

        Self {
            upstream,
            credentials,
            store,
            cache: Arc::new(Mutex::new(cached)),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn credentials(&self) -> &Arc<dyn ConfigStore> {
        &self.credentials
    }

    pub fn cached(&self, endpoint: &str) -> Option<Session> {
        lock(&self.cache).get(&normalize_url(endpoint)).cloned()
    }

    /// The cached session, or a fresh one if the endpoint has none yet.
    pub async fn get_valid_session(&self, endpoint: &str) -> Result<Session, ApiError> {
        let url = normalize_url(endpoint);
        if let Some(session) = self.cached(&url) {
            return Ok(session);
        }
        debug!(endpoint = %url, "No cached session");
        self.renew(&url).await
    }

    /// Log in with an explicit secret. The result is not cached.
    pub async fn login(&self, endpoint: &str, secret: &str) -> Result<Session, ApiError> {
        login(self.upstream.as_ref(), &normalize_url(endpoint), secret).await
    }

    /// Replace the endpoint's session with a fresh login.
    ///
    /// The secret is re-read from the credential store. Concurrent calls
    /// for the same endpoint share one login and one outcome.
    pub async fn renew(&self, endpoint: &str) -> Result<Session, ApiError> {
        let url = normalize_url(endpoint);
        let renewal = {
            let mut in_flight = lock(&self.in_flight);
            match in_flight.get(&url) {
                Some(renewal) => {
                    debug!(endpoint = %url, "Joining in-flight renewal");
                    renewal.clone()
                }
                None => {
                    let renewal = self.start_renewal(url.clone());
                    in_flight.insert(url, renewal.clone());
                    renewal
                }
            }
        };
        renewal.await
    }

    /// Spawn the login so it settles even if every waiter is dropped.
    fn start_renewal(&self, url: String) -> Renewal {
        let upstream = Arc::clone(&self.upstream);
        let credentials = Arc::clone(&self.credentials);
        let store = Arc::clone(&self.store);
        let cache = Arc::clone(&self.cache);
        let in_flight = Arc::clone(&self.in_flight);
        let endpoint = url.clone();

        let task = tokio::spawn(async move {
            info!(endpoint = %url, "Renewing session");
            let result = match credentials.secret_for(&url) {
                Ok(secret) => login(upstream.as_ref(), &url, &secret).await,
                Err(e) => Err(e),
            };

            if let Ok(ref session) = result {
                install(&cache, store.as_ref(), session);
            }
            lock(&in_flight).remove(&url);
            result
        });

        task.map(move |joined| {
            joined.unwrap_or_else(|e| {
                Err(ApiError::UpstreamUnreachable {
                    endpoint,
                    message: format!("renewal task failed: {}", e),
                })
            })
        })
        .boxed()
        .shared()
    }

    #[cfg(test)]
    fn renewals_in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }

    /// Log in to every configured endpoint concurrently.
    ///
    /// Sessions come back in configuration order. The first failure fails
    /// the whole call. An unreadable store means no endpoints.
    pub async fn connect_all(&self) -> Result<Vec<Session>, ApiError> {
        let urls = self.credentials.load_or_empty().urls();
        info!(endpoints = urls.len(), "Connecting to all endpoints");
        futures::future::try_join_all(urls.iter().map(|url| self.renew(url))).await
    }

    /// Forget the endpoint's session, in memory and in the mirror.
    pub fn invalidate(&self, endpoint: &str) {
        let url = normalize_url(endpoint);
        lock(&self.cache).remove(&url);
        if let Err(e) = self.store.remove(&url) {
            warn!(endpoint = %url, error = %e, "Failed to remove persisted session");
        }
    }

    pub fn invalidate_all(&self) {
        let urls: Vec<String> = lock(&self.cache).keys().cloned().collect();
        for url in urls {
            self.invalidate(&url);
        }
    }
}

/// Swap in a new session. The cache update is one locked insert, so
/// readers see the old session or the new one.
fn install(cache: &Mutex<HashMap<String, Session>>, store: &dyn SessionStore, session: &Session) {
    lock(cache).insert(session.endpoint_url.clone(), session.clone());
    if let Err(e) = store.save(session) {
        warn!(endpoint = %session.endpoint_url, error = %e, "Failed to persist session");
    }
}

/// `POST {endpoint}/api/auth` and extract the session id and CSRF token.
pub(crate) async fn login(
    upstream: &dyn Upstream,
    endpoint: &str,
    secret: &str,
) -> Result<Session, ApiError> {
    let spec = RequestSpec::post(AUTH_PATH, json!({ "password": secret }));
    let response = upstream.send(endpoint, &spec, None).await?;

    if !response.is_success() {
        let message = ApiError::upstream_message(&response.body);
        warn!(endpoint = %endpoint, status = response.status, "Login rejected");
        return Err(ApiError::AuthRejected {
            endpoint: endpoint.to_string(),
            message,
        });
    }

    let parsed: AuthResponse =
        serde_json::from_str(&response.body).map_err(|e| ApiError::InvalidResponse {
            endpoint: endpoint.to_string(),
            message: format!("Failed to parse auth response: {}", e),
        })?;
    let session = parsed.session.ok_or_else(|| ApiError::InvalidResponse {
        endpoint: endpoint.to_string(),
        message: "auth response has no session object".to_string(),
    })?;

    let rejected = |message: Option<String>, fallback: &str| ApiError::AuthRejected {
        endpoint: endpoint.to_string(),
        message: message.unwrap_or_else(|| fallback.to_string()),
    };

    if session.valid == Some(false) {
        return Err(rejected(session.message, "session not valid"));
    }
    match session.sid {
        Some(sid) if !sid.is_empty() => {
            debug!(endpoint = %endpoint, "Login succeeded");
            Ok(Session::new(endpoint, sid, session.csrf.unwrap_or_default()))
        }
        _ => Err(rejected(session.message, "no session id returned")),
    }
}
