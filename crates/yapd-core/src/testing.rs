//! Test doubles for the upstream transport and the credential store.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::api::{ApiError, RequestSpec, Upstream, UpstreamResponse};
use crate::models::{normalize_url, EndpointConfig, SetupConfig};
use crate::store::{ConfigStore, StoreError};
use crate::utils::lock;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub endpoint: String,
    pub path: String,
    pub sid: Option<String>,
    pub body: Option<Value>,
}

type Reply = Result<UpstreamResponse, ApiError>;

/// Upstream that answers from per-(endpoint, path) queues.
///
/// The last queued reply for a route is sticky, so a single scripted
/// login keeps succeeding. Unscripted routes answer 404.
#[derive(Default)]
pub struct ScriptedUpstream {
    routes: Mutex<HashMap<(String, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<RecordedCall>>,
    latency: Option<Duration>,
}

impl ScriptedUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every reply, so concurrent callers overlap.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn reply(&self, endpoint: &str, path: &str, reply: Reply) -> &Self {
        lock(&self.routes)
            .entry((normalize_url(endpoint), path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn respond(&self, endpoint: &str, path: &str, status: u16, body: Value) -> &Self {
        self.reply(endpoint, path, Ok(UpstreamResponse::new(status, body.to_string())))
    }

    /// Script a successful login returning `sid`.
    pub fn login_ok(&self, endpoint: &str, sid: &str) -> &Self {
        self.respond(endpoint, "auth", 200, auth_body(sid))
    }

    pub fn unreachable(&self, endpoint: &str, path: &str) -> &Self {
        self.reply(
            endpoint,
            path,
            Err(ApiError::UpstreamUnreachable {
                endpoint: normalize_url(endpoint),
                message: "request timed out".to_string(),
            }),
        )
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn calls_to(&self, endpoint: &str, path: &str) -> Vec<RecordedCall> {
        let endpoint = normalize_url(endpoint);
        self.calls()
            .into_iter()
            .filter(|c| c.endpoint == endpoint && c.path == path)
            .collect()
    }

    pub fn login_count(&self, endpoint: &str) -> usize {
        self.calls_to(endpoint, "auth").len()
    }
}

#[async_trait]
impl Upstream for ScriptedUpstream {
    async fn send(
        &self,
        endpoint: &str,
        spec: &RequestSpec,
        sid: Option<&str>,
    ) -> Result<UpstreamResponse, ApiError> {
        lock(&self.calls).push(RecordedCall {
            endpoint: endpoint.to_string(),
            path: spec.path.clone(),
            sid: sid.map(str::to_string),
            body: spec.body.clone(),
        });

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut routes = lock(&self.routes);
        match routes.get_mut(&(endpoint.to_string(), spec.path.clone())) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(not_found),
            Some(queue) => queue.front().cloned().unwrap_or_else(not_found),
            None => not_found(),
        }
    }
}

fn not_found() -> Reply {
    Ok(UpstreamResponse::new(
        404,
        json!({"error": {"key": "not_found", "message": "Not found", "hint": null}}).to_string(),
    ))
}

/// FTL `POST /api/auth` success body.
pub fn auth_body(sid: &str) -> Value {
    json!({
        "session": {
            "valid": true,
            "totp": false,
            "sid": sid,
            "csrf": format!("csrf-{}", sid),
            "validity": 1800,
            "message": "password correct"
        },
        "took": 0.04
    })
}

pub fn summary_body(total: u64, blocked: u64, unique_domains: u64) -> Value {
    json!({
        "queries": {
            "total": total,
            "blocked": blocked,
            "percent_blocked": 0.0,
            "unique_domains": unique_domains,
            "forwarded": 0,
            "cached": 0
        },
        "took": 0.01
    })
}

/// `points` are (timestamp, total, cached, blocked, forwarded).
pub fn history_body(points: &[(i64, u64, u64, u64, u64)]) -> Value {
    let history: Vec<Value> = points
        .iter()
        .map(|&(timestamp, total, cached, blocked, forwarded)| {
            json!({
                "timestamp": timestamp,
                "total": total,
                "cached": cached,
                "blocked": blocked,
                "forwarded": forwarded
            })
        })
        .collect();
    json!({ "history": history, "took": 0.01 })
}

pub fn unauthorized_body() -> Value {
    json!({"error": {"key": "unauthorized", "message": "Unauthorized", "hint": null}})
}

/// In-memory credential store. `None` behaves like a missing file.
#[derive(Default)]
pub struct MemoryConfigStore {
    config: Mutex<Option<SetupConfig>>,
}

impl MemoryConfigStore {
    pub fn new(config: SetupConfig) -> Self {
        Self {
            config: Mutex::new(Some(config)),
        }
    }

    pub fn with_endpoints(endpoints: &[(&str, &str)]) -> Self {
        Self::new(SetupConfig {
            endpoints: endpoints
                .iter()
                .map(|(url, secret)| EndpointConfig::new(url, secret))
                .collect(),
            ..SetupConfig::default()
        })
    }

    pub fn unreadable() -> Self {
        Self::default()
    }

    pub fn set_secret(&self, url: &str, secret: &str) {
        if let Some(config) = lock(&self.config).as_mut() {
            config.upsert_endpoint(EndpointConfig::new(url, secret));
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    fn exists(&self) -> bool {
        lock(&self.config).is_some()
    }

    fn load(&self) -> Result<SetupConfig, StoreError> {
        lock(&self.config)
            .clone()
            .ok_or_else(|| StoreError::ConfigUnreadable("no configuration saved".to_string()))
    }

    fn save(&self, config: &SetupConfig) -> Result<(), StoreError> {
        *lock(&self.config) = Some(config.clone());
        Ok(())
    }
}
