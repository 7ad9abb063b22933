//! The reverse-proxy capability the core is built on: forward one request
//! to one Pi-hole and hand back its status and body untouched.

use async_trait::async_trait;
use serde_json::Value;

use crate::models::normalize_url;

use super::ApiError;

/// Header FTL reads the session id from.
pub const SESSION_HEADER: &str = "X-FTL-SID";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A request relative to `{endpoint}/api/`.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl RequestSpec {
    pub fn get(path: &str) -> Self {
        Self {
            method: Method::Get,
            path: path.trim_start_matches('/').to_string(),
            body: None,
        }
    }

    pub fn post(path: &str, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.trim_start_matches('/').to_string(),
            body: Some(body),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport to the upstream servers.
///
/// Implementations return every HTTP status as an `Ok` response; only
/// transport failures (timeout, DNS, TLS, connection refused) become
/// `ApiError::UpstreamUnreachable`.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn send(
        &self,
        endpoint: &str,
        spec: &RequestSpec,
        sid: Option<&str>,
    ) -> Result<UpstreamResponse, ApiError>;
}

/// Absolute URL of an API resource on an endpoint.
pub fn api_url(endpoint: &str, path: &str) -> String {
    format!(
        "{}/api/{}",
        normalize_url(endpoint),
        path.trim_start_matches('/')
    )
}
