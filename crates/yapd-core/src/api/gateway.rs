use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::auth::SessionManager;
use crate::models::normalize_url;

use super::error::is_auth_failure_status;
use super::upstream::{RequestSpec, Upstream, UpstreamResponse};
use super::ApiError;

/// Session-aware access to any configured endpoint.
///
/// A request rejected with 401/403 triggers exactly one renewal and one
/// retry. Every other failure is returned as-is.
/// Clone is cheap - both halves are Arc.
#[derive(Clone)]
pub struct Gateway {
    sessions: Arc<SessionManager>,
    upstream: Arc<dyn Upstream>,
}

impl Gateway {
    pub fn new(sessions: Arc<SessionManager>, upstream: Arc<dyn Upstream>) -> Self {
        Self { sessions, upstream }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Send `spec` to `endpoint` with its session and return the body.
    pub async fn request(&self, endpoint: &str, spec: &RequestSpec) -> Result<String, ApiError> {
        let url = normalize_url(endpoint);
        let session = self.sessions.get_valid_session(&url).await?;

        let response = self.upstream.send(&url, spec, Some(&session.sid)).await?;
        if !is_auth_failure_status(response.status) {
            return Self::into_body(&url, response);
        }

        info!(endpoint = %url, path = %spec.path, status = response.status, "Session rejected, renewing");
        let session = self.sessions.renew(&url).await?;

        let retry = self.upstream.send(&url, spec, Some(&session.sid)).await?;
        if is_auth_failure_status(retry.status) {
            warn!(endpoint = %url, path = %spec.path, status = retry.status, "Session rejected after renewal");
            return Err(ApiError::UpstreamAuthFailed { endpoint: url });
        }
        Self::into_body(&url, retry)
    }

    /// `GET` a resource and deserialize the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, path: &str) -> Result<T, ApiError> {
        let body = self.request(endpoint, &RequestSpec::get(path)).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::InvalidResponse {
            endpoint: normalize_url(endpoint),
            message: format!("Failed to parse {} response: {}", path, e),
        })
    }

    /// Pass-through `GET /api/{path}` for a configured endpoint; the body is
    /// returned verbatim.
    pub async fn forward(&self, endpoint: &str, path: &str) -> Result<String, ApiError> {
        let url = normalize_url(endpoint);
        let config = self.sessions.credentials().load_or_empty();
        if config.endpoint(&url).is_none() {
            return Err(ApiError::UnknownEndpoint(url));
        }
        debug!(endpoint = %url, path = %path, "Forwarding request");
        self.request(&url, &RequestSpec::get(path)).await
    }

    fn into_body(endpoint: &str, response: UpstreamResponse) -> Result<String, ApiError> {
        if response.is_success() {
            Ok(response.body)
        } else {
            Err(ApiError::from_status(endpoint, response.status, &response.body))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::auth::{MemorySessionStore, SessionStore};
    use crate::store::ConfigStore;
    use crate::testing::{summary_body, unauthorized_body, MemoryConfigStore, ScriptedUpstream};

    const A: &str = "http://pi-a.lan";
    const SUMMARY: &str = "stats/summary";

    fn gateway(upstream: &Arc<ScriptedUpstream>) -> Gateway {
        let upstream_dyn = Arc::clone(upstream) as Arc<dyn Upstream>;
        let sessions = SessionManager::new(
            Arc::clone(&upstream_dyn),
            Arc::new(MemoryConfigStore::with_endpoints(&[(A, "alpha")])) as Arc<dyn ConfigStore>,
            Arc::new(MemorySessionStore::new()) as Arc<dyn SessionStore>,
        );
        Gateway::new(Arc::new(sessions), upstream_dyn)
    }

    #[tokio::test]
    async fn test_injects_session_header() {
        let upstream = Arc::new(ScriptedUpstream::new());
        upstream.login_ok(A, "sid-1").respond(A, SUMMARY, 200, summary_body(10, 1, 3));
        let gateway = gateway(&upstream);

        let body = gateway.request(A, &RequestSpec::get(SUMMARY)).await.expect("ok");
        let value: Value = serde_json::from_str(&body).expect("json");
        assert_eq!(value["queries"]["total"], 10);

        let calls = upstream.calls_to(A, SUMMARY);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].sid.as_deref(), Some("sid-1"));
    }

    #[tokio::test]
    async fn test_retries_once_after_renewal() {
        let upstream = Arc::new(ScriptedUpstream::new());
        upstream
            .login_ok(A, "stale")
            .login_ok(A, "fresh")
            .respond(A, SUMMARY, 401, unauthorized_body())
            .respond(A, SUMMARY, 200, summary_body(10, 1, 3));
        let gateway = gateway(&upstream);

        let body = gateway.request(A, &RequestSpec::get(SUMMARY)).await.expect("retry succeeds");
        assert!(body.contains("\"total\":10"));

        // Initial login plus exactly one renewal
        assert_eq!(upstream.login_count(A), 2);
        let sids: Vec<Option<String>> = upstream.calls_to(A, SUMMARY).into_iter().map(|c| c.sid).collect();
        assert_eq!(sids, vec![Some("stale".to_string()), Some("fresh".to_string())]);
        assert_eq!(gateway.sessions().cached(A).map(|s| s.sid), Some("fresh".to_string()));
    }

    #[tokio::test]
    async fn test_second_rejection_is_final() {
        let upstream = Arc::new(ScriptedUpstream::new());
        upstream.login_ok(A, "sid").respond(A, SUMMARY, 401, unauthorized_body());
        let gateway = gateway(&upstream);

        let err = gateway.request(A, &RequestSpec::get(SUMMARY)).await.expect_err("fails");
        assert_eq!(err, ApiError::UpstreamAuthFailed { endpoint: A.to_string() });
        assert_eq!(upstream.calls_to(A, SUMMARY).len(), 2);
        assert_eq!(upstream.login_count(A), 2);
    }

    #[tokio::test]
    async fn test_forbidden_also_renews() {
        let upstream = Arc::new(ScriptedUpstream::new());
        upstream
            .login_ok(A, "sid")
            .respond(A, SUMMARY, 403, unauthorized_body())
            .respond(A, SUMMARY, 200, summary_body(1, 0, 1));
        let gateway = gateway(&upstream);

        gateway.request(A, &RequestSpec::get(SUMMARY)).await.expect("retry succeeds");
        assert_eq!(upstream.calls_to(A, SUMMARY).len(), 2);
    }

    #[tokio::test]
    async fn test_server_error_not_retried() {
        let upstream = Arc::new(ScriptedUpstream::new());
        upstream.login_ok(A, "sid").respond(
            A,
            SUMMARY,
            500,
            json!({"error": {"key": "database_error", "message": "Database unavailable", "hint": null}}),
        );
        let gateway = gateway(&upstream);

        let err = gateway.request(A, &RequestSpec::get(SUMMARY)).await.expect_err("fails");
        assert_eq!(
            err,
            ApiError::UpstreamError {
                endpoint: A.to_string(),
                status: 500,
                message: "Database unavailable".to_string(),
            }
        );
        assert_eq!(upstream.calls_to(A, SUMMARY).len(), 1);
        assert_eq!(upstream.login_count(A), 1);
    }

    #[tokio::test]
    async fn test_unreachable_not_retried() {
        let upstream = Arc::new(ScriptedUpstream::new());
        upstream.login_ok(A, "sid").unreachable(A, SUMMARY);
        let gateway = gateway(&upstream);

        let err = gateway.request(A, &RequestSpec::get(SUMMARY)).await.expect_err("fails");
        assert!(matches!(err, ApiError::UpstreamUnreachable { .. }));
        assert_eq!(upstream.calls_to(A, SUMMARY).len(), 1);
    }

    #[tokio::test]
    async fn test_renewal_failure_surfaces() {
        let upstream = Arc::new(ScriptedUpstream::new());
        upstream
            .login_ok(A, "sid")
            .respond(A, "auth", 401, json!({"session": {"valid": false, "message": "password incorrect"}}))
            .respond(A, SUMMARY, 401, unauthorized_body());
        let gateway = gateway(&upstream);

        let err = gateway.request(A, &RequestSpec::get(SUMMARY)).await.expect_err("fails");
        assert!(matches!(err, ApiError::AuthRejected { .. }));
        assert_eq!(upstream.calls_to(A, SUMMARY).len(), 1);
    }

    #[tokio::test]
    async fn test_get_json_invalid_body() {
        let upstream = Arc::new(ScriptedUpstream::new());
        upstream.login_ok(A, "sid").reply(A, "history", Ok(UpstreamResponse::new(200, "<html>")));
        let gateway = gateway(&upstream);

        let err = gateway
            .get_json::<Value>(A, "history")
            .await
            .expect_err("not json");
        assert!(matches!(err, ApiError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_forward_refuses_unknown_endpoint() {
        let upstream = Arc::new(ScriptedUpstream::new());
        let gateway = gateway(&upstream);

        let err = gateway.forward("http://elsewhere", "stats/top_clients").await.expect_err("unknown");
        assert_eq!(err, ApiError::UnknownEndpoint("http://elsewhere".to_string()));
        assert!(upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn test_forward_returns_body_verbatim() {
        let upstream = Arc::new(ScriptedUpstream::new());
        upstream
            .login_ok(A, "sid")
            .reply(A, "stats/top_clients", Ok(UpstreamResponse::new(200, "{\"clients\":[]}")));
        let gateway = gateway(&upstream);

        let body = gateway.forward(&format!("{}/", A), "stats/top_clients").await.expect("ok");
        assert_eq!(body, "{\"clients\":[]}");
    }
}
