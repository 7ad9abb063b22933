//! reqwest-backed `Upstream` used against real Pi-hole instances.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::{debug, warn};

use crate::config::Config;

use super::upstream::{api_url, Method, RequestSpec, Upstream, UpstreamResponse, SESSION_HEADER};
use super::ApiError;

/// HTTP client for FTL's REST API.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct PiholeClient {
    client: Client,
}

impl PiholeClient {
    /// Build a client honouring the configured deadline and trust policy.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_options(
            Duration::from_secs(config.request_timeout_secs),
            config.accept_invalid_certs,
        )
    }

    pub fn with_options(timeout: Duration, accept_invalid_certs: bool) -> Result<Self> {
        if accept_invalid_certs {
            debug!("Upstream certificate validation disabled by trust policy");
        }
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Upstream for PiholeClient {
    async fn send(
        &self,
        endpoint: &str,
        spec: &RequestSpec,
        sid: Option<&str>,
    ) -> Result<UpstreamResponse, ApiError> {
        let url = api_url(endpoint, &spec.path);

        let mut request = match spec.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        }
        .header(header::ACCEPT, "application/json");

        if let Some(sid) = sid {
            request = request.header(SESSION_HEADER, sid);
        }
        if let Some(ref body) = spec.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            warn!(endpoint = %endpoint, path = %spec.path, error = %e, "Upstream request failed");
            ApiError::unreachable(endpoint, &e)
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::unreachable(endpoint, &e))?;

        debug!(endpoint = %endpoint, path = %spec.path, status, "Upstream response");
        Ok(UpstreamResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_with_trust_policies() {
        assert!(PiholeClient::with_options(Duration::from_secs(5), true).is_ok());
        assert!(PiholeClient::with_options(Duration::from_secs(5), false).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let client = PiholeClient::with_options(Duration::from_millis(500), false)
            .expect("client builds");
        // Port 9 (discard) on localhost is closed on any sane test host.
        let err = client
            .send("http://127.0.0.1:9", &RequestSpec::get("history"), Some("sid"))
            .await
            .expect_err("nothing listens on port 9");

        assert!(matches!(err, ApiError::UpstreamUnreachable { ref endpoint, .. } if endpoint == "http://127.0.0.1:9"));
    }
}
