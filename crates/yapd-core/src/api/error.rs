use serde::Deserialize;
use thiserror::Error;

/// Failures surfaced by the session, gateway and aggregation layers.
///
/// `Clone` because a single in-flight renewal hands the same outcome to
/// every caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("configuration unreadable: {0}")]
    ConfigUnreadable(String),

    #[error("authentication failed for endpoint {endpoint}: {message}")]
    AuthRejected { endpoint: String, message: String },

    #[error("authentication failed for endpoint {endpoint}: session rejected after renewal")]
    UpstreamAuthFailed { endpoint: String },

    #[error("endpoint {endpoint} returned status {status}: {message}")]
    UpstreamError {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("could not connect to endpoint {endpoint}: {message}")]
    UpstreamUnreachable { endpoint: String, message: String },

    #[error("failed to load data from endpoint {failed_endpoint}: {cause}")]
    PartialSourceFailure {
        failed_endpoint: String,
        cause: Box<ApiError>,
    },

    #[error("endpoint {0} is not configured")]
    UnknownEndpoint(String),

    #[error("invalid response from endpoint {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// FTL error envelope: `{"error": {"key": ..., "message": ..., "hint": ...}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
    session: Option<SessionMessage>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
    hint: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionMessage {
    message: Option<String>,
}

/// 401 and 403 both mean the session id was not accepted.
pub fn is_auth_failure_status(status: u16) -> bool {
    status == 401 || status == 403
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Best human-readable message in an upstream error body: the FTL
    /// `error.message` (with hint), then `session.message`, then the raw
    /// body truncated.
    pub fn upstream_message(body: &str) -> String {
        if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
            if let Some(detail) = envelope.error {
                if let Some(message) = detail.message {
                    return match detail.hint {
                        Some(hint) if !hint.is_empty() => format!("{} ({})", message, hint),
                        _ => message,
                    };
                }
            }
            if let Some(message) = envelope.session.and_then(|s| s.message) {
                return message;
            }
        }
        if body.trim().is_empty() {
            "empty response body".to_string()
        } else {
            Self::truncate_body(body)
        }
    }

    /// Classify a final (non-retried) upstream failure.
    pub fn from_status(endpoint: &str, status: u16, body: &str) -> Self {
        if is_auth_failure_status(status) {
            ApiError::UpstreamAuthFailed {
                endpoint: endpoint.to_string(),
            }
        } else {
            ApiError::UpstreamError {
                endpoint: endpoint.to_string(),
                status,
                message: Self::upstream_message(body),
            }
        }
    }

    pub fn unreachable(endpoint: &str, err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            err.to_string()
        };
        ApiError::UpstreamUnreachable {
            endpoint: endpoint.to_string(),
            message,
        }
    }

    /// Wrap a per-endpoint failure into the aggregation abort.
    pub fn partial_source(endpoint: &str, cause: ApiError) -> Self {
        ApiError::PartialSourceFailure {
            failed_endpoint: endpoint.to_string(),
            cause: Box::new(cause),
        }
    }

    /// Bad credentials, whether found at login or after a renewal retry.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            ApiError::AuthRejected { .. } | ApiError::UpstreamAuthFailed { .. } => true,
            ApiError::PartialSourceFailure { cause, .. } => cause.is_auth_failure(),
            _ => false,
        }
    }

    /// The endpoint the failure is attributed to, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ApiError::ConfigUnreadable(_) => None,
            ApiError::AuthRejected { endpoint, .. }
            | ApiError::UpstreamAuthFailed { endpoint }
            | ApiError::UpstreamError { endpoint, .. }
            | ApiError::UpstreamUnreachable { endpoint, .. }
            | ApiError::InvalidResponse { endpoint, .. } => Some(endpoint),
            ApiError::PartialSourceFailure { failed_endpoint, .. } => Some(failed_endpoint),
            ApiError::UnknownEndpoint(endpoint) => Some(endpoint),
        }
    }
}
