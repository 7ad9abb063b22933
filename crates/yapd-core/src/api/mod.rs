//! Upstream access for Pi-hole's FTL REST API.
//!
//! This module provides:
//! - `Upstream`: the transport capability (forward one request, return status/body)
//! - `PiholeClient`: reqwest implementation with a fixed deadline and a
//!   configurable certificate trust policy
//! - `Gateway`: session-aware requests with a single renewal retry
//! - `ApiError`: the error taxonomy shared by the whole core
//!
//! FTL authenticates requests with the session id in the `X-FTL-SID` header.

pub mod client;
pub mod error;
pub mod gateway;
pub mod upstream;

pub use client::PiholeClient;
pub use error::ApiError;
pub use gateway::Gateway;
pub use upstream::{Method, RequestSpec, Upstream, UpstreamResponse, SESSION_HEADER};
