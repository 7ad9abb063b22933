//! Core of yapd: one dashboard over many Pi-hole instances.
//!
//! The crate keeps a valid FTL session per Pi-hole, retries once when a
//! session is rejected, and merges per-instance summary and history data
//! into one report. Endpoint credentials are stored encrypted at rest.
//!
//! - `store`: encrypted credential store
//! - `auth`: session manager, dashboard lock, master passphrase
//! - `api`: upstream transport and the session-aware gateway
//! - `aggregate`: concurrent fan-out and merge
//! - `app`: wiring of the above

pub mod aggregate;
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod models;
pub mod store;
pub mod utils;

#[cfg(test)]
mod testing;

pub use aggregate::Aggregator;
pub use api::{ApiError, Gateway, PiholeClient, RequestSpec, Upstream};
pub use app::App;
pub use auth::{DashboardGate, MasterSecret, Session, SessionManager};
pub use config::Config;
pub use models::{AggregatedReport, EndpointConfig, GlobalSettings, HistoryPoint, SetupConfig, SummaryMetrics};
pub use store::{ConfigStore, FileConfigStore, SecretCipher, StoreError};
