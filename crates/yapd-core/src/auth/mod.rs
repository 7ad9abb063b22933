//! Authentication: per-endpoint sessions and the dashboard lock.
//!
//! This module provides:
//! - `Session`: one FTL session id + CSRF token pair for one endpoint
//! - `SessionStore`: persisted mirror of the session cache
//! - `SessionManager`: login, caching, single-flight renewal
//! - `DashboardGate`: the shared dashboard passphrase
//! - `MasterSecret`: the credential store passphrase (env or OS keychain)
//!
//! Sessions are never checked on a timer. A session is only replaced when
//! an upstream rejects it.

pub mod credentials;
pub mod dashboard;
pub mod manager;
pub mod session;

pub use credentials::MasterSecret;
pub use dashboard::DashboardGate;
pub use manager::SessionManager;
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionStore};
