//! Data models shared by the session, gateway and aggregation layers.
//!
//! - `EndpointConfig`, `GlobalSettings`, `SetupConfig`: decrypted contents
//!   of the credential store
//! - `SummaryMetrics`: merged query counters
//! - `HistoryPoint`: one time-series bucket
//! - `AggregatedReport`: summary plus merged history

pub mod endpoint;
pub mod history;
pub mod report;
pub mod summary;

pub use endpoint::{normalize_url, validate_url, EndpointConfig, GlobalSettings, InvalidUrl, SetupConfig};
pub use history::{HistoryPoint, HistoryResponse};
pub use report::AggregatedReport;
pub use summary::{SummaryMetrics, SummaryQueries, SummaryResponse};
