use serde::{Deserialize, Serialize};

/// Raw `GET /api/stats/summary` body. Only the query counters are used;
/// the rest of the document is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct SummaryResponse {
    pub queries: SummaryQueries,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryQueries {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub blocked: u64,
    #[serde(default)]
    pub unique_domains: u64,
}

/// Query counters for one endpoint or for the merged fleet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SummaryMetrics {
    pub total: u64,
    pub blocked: u64,
    /// Always `blocked * 100 / total`, 0 when there were no queries
    pub percent_blocked: f64,
    pub unique_domains: u64,
}

impl SummaryMetrics {
    pub fn new(total: u64, blocked: u64, unique_domains: u64) -> Self {
        Self {
            total,
            blocked,
            percent_blocked: percent_blocked(total, blocked),
            unique_domains,
        }
    }
}

impl From<SummaryQueries> for SummaryMetrics {
    fn from(q: SummaryQueries) -> Self {
        Self::new(q.total, q.blocked, q.unique_domains)
    }
}

/// Floating-point share of blocked queries, in percent.
pub fn percent_blocked(total: u64, blocked: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        blocked as f64 * 100.0 / total as f64
    }
}
