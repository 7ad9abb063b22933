use serde::{Deserialize, Serialize};

use super::{HistoryPoint, SummaryMetrics};

/// Fleet-wide view handed to the presentation layer. Built fresh per call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AggregatedReport {
    pub summary: SummaryMetrics,
    /// Sorted ascending by timestamp
    pub history: Vec<HistoryPoint>,
}
