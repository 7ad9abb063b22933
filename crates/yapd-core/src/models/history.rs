use serde::{de::Error as _, Deserialize, Deserializer, Serialize};

/// Raw `GET /api/history` body. A missing `history` array counts as empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub history: Vec<HistoryPoint>,
}

/// One bucket of the activity graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct HistoryPoint {
    /// Epoch seconds; unique within one endpoint's series
    #[serde(deserialize_with = "epoch_seconds")]
    pub timestamp: i64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub cached: u64,
    #[serde(default)]
    pub blocked: u64,
    #[serde(default)]
    pub forwarded: u64,
}

impl HistoryPoint {
    /// Add another bucket's counters into this one. Timestamps are not checked.
    pub fn accumulate(&mut self, other: &HistoryPoint) {
        self.total = self.total.saturating_add(other.total);
        self.cached = self.cached.saturating_add(other.cached);
        self.blocked = self.blocked.saturating_add(other.blocked);
        self.forwarded = self.forwarded.saturating_add(other.forwarded);
    }
}

// FTL reports timestamps as JSON numbers that may carry a fractional part.
fn epoch_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() {
        return Err(D::Error::custom("timestamp is not a finite number"));
    }
    Ok(value.round() as i64)
}
