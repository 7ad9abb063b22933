use std::sync::Arc;

use futures::future::{try_join, try_join_all};
use tracing::{debug, info, warn};

use crate::api::{ApiError, Gateway};
use crate::models::{AggregatedReport, HistoryPoint, HistoryResponse, SummaryMetrics, SummaryResponse};
use crate::store::ConfigStore;

use super::merge::{merge_history, merge_summaries};

/// FTL summary resource, relative to `/api/`
const SUMMARY_PATH: &str = "stats/summary";

/// FTL activity graph resource, relative to `/api/`
const HISTORY_PATH: &str = "history";

/// Builds fleet-wide numbers from every configured endpoint.
pub struct Aggregator {
    credentials: Arc<dyn ConfigStore>,
    gateway: Gateway,
}

impl Aggregator {
    pub fn new(credentials: Arc<dyn ConfigStore>, gateway: Gateway) -> Self {
        Self { credentials, gateway }
    }

    /// Endpoint list for this call. An unreadable store means no endpoints.
    fn endpoints(&self) -> Vec<String> {
        self.credentials.load_or_empty().urls()
    }

    pub async fn get_summary(&self) -> Result<SummaryMetrics, ApiError> {
        let urls = self.endpoints();
        info!(endpoints = urls.len(), "Aggregating summary");

        let parts = try_join_all(urls.iter().map(|url| self.fetch_summary(url))).await?;
        Ok(merge_summaries(&parts))
    }

    pub async fn get_history(&self) -> Result<Vec<HistoryPoint>, ApiError> {
        let urls = self.endpoints();
        info!(endpoints = urls.len(), "Aggregating history");

        let series = try_join_all(urls.iter().map(|url| self.fetch_history(url))).await?;
        Ok(merge_history(series.iter().map(Vec::as_slice)))
    }

    /// Summary and history together; both requests for every endpoint run
    /// concurrently.
    pub async fn get_report(&self) -> Result<AggregatedReport, ApiError> {
        let urls = self.endpoints();
        info!(endpoints = urls.len(), "Aggregating report");

        let parts = try_join_all(
            urls.iter()
                .map(|url| try_join(self.fetch_summary(url), self.fetch_history(url))),
        )
        .await?;

        let summary = merge_summaries(parts.iter().map(|(summary, _)| summary));
        let history = merge_history(parts.iter().map(|(_, history)| history.as_slice()));
        debug!(points = history.len(), total = summary.total, "Report merged");
        Ok(AggregatedReport { summary, history })
    }

    async fn fetch_summary(&self, url: &str) -> Result<SummaryMetrics, ApiError> {
        let response: SummaryResponse = self
            .gateway
            .get_json(url, SUMMARY_PATH)
            .await
            .map_err(|e| Self::source_failed(url, e))?;
        Ok(response.queries.into())
    }

    async fn fetch_history(&self, url: &str) -> Result<Vec<HistoryPoint>, ApiError> {
        let response: HistoryResponse = self
            .gateway
            .get_json(url, HISTORY_PATH)
            .await
            .map_err(|e| Self::source_failed(url, e))?;
        debug!(endpoint = %url, points = response.history.len(), "History fetched");
        Ok(response.history)
    }

    fn source_failed(url: &str, cause: ApiError) -> ApiError {
        warn!(endpoint = %url, error = %cause, "Endpoint failed, aborting aggregation");
        ApiError::partial_source(url, cause)
    }
}
