use std::collections::BTreeMap;

use crate::models::{HistoryPoint, SummaryMetrics};

/// Sum per-endpoint counters and recompute the blocked percentage from
/// the merged totals.
pub fn merge_summaries<'a, I>(parts: I) -> SummaryMetrics
where
    I: IntoIterator<Item = &'a SummaryMetrics>,
{
    let (total, blocked, unique_domains) = parts.into_iter().fold((0u64, 0u64, 0u64), |acc, m| {
        (
            acc.0.saturating_add(m.total),
            acc.1.saturating_add(m.blocked),
            acc.2.saturating_add(m.unique_domains),
        )
    });
    SummaryMetrics::new(total, blocked, unique_domains)
}

/// Merge series by exact timestamp. Points sharing a timestamp are summed,
/// all others pass through; no gap filling. Output is ascending.
pub fn merge_history<'a, I>(series: I) -> Vec<HistoryPoint>
where
    I: IntoIterator<Item = &'a [HistoryPoint]>,
{
    let mut buckets: BTreeMap<i64, HistoryPoint> = BTreeMap::new();
    for points in series {
        for point in points {
            buckets
                .entry(point.timestamp)
                .and_modify(|bucket| bucket.accumulate(point))
                .or_insert(*point);
        }
    }
    buckets.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(timestamp: i64, total: u64, cached: u64, blocked: u64, forwarded: u64) -> HistoryPoint {
        HistoryPoint { timestamp, total, cached, blocked, forwarded }
    }

    #[test]
    fn test_merge_summaries_saturates() {
        let huge = SummaryMetrics::new(u64::MAX, u64::MAX, 3);
        let small = SummaryMetrics::new(1, 1, 4);
        let merged = merge_summaries([&huge, &small]);
        assert_eq!(merged.total, u64::MAX);
        assert_eq!(merged.blocked, u64::MAX);
        assert_eq!(merged.unique_domains, 7);
    }

    #[test]
    fn test_merge_summaries_scenario() {
        let a = SummaryMetrics::new(100, 20, 40);
        let b = SummaryMetrics::new(50, 10, 15);
        let merged = merge_summaries([&a, &b]);

        assert_eq!(merged.total, 150);
        assert_eq!(merged.blocked, 30);
        assert_eq!(merged.percent_blocked, 20.0);
        assert_eq!(merged.unique_domains, 55);
    }

    #[test]
    fn test_percent_is_not_averaged() {
        // 50% of 2 and 10% of 100: the average would be 30%, the real share is 11/102
        let a = SummaryMetrics::new(2, 1, 1);
        let b = SummaryMetrics::new(100, 10, 1);
        let merged = merge_summaries([&a, &b]);
        assert!((merged.percent_blocked - 1100.0 / 102.0).abs() < 1e-9);
    }

    #[test]
    fn test_merge_summaries_empty() {
        let merged = merge_summaries(std::iter::empty());
        assert_eq!(merged, SummaryMetrics::default());
        assert_eq!(merged.percent_blocked, 0.0);
    }

    #[test]
    fn test_merge_history_overlapping() {
        let a = vec![point(1000, 10, 2, 3, 5)];
        let b = vec![point(1000, 4, 1, 1, 2)];
        let merged = merge_history([a.as_slice(), b.as_slice()]);
        assert_eq!(merged, vec![point(1000, 14, 3, 4, 7)]);
    }

    #[test]
    fn test_merge_history_disjoint_is_union() {
        let a = vec![point(600, 1, 0, 0, 1), point(1800, 3, 1, 1, 1)];
        let b = vec![point(1200, 2, 1, 0, 1)];
        let merged = merge_history([a.as_slice(), b.as_slice()]);
        assert_eq!(
            merged,
            vec![point(600, 1, 0, 0, 1), point(1200, 2, 1, 0, 1), point(1800, 3, 1, 1, 1)]
        );
    }

    #[test]
    fn test_merge_history_sorts_unsorted_input() {
        let a = vec![point(3000, 1, 0, 0, 1), point(1000, 1, 0, 0, 1)];
        let merged = merge_history([a.as_slice()]);
        let stamps: Vec<i64> = merged.iter().map(|p| p.timestamp).collect();
        assert_eq!(stamps, vec![1000, 3000]);
    }

    #[test]
    fn test_merge_history_empty_series_contributes_nothing() {
        let a = vec![point(1000, 5, 1, 1, 3)];
        let empty: Vec<HistoryPoint> = Vec::new();
        let merged = merge_history([a.as_slice(), empty.as_slice()]);
        assert_eq!(merged, a);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let a = vec![point(1000, 10, 2, 3, 5), point(1600, 7, 1, 2, 4)];
        let b = vec![point(1000, 4, 1, 1, 2), point(2200, 9, 3, 3, 3)];
        let c = vec![point(1600, 1, 0, 1, 0), point(2200, 2, 1, 0, 1), point(400, 6, 2, 2, 2)];
        let series = [a.as_slice(), b.as_slice(), c.as_slice()];

        let summaries = [
            SummaryMetrics::new(100, 20, 7),
            SummaryMetrics::new(50, 10, 3),
            SummaryMetrics::new(13, 0, 9),
        ];

        let expected_history = merge_history(series);
        let expected_summary = merge_summaries(&summaries);

        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        for order in orders {
            let history = merge_history(order.iter().map(|&i| series[i]));
            let summary = merge_summaries(order.iter().map(|&i| &summaries[i]));
            assert_eq!(history, expected_history, "history differs for order {:?}", order);
            assert_eq!(summary, expected_summary, "summary differs for order {:?}", order);
        }
    }
}
