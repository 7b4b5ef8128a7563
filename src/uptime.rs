//! Uptime aggregation over the history log

use crate::clock::LogClock;
use crate::history::HistoryStore;
use crate::models::{HistoryRecord, UptimeStats};
use std::sync::Arc;
use tracing::debug;

/// Derives uptime figures from history; nothing is cached
#[derive(Debug, Clone)]
pub struct UptimeAggregator {
    store: Arc<HistoryStore>,
    clock: LogClock,
}

impl UptimeAggregator {
    pub fn new(store: Arc<HistoryStore>, clock: LogClock) -> Self {
        Self { store, clock }
    }

    /// Raw records for `url` over the last `window_hours`
    pub async fn history(&self, url: &str, window_hours: i64) -> Vec<HistoryRecord> {
        self.store.scan(url, self.clock.hours_ago(window_hours)).await
    }

    /// Uptime statistics for `url` over the last `window_hours`
    pub async fn stats(&self, url: &str, window_hours: i64) -> UptimeStats {
        let records = self.history(url, window_hours).await;
        let stats = summarize(&records);
        debug!(
            "Uptime for {} over {}h: {}% across {} checks",
            url, window_hours, stats.uptime_percentage, stats.total_checks
        );
        stats
    }
}

/// Fold a record set into stats.
///
/// The average covers every record, down observations included, so outages
/// pull it towards zero.
pub fn summarize(records: &[HistoryRecord]) -> UptimeStats {
    if records.is_empty() {
        return UptimeStats::default();
    }

    let total = records.len();
    let up = records.iter().filter(|r| r.is_up).count();
    let latency_sum: f64 = records.iter().map(|r| r.response_time_ms).sum();

    UptimeStats {
        uptime_percentage: round2(up as f64 / total as f64 * 100.0),
        avg_response_time_ms: round2(latency_sum / total as f64),
        total_checks: total,
        total_failures: total - up,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
