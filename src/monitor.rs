//! Sweep orchestration: probe, persist, alert, compact

use crate::alert::{AlertGate, LogNotifier, Notifier, TelegramNotifier};
use crate::clock::LogClock;
use crate::config::{Config, RetentionPolicy, SweepMode};
use crate::errors::{MonitorError, Result};
use crate::history::HistoryStore;
use crate::models::{
    CheckResult, CronSummary, DownSite, Endpoint, HistoryRecord, SweepReport, UptimeStats,
};
use crate::prober::Prober;
use crate::sites::load_endpoints;
use crate::uptime::UptimeAggregator;

use chrono::{NaiveDateTime, TimeDelta};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Drives sweeps over the configured endpoints
pub struct SiteMonitor {
    endpoints: Vec<Endpoint>,
    prober: Prober,
    store: Arc<HistoryStore>,
    aggregator: UptimeAggregator,
    alerts: AlertGate,
    clock: LogClock,
    mode: SweepMode,
    retention: RetentionPolicy,
    max_concurrent_probes: usize,
    sweep_lock: Mutex<()>,
    last_sweep: RwLock<Option<SweepReport>>,
    last_cron_at: Mutex<Option<NaiveDateTime>>,
}

impl SiteMonitor {
    /// Build a monitor from configuration, loading the site list from disk
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate().map_err(MonitorError::Config)?;

        let endpoints = load_endpoints(&config.sites_path)?;

        let notifier: Arc<dyn Notifier> = match (&config.telegram_bot_token, &config.telegram_chat_id) {
            (Some(token), Some(chat_id)) => Arc::new(TelegramNotifier::new(
                config.telegram_api_url.clone(),
                token.clone(),
                chat_id.clone(),
                config.notify_timeout,
            )?),
            _ => {
                warn!("Telegram credentials not set, alerts will only be logged");
                Arc::new(LogNotifier)
            }
        };

        Self::new(config, endpoints, notifier)
    }

    /// Build a monitor over an explicit endpoint list and notifier
    pub fn new(config: &Config, endpoints: Vec<Endpoint>, notifier: Arc<dyn Notifier>) -> Result<Self> {
        config.validate().map_err(MonitorError::Config)?;

        if endpoints.is_empty() {
            return Err(MonitorError::Config("no sites configured".to_string()));
        }

        let clock = config.clock();
        let store = Arc::new(HistoryStore::open(&config.history_path)?);
        let prober = Prober::new(config.probe_timeout, config.down_on_http_error, clock)?;

        Ok(Self {
            endpoints,
            prober,
            aggregator: UptimeAggregator::new(Arc::clone(&store), clock),
            store,
            alerts: AlertGate::new(notifier, config.notify_on_recovery),
            clock,
            mode: config.sweep_mode,
            retention: config.retention,
            max_concurrent_probes: config.max_concurrent_probes,
            sweep_lock: Mutex::new(()),
            last_sweep: RwLock::new(None),
            last_cron_at: Mutex::new(None),
        })
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn clock(&self) -> LogClock {
        self.clock
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Run one sweep in the configured mode
    pub async fn run_sweep(&self) -> SweepReport {
        self.run_sweep_with(self.mode).await
    }

    /// Run one sweep: every endpoint is probed once, persisted and evaluated.
    ///
    /// A failing endpoint never stops the others. Sweeps are serialized so
    /// per-url history stays in timestamp order.
    pub async fn run_sweep_with(&self, mode: SweepMode) -> SweepReport {
        let _guard = self.sweep_lock.lock().await;
        let span = info_span!("sweep", sweep_id = %Uuid::new_v4(), mode = mode.label());

        async {
            debug!("Sweeping {} endpoints", self.endpoints.len());

            let checks: Vec<_> = self
                .endpoints
                .iter()
                .map(|endpoint| self.check_endpoint(endpoint, mode))
                .collect();

            let outcomes: Vec<(CheckResult, Option<String>)> = stream::iter(checks)
                .buffer_unordered(self.max_concurrent_probes)
                .collect()
                .await;

            let mut report = SweepReport::default();
            for (result, persist_error) in outcomes {
                if let Some(e) = persist_error {
                    report.persist_failures.push((result.url.clone(), e));
                }
                report.results.insert(result.url.clone(), result);
            }

            let down = report.down_results().count();
            info!(
                "Sweep finished: {} checked, {} down, {} not persisted",
                report.results.len(),
                down,
                report.persist_failures.len()
            );

            if mode.enable_dashboard {
                *self.last_sweep.write().await = Some(report.clone());
            }

            report
        }
        .instrument(span)
        .await
    }

    async fn check_endpoint(&self, endpoint: &Endpoint, mode: SweepMode) -> (CheckResult, Option<String>) {
        let result = self.prober.check(endpoint).await;

        let persist_error = match self.store.append(&HistoryRecord::from(&result)).await {
            Ok(()) => None,
            Err(e) => {
                error!("Failed to record check of {}: {}", endpoint.url, e);
                Some(e.to_string())
            }
        };

        if let Some(alert) = self.alerts.evaluate(&result, endpoint, mode.notify_on_down) {
            self.alerts.dispatch(&alert).await;
        }

        match (mode.log_only, result.is_up) {
            (true, true) => info!(
                "Site {} is UP ({} in {}ms)",
                endpoint.url,
                result.http_status,
                result.response_time_ms.unwrap_or(0.0)
            ),
            (true, false) => error!("Site {} is DOWN: {}", endpoint.url, result.cause()),
            (false, _) => debug!("Checked {}: up={}", endpoint.url, result.is_up),
        }

        (result, persist_error)
    }

    /// Cron entry point: sweep, then compact if the daily trigger minute is now
    pub async fn run_cron(&self) -> Result<CronSummary> {
        let report = self.run_sweep_with(SweepMode::cron()).await;
        let timestamp = self.clock.now_string();

        let down_sites = report
            .down_results()
            .map(|result| DownSite {
                url: result.url.clone(),
                error: result.cause().to_string(),
                timestamp: timestamp.clone(),
            })
            .collect();

        self.maybe_compact().await?;

        Ok(CronSummary {
            success: true,
            message: "Cron check completed".to_string(),
            down_sites,
            timestamp,
        })
    }

    /// Compact history if the daily trigger time has been reached
    pub async fn maybe_compact(&self) -> Result<bool> {
        self.maybe_compact_at(self.clock.now()).await
    }

    /// Compact history if the daily trigger was crossed since the previous
    /// cron sweep of this process, or if `now` falls in the trigger minute
    /// when there is no previous sweep.
    ///
    /// A failed compaction does not advance the marker, so the next cron
    /// sweep retries it. Returns whether compaction ran.
    pub async fn maybe_compact_at(&self, now: NaiveDateTime) -> Result<bool> {
        let mut last_cron_at = self.last_cron_at.lock().await;

        if !self.compaction_due(*last_cron_at, now) {
            *last_cron_at = Some(now);
            return Ok(false);
        }

        let cutoff = LogClock::days_before(now, self.retention.days);
        info!(
            "Compacting history older than {} ({} day retention)",
            self.clock.format(&cutoff),
            self.retention.days
        );

        self.store.compact(cutoff).await?;
        *last_cron_at = Some(now);
        Ok(true)
    }

    fn compaction_due(&self, previous: Option<NaiveDateTime>, now: NaiveDateTime) -> bool {
        let at = self.retention.compact_at;
        let mut trigger = now.date().and_time(at);
        if trigger > now {
            trigger = match trigger.checked_sub_signed(TimeDelta::days(1)) {
                Some(t) => t,
                None => return false,
            };
        }

        match previous {
            Some(previous) if previous <= now => previous < trigger,
            _ => LogClock::is_at_minute(&now, at),
        }
    }

    /// Raw history for the read API
    pub async fn history(&self, url: &str, window_hours: i64) -> Vec<HistoryRecord> {
        self.aggregator.history(url, window_hours).await
    }

    pub async fn stats(&self, url: &str, window_hours: i64) -> UptimeStats {
        self.aggregator.stats(url, window_hours).await
    }

    /// Latest sweep published by a dashboard-mode sweep
    pub async fn last_sweep(&self) -> Option<SweepReport> {
        self.last_sweep.read().await.clone()
    }

    /// Run cron sweeps forever at `every`
    pub async fn run_periodic(self: Arc<Self>, every: std::time::Duration) {
        info!("Running cron sweeps every {}s", every.as_secs());

        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if let Err(e) = self.run_cron().await {
                error!("Periodic cron sweep failed: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for SiteMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteMonitor")
            .field("endpoints", &self.endpoints.len())
            .field("history", &self.store.path())
            .field("mode", &self.mode)
            .finish()
    }
}
