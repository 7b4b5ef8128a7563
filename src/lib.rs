//! Site Monitor Library
//!
//! Periodically probes configured HTTP endpoints, keeps an append-only
//! history of the outcomes, derives uptime statistics from it and alerts
//! when an endpoint is down.

pub mod alert;
pub mod clock;
pub mod config;
pub mod controllers;
pub mod errors;
pub mod history;
pub mod models;
pub mod monitor;
pub mod prober;
pub mod sites;
pub mod state;
pub mod uptime;

pub use alert::{AlertGate, AlertKind, AlertMessage, LogNotifier, Notifier, TelegramNotifier};
pub use clock::LogClock;
pub use config::{Config, RetentionPolicy, SweepMode};
pub use errors::{MonitorError, Result};
pub use history::{CompactionStats, HistoryStore};
pub use models::{CheckResult, CronSummary, DownSite, Endpoint, HistoryRecord, SweepReport, UptimeStats};
pub use monitor::SiteMonitor;
pub use prober::Prober;
pub use uptime::UptimeAggregator;
