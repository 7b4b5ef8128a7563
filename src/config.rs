//! Configuration management for the site monitor

use crate::clock::{parse_time_of_day, parse_utc_offset, LogClock};
use chrono::{FixedOffset, NaiveTime};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Behavioural switches for a single sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepMode {
    /// Publish the finished sweep as the snapshot served by `last-status`
    pub enable_dashboard: bool,

    /// Write every endpoint outcome to the operator log at info/error level
    pub log_only: bool,

    /// Deliver alerts for down observations
    pub notify_on_down: bool,
}

impl SweepMode {
    /// Mode used by cron-triggered sweeps
    pub fn cron() -> Self {
        Self {
            enable_dashboard: false,
            log_only: true,
            notify_on_down: true,
        }
    }

    pub fn label(&self) -> &'static str {
        match (self.enable_dashboard, self.log_only) {
            (true, _) => "dashboard",
            (false, true) => "cron",
            (false, false) => "silent",
        }
    }
}

impl Default for SweepMode {
    fn default() -> Self {
        Self {
            enable_dashboard: true,
            log_only: false,
            notify_on_down: true,
        }
    }
}

/// When and how far back history is pruned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Records older than this many days are removed
    pub days: i64,

    /// Local time of day whose minute triggers compaction on a cron sweep
    pub compact_at: NaiveTime,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            days: 30,
            compact_at: NaiveTime::MIN,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the grouped site list
    pub sites_path: PathBuf,

    /// Path to the newline-delimited history log
    pub history_path: PathBuf,

    /// Listen address of the read API
    pub bind_address: String,

    /// Offset history timestamps are written in
    pub log_offset: FixedOffset,

    /// Timeout for a single probe
    pub probe_timeout: Duration,

    /// Upper bound on probes in flight during one sweep
    pub max_concurrent_probes: usize,

    /// Treat 4xx/5xx responses as down instead of up
    pub down_on_http_error: bool,

    /// History retention
    pub retention: RetentionPolicy,

    /// Interval between built-in cron sweeps in `serve`, zero disables them
    pub check_interval: Duration,

    /// Alert when an endpoint comes back up
    pub notify_on_recovery: bool,

    /// Mode for on-demand sweeps
    pub sweep_mode: SweepMode,

    /// Telegram bot token, alerts are only logged when unset
    pub telegram_bot_token: Option<String>,

    /// Telegram chat receiving alerts
    pub telegram_chat_id: Option<String>,

    /// Base URL of the Telegram bot API
    pub telegram_api_url: String,

    /// HTTP timeout for alert delivery
    pub notify_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sites_path: PathBuf::from("config/websites.json"),
            history_path: PathBuf::from("storage/logs/cron.log"),
            bind_address: "0.0.0.0:8080".to_string(),
            log_offset: LogClock::default().offset(),
            probe_timeout: Duration::from_secs(10),
            max_concurrent_probes: 4,
            down_on_http_error: false,
            retention: RetentionPolicy::default(),
            check_interval: Duration::ZERO,
            notify_on_recovery: false,
            sweep_mode: SweepMode::default(),
            telegram_bot_token: None,
            telegram_chat_id: None,
            telegram_api_url: "https://api.telegram.org".to_string(),
            notify_timeout: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(path) = env::var("SITES_CONFIG") {
            config.sites_path = PathBuf::from(path);
        }

        if let Ok(path) = env::var("HISTORY_PATH") {
            config.history_path = PathBuf::from(path);
        }

        if let Ok(bind) = env::var("BIND_ADDRESS") {
            config.bind_address = bind;
        }

        if let Ok(offset) = env::var("LOG_UTC_OFFSET") {
            match parse_utc_offset(&offset) {
                Ok(parsed) => config.log_offset = parsed,
                Err(e) => warn!("Ignoring LOG_UTC_OFFSET: {}", e),
            }
        }

        if let Ok(timeout) = env::var("PROBE_TIMEOUT_SECONDS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.probe_timeout = Duration::from_secs(seconds);
            }
        }

        if let Ok(limit) = env::var("MAX_CONCURRENT_PROBES") {
            if let Ok(limit) = limit.parse() {
                config.max_concurrent_probes = limit;
            }
        }

        if let Ok(strict) = env::var("DOWN_ON_HTTP_ERROR") {
            config.down_on_http_error = parse_flag(&strict);
        }

        if let Ok(days) = env::var("RETENTION_DAYS") {
            if let Ok(days) = days.parse() {
                config.retention.days = days;
            }
        }

        if let Ok(at) = env::var("COMPACT_AT") {
            match parse_time_of_day(&at) {
                Ok(parsed) => config.retention.compact_at = parsed,
                Err(e) => warn!("Ignoring COMPACT_AT: {}", e),
            }
        }

        if let Ok(interval) = env::var("CHECK_INTERVAL_SECONDS") {
            if let Ok(seconds) = interval.parse::<u64>() {
                config.check_interval = Duration::from_secs(seconds);
            }
        }

        if let Ok(recovery) = env::var("NOTIFY_ON_RECOVERY") {
            config.notify_on_recovery = parse_flag(&recovery);
        }

        if let Ok(dashboard) = env::var("DASHBOARD_ENABLED") {
            config.sweep_mode.enable_dashboard = parse_flag(&dashboard);
        }

        if let Ok(log_only) = env::var("LOG_ONLY") {
            config.sweep_mode.log_only = parse_flag(&log_only);
        }

        if let Ok(notify) = env::var("NOTIFY_ON_DOWN") {
            config.sweep_mode.notify_on_down = parse_flag(&notify);
        }

        config.telegram_bot_token = env::var("TELEGRAM_BOT_TOKEN").ok().filter(|v| !v.is_empty());
        config.telegram_chat_id = env::var("TELEGRAM_CHAT_ID").ok().filter(|v| !v.is_empty());

        if let Ok(api_url) = env::var("TELEGRAM_API_URL") {
            config.telegram_api_url = api_url.trim_end_matches('/').to_string();
        }

        if let Ok(timeout) = env::var("NOTIFY_TIMEOUT_SECONDS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.notify_timeout = Duration::from_secs(seconds);
            }
        }

        config
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.sites_path.as_os_str().is_empty() {
            return Err("sites_path cannot be empty".to_string());
        }

        if self.history_path.as_os_str().is_empty() {
            return Err("history_path cannot be empty".to_string());
        }

        if self.bind_address.is_empty() {
            return Err("bind_address cannot be empty".to_string());
        }

        if self.probe_timeout.is_zero() {
            return Err("probe_timeout must be greater than 0".to_string());
        }

        if self.max_concurrent_probes == 0 {
            return Err("max_concurrent_probes must be greater than 0".to_string());
        }

        if self.retention.days <= 0 {
            return Err("retention days must be greater than 0".to_string());
        }

        if self.telegram_bot_token.is_some() != self.telegram_chat_id.is_some() {
            return Err("TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID must be set together".to_string());
        }

        Ok(())
    }

    pub fn clock(&self) -> LogClock {
        LogClock::new(self.log_offset)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_reference_behaviour() {
        let config = Config::default();
        assert_eq!(config.probe_timeout, Duration::from_secs(10));
        assert_eq!(config.retention.days, 30);
        assert_eq!(config.retention.compact_at, NaiveTime::MIN);
        assert_eq!(config.log_offset.local_minus_utc(), 8 * 3600);
        assert!(!config.down_on_http_error);
        assert!(!config.notify_on_recovery);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cron_mode_flags() {
        let mode = SweepMode::cron();
        assert!(!mode.enable_dashboard);
        assert!(mode.log_only);
        assert!(mode.notify_on_down);
        assert_eq!(mode.label(), "cron");
        assert_eq!(SweepMode::default().label(), "dashboard");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.max_concurrent_probes = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.retention.days = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.telegram_bot_token = Some("token".to_string());
        assert!(config.validate().is_err());

        config.telegram_chat_id = Some("42".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" 1 "));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("nope"));
    }
}
