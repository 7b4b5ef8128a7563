//! Data structures shared by the probing, history and API layers

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::clock::log_timestamp;

/// A named, environment-tagged URL under observation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Endpoint {
    pub name: String,
    pub url: String,
    pub environment: String,
    #[serde(default)]
    pub ignore_notification: bool,
}

impl Endpoint {
    pub fn new(name: &str, url: &str, environment: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            environment: environment.to_string(),
            ignore_notification: false,
        }
    }

    pub fn with_ignore_notification(mut self, ignore: bool) -> Self {
        self.ignore_notification = ignore;
        self
    }
}

/// Outcome of one probe attempt
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CheckResult {
    pub url: String,
    pub name: String,
    pub environment: String,
    /// HTTP status code, 0 when no response was received
    #[serde(rename = "status")]
    pub http_status: u16,
    #[serde(rename = "isUp")]
    pub is_up: bool,
    #[serde(rename = "response_time", skip_serializing_if = "Option::is_none", default)]
    pub response_time_ms: Option<f64>,
    #[serde(rename = "error", skip_serializing_if = "Option::is_none", default)]
    pub error_message: Option<String>,
    #[serde(with = "log_timestamp")]
    pub timestamp: NaiveDateTime,
}

impl CheckResult {
    pub fn up(endpoint: &Endpoint, http_status: u16, response_time_ms: f64, timestamp: NaiveDateTime) -> Self {
        Self {
            url: endpoint.url.clone(),
            name: endpoint.name.clone(),
            environment: endpoint.environment.clone(),
            http_status,
            is_up: true,
            response_time_ms: Some(response_time_ms),
            error_message: None,
            timestamp,
        }
    }

    pub fn down(endpoint: &Endpoint, http_status: u16, error: String, timestamp: NaiveDateTime) -> Self {
        Self {
            url: endpoint.url.clone(),
            name: endpoint.name.clone(),
            environment: endpoint.environment.clone(),
            http_status,
            is_up: false,
            response_time_ms: None,
            error_message: Some(error),
            timestamp,
        }
    }

    /// Failure cause suitable for alerts and summaries
    pub fn cause(&self) -> &str {
        self.error_message.as_deref().unwrap_or("Unknown error")
    }
}

/// One persisted observation, one JSON object per history line
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HistoryRecord {
    #[serde(with = "log_timestamp")]
    pub timestamp: NaiveDateTime,
    pub url: String,
    pub status: u16,
    #[serde(rename = "isUp")]
    pub is_up: bool,
    #[serde(rename = "response_time", default)]
    pub response_time_ms: f64,
}

impl From<&CheckResult> for HistoryRecord {
    fn from(result: &CheckResult) -> Self {
        Self {
            timestamp: result.timestamp,
            url: result.url.clone(),
            status: result.http_status,
            is_up: result.is_up,
            response_time_ms: result.response_time_ms.unwrap_or(0.0),
        }
    }
}

/// Uptime figures derived from history on every request
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct UptimeStats {
    pub uptime_percentage: f64,
    #[serde(rename = "avg_response_time")]
    pub avg_response_time_ms: f64,
    pub total_checks: usize,
    pub total_failures: usize,
}

/// Results of a sweep keyed by endpoint URL
pub type SweepResults = BTreeMap<String, CheckResult>;

/// Everything a finished sweep produced
#[derive(Clone, Debug, Default)]
pub struct SweepReport {
    pub results: SweepResults,
    /// Endpoints whose history append failed, with the cause
    pub persist_failures: Vec<(String, String)>,
}

impl SweepReport {
    pub fn down_results(&self) -> impl Iterator<Item = &CheckResult> {
        self.results.values().filter(|r| !r.is_up)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DownSite {
    pub url: String,
    pub error: String,
    pub timestamp: String,
}

/// Response body of a cron-triggered sweep
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CronSummary {
    pub success: bool,
    pub message: String,
    #[serde(rename = "downSites")]
    pub down_sites: Vec<DownSite>,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 4)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_up_result_json_shape() {
        let endpoint = Endpoint::new("Shop", "https://a.test", "production");
        let result = CheckResult::up(&endpoint, 200, 120.5, ts());

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({
                "url": "https://a.test",
                "name": "Shop",
                "environment": "production",
                "status": 200,
                "isUp": true,
                "response_time": 120.5,
                "timestamp": "2024-05-04 10:30:00"
            })
        );
    }

    #[test]
    fn test_down_result_carries_error_not_latency() {
        let endpoint = Endpoint::new("Shop", "https://b.test", "staging");
        let result = CheckResult::down(&endpoint, 0, "timeout".to_string(), ts());

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["error"], "timeout");
        assert_eq!(value["status"], 0);
        assert!(value.get("response_time").is_none());
        assert_eq!(result.cause(), "timeout");
    }

    #[test]
    fn test_history_record_from_down_result_zeroes_latency() {
        let endpoint = Endpoint::new("Shop", "https://b.test", "staging");
        let result = CheckResult::down(&endpoint, 0, "timeout".to_string(), ts());
        let record = HistoryRecord::from(&result);

        assert_eq!(record.response_time_ms, 0.0);
        assert!(!record.is_up);
        assert_eq!(record.timestamp, ts());
    }

    #[test]
    fn test_history_line_parses_integer_latency() {
        let line = r#"{"timestamp":"2024-05-04 10:30:00","url":"https://a.test","status":0,"isUp":false,"response_time":0}"#;
        let record: HistoryRecord = serde_json::from_str(line).unwrap();

        assert_eq!(record.url, "https://a.test");
        assert_eq!(record.response_time_ms, 0.0);
        assert_eq!(record.timestamp, ts());
    }

    #[test]
    fn test_endpoint_ignore_notification_defaults_false() {
        let endpoint: Endpoint =
            serde_json::from_str(r#"{"name":"a","url":"https://a.test","environment":"prod"}"#).unwrap();
        assert!(!endpoint.ignore_notification);
    }
}
