//! Alert gating and delivery

use crate::errors::{MonitorError, Result};
use crate::models::{CheckResult, Endpoint};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Capability to push a text message to an external channel
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_notification(&self, text: &str) -> Result<()>;
}

/// Telegram bot transport
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(api_url: String, bot_token: String, chat_id: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(MonitorError::Http)?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token,
            chat_id,
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_notification(&self, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, self.bot_token);

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "chat_id": self.chat_id,
                "text": text,
                "parse_mode": "HTML",
            }))
            .send()
            .await
            .map_err(|e| MonitorError::Delivery(format!("Telegram request failed: {}", e)))?;

        let status = response.status();
        if status.as_u16() != 200 {
            return Err(MonitorError::Delivery(format!("Telegram answered {}", status)));
        }

        debug!("Telegram notification delivered");
        Ok(())
    }
}

/// Writes alerts to the operator log when no transport is configured
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_notification(&self, text: &str) -> Result<()> {
        warn!("ALERT: {}", text);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Down,
    Recovered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub kind: AlertKind,
    pub url: String,
    pub text: String,
}

impl AlertMessage {
    fn down(endpoint: &Endpoint, result: &CheckResult) -> Self {
        Self {
            kind: AlertKind::Down,
            url: endpoint.url.clone(),
            text: format!(
                "🚨 {} ({}) is down! Error: {}",
                endpoint.name,
                endpoint.environment,
                result.cause()
            ),
        }
    }

    fn recovered(endpoint: &Endpoint) -> Self {
        Self {
            kind: AlertKind::Recovered,
            url: endpoint.url.clone(),
            text: format!("✅ {} ({}) is up", endpoint.name, endpoint.environment),
        }
    }
}

/// Decides per check whether an alert fires and hands it to the notifier
pub struct AlertGate {
    notifier: Arc<dyn Notifier>,
    notify_on_recovery: bool,
    // Last observed state per url, only consulted for recovery alerts.
    last_state: Mutex<HashMap<String, bool>>,
}

impl AlertGate {
    pub fn new(notifier: Arc<dyn Notifier>, notify_on_recovery: bool) -> Self {
        Self {
            notifier,
            notify_on_recovery,
            last_state: Mutex::new(HashMap::new()),
        }
    }

    /// Decide whether `result` warrants an alert.
    ///
    /// Down observations alert on every sweep while the endpoint stays down.
    /// Recovery alerts fire only on a down-to-up transition seen by this gate.
    pub fn evaluate(&self, result: &CheckResult, endpoint: &Endpoint, notify_on_down: bool) -> Option<AlertMessage> {
        let previous = self
            .last_state
            .lock()
            .map(|mut states| states.insert(endpoint.url.clone(), result.is_up))
            .unwrap_or(None);

        if endpoint.ignore_notification {
            return None;
        }

        if !result.is_up {
            return notify_on_down.then(|| AlertMessage::down(endpoint, result));
        }

        if self.notify_on_recovery && previous == Some(false) {
            return Some(AlertMessage::recovered(endpoint));
        }

        None
    }

    /// Send an alert. Delivery failures are logged and swallowed.
    pub async fn dispatch(&self, alert: &AlertMessage) -> bool {
        match self.notifier.send_notification(&alert.text).await {
            Ok(()) => {
                info!("Sent {:?} alert for {}", alert.kind, alert.url);
                true
            }
            Err(e) => {
                error!("Failed to send alert for {}: {}", alert.url, e);
                false
            }
        }
    }
}

impl std::fmt::Debug for AlertGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertGate")
            .field("notify_on_recovery", &self.notify_on_recovery)
            .finish()
    }
}
