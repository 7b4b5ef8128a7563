#![allow(dead_code)]

use async_trait::async_trait;
use site_monitor::{Config, Endpoint, MonitorError, Notifier, Result, SiteMonitor};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Notifier that remembers every message it was asked to send
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub async fn messages(&self) -> Vec<String> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_notification(&self, text: &str) -> Result<()> {
        self.sent.lock().await.push(text.to_string());
        if self.fail {
            return Err(MonitorError::Delivery("channel unavailable".to_string()));
        }
        Ok(())
    }
}

/// Config writing history into `dir` with a short probe timeout
pub fn test_config(dir: &tempfile::TempDir) -> Config {
    Config {
        history_path: dir.path().join("cron.log"),
        probe_timeout: Duration::from_millis(300),
        ..Config::default()
    }
}

pub fn build_monitor(
    config: &Config,
    endpoints: Vec<Endpoint>,
    notifier: Arc<RecordingNotifier>,
) -> SiteMonitor {
    SiteMonitor::new(config, endpoints, notifier).expect("monitor builds")
}
