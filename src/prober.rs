//! HTTP prober issuing one GET per endpoint

use crate::clock::LogClock;
use crate::errors::{MonitorError, Result};
use crate::models::{CheckResult, Endpoint};
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

/// Issues a single probe per call, with no retries
#[derive(Debug, Clone)]
pub struct Prober {
    client: Client,
    timeout: Duration,
    down_on_http_error: bool,
    clock: LogClock,
}

impl Prober {
    /// Create a new prober
    pub fn new(probe_timeout: Duration, down_on_http_error: bool, clock: LogClock) -> Result<Self> {
        let client = Client::builder()
            .timeout(probe_timeout)
            .user_agent(format!("site_monitor/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(MonitorError::Http)?;

        Ok(Self {
            client,
            timeout: probe_timeout,
            down_on_http_error,
            clock,
        })
    }

    /// Probe an endpoint once.
    ///
    /// Any HTTP response counts as up unless `down_on_http_error` is set;
    /// transport failures always produce a down result with status 0.
    #[instrument(skip(self, endpoint), fields(url = %endpoint.url))]
    pub async fn check(&self, endpoint: &Endpoint) -> CheckResult {
        let started = Instant::now();
        let outcome = timeout(self.timeout, self.client.get(&endpoint.url).send()).await;
        let elapsed_ms = round_ms(started.elapsed());
        let timestamp = self.clock.now();

        match outcome {
            Ok(Ok(response)) => {
                let status = response.status();
                debug!("{} answered {} in {}ms", endpoint.url, status.as_u16(), elapsed_ms);

                if self.down_on_http_error && (status.is_client_error() || status.is_server_error()) {
                    return CheckResult::down(
                        endpoint,
                        status.as_u16(),
                        format!("HTTP {}", status),
                        timestamp,
                    );
                }

                CheckResult::up(endpoint, status.as_u16(), elapsed_ms, timestamp)
            }
            Ok(Err(err)) => {
                let cause = describe_error(&err);
                warn!("Probe of {} failed after {}ms: {}", endpoint.url, elapsed_ms, cause);
                CheckResult::down(endpoint, 0, cause, timestamp)
            }
            Err(_) => {
                warn!("Probe of {} timed out after {}ms", endpoint.url, elapsed_ms);
                CheckResult::down(endpoint, 0, "timeout".to_string(), timestamp)
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Human-readable cause for a failed request
pub fn describe_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        return "timeout".to_string();
    }

    let root = root_cause(err);

    if err.is_connect() {
        return format!("connection failed: {}", root);
    }

    if err.is_builder() {
        return format!("invalid url: {}", root);
    }

    if err.is_redirect() {
        return format!("redirect error: {}", root);
    }

    err.to_string()
}

fn root_cause(err: &reqwest::Error) -> String {
    let mut current: &dyn std::error::Error = err;
    while let Some(next) = current.source() {
        current = next;
    }
    current.to_string()
}

fn round_ms(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}
