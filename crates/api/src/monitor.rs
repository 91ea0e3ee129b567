//! Fixed-interval liveness polling.
//!
//! The poll loop never adapts its interval and never aborts on failure;
//! a dead service shows up as a growing consecutive-failure count, not as
//! a terminated monitor.

use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

/// Interval between polls unless the deployment profile overrides it.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Polls between availability summaries (one per minute at the default
/// interval).
const POLLS_PER_SUMMARY: u64 = 12;

/// HTTP liveness client for a single service URL.
#[derive(Debug, Clone)]
pub struct MonitorClient {
    client: reqwest::Client,
    url: String,
}

/// Outcome of a single poll.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    /// HTTP status code
    pub status: u16,
    /// Round-trip latency
    pub latency: Duration,
    /// Whether the status was 2xx
    pub healthy: bool,
}

impl MonitorClient {
    /// Create a client for `url`. Each request is bounded by
    /// `request_timeout` so one hung poll cannot stall the loop.
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// One unauthenticated GET against the service.
    pub async fn poll_once(&self) -> Result<PollOutcome> {
        let started = Instant::now();
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        Ok(PollOutcome {
            status: status.as_u16(),
            latency: started.elapsed(),
            healthy: status.is_success(),
        })
    }
}

/// Running liveness statistics.
#[derive(Debug, Clone, Default)]
pub struct PollStats {
    /// Total polls attempted
    pub polls: u64,
    /// Polls that failed (transport error or non-2xx)
    pub failures: u64,
    /// Failures since the last success
    pub consecutive_failures: u64,
    /// Wall-clock time of the last successful poll
    pub last_success: Option<DateTime<Utc>>,
}

impl PollStats {
    pub fn record_success(&mut self) {
        self.polls += 1;
        self.consecutive_failures = 0;
        self.last_success = Some(Utc::now());
    }

    pub fn record_failure(&mut self) {
        self.polls += 1;
        self.failures += 1;
        self.consecutive_failures += 1;
    }

    /// Share of polls that succeeded, as a percentage. 100% before any poll.
    pub fn availability_pct(&self) -> f64 {
        if self.polls == 0 {
            return 100.0;
        }
        (self.polls - self.failures) as f64 / self.polls as f64 * 100.0
    }

    pub fn log_summary(&self) {
        info!(
            polls = self.polls,
            failures = self.failures,
            consecutive_failures = self.consecutive_failures,
            availability_pct = format!("{:.1}", self.availability_pct()),
            last_success = self
                .last_success
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string()),
            "Liveness summary"
        );
    }
}

/// Fixed-interval liveness monitor. Runs until the process is terminated.
pub struct LivenessMonitor {
    client: MonitorClient,
    poll_interval: Duration,
    stats: PollStats,
}

impl LivenessMonitor {
    pub fn new(client: MonitorClient, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
            stats: PollStats::default(),
        }
    }

    pub fn stats(&self) -> &PollStats {
        &self.stats
    }

    /// One poll, recorded into the stats.
    pub async fn tick(&mut self) {
        match self.client.poll_once().await {
            Ok(outcome) if outcome.healthy => {
                info!(
                    url = %self.client.url(),
                    status = outcome.status,
                    latency_ms = outcome.latency.as_millis() as u64,
                    "Service healthy"
                );
                self.stats.record_success();
            }
            Ok(outcome) => {
                warn!(
                    url = %self.client.url(),
                    status = outcome.status,
                    latency_ms = outcome.latency.as_millis() as u64,
                    "Service returned non-success status"
                );
                self.stats.record_failure();
            }
            Err(error) => {
                warn!(url = %self.client.url(), error = %error, "Poll failed");
                self.stats.record_failure();
            }
        }
    }

    /// Poll forever on the fixed interval.
    pub async fn run(mut self) -> Result<()> {
        info!(
            url = %self.client.url(),
            interval_secs = self.poll_interval.as_secs(),
            "Monitoring service"
        );

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.tick().await;
            if self.stats.polls % POLLS_PER_SUMMARY == 0 {
                self.stats.log_summary();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn test_stats_accounting() {
        let mut stats = PollStats::default();
        assert_eq!(stats.availability_pct(), 100.0);

        stats.record_success();
        stats.record_failure();
        stats.record_failure();
        assert_eq!(stats.polls, 3);
        assert_eq!(stats.failures, 2);
        assert_eq!(stats.consecutive_failures, 2);

        stats.record_success();
        assert_eq!(stats.consecutive_failures, 0);
        assert!(stats.last_success.is_some());
        assert!((stats.availability_pct() - 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_poll_once_healthy() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200).body("Balance: 1.0 ETH");
            })
            .await;

        let client = MonitorClient::new(server.url("/"), Duration::from_secs(1)).unwrap();
        let outcome = client.poll_once().await.unwrap();

        assert!(outcome.healthy);
        assert_eq!(outcome.status, 200);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_poll_once_server_error_is_unhealthy() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(503);
            })
            .await;

        let client = MonitorClient::new(server.url("/"), Duration::from_secs(1)).unwrap();
        let outcome = client.poll_once().await.unwrap();

        assert!(!outcome.healthy);
        assert_eq!(outcome.status, 503);
    }

    #[tokio::test]
    async fn test_tick_counts_transport_failure() {
        // nothing listens on this port
        let client =
            MonitorClient::new("http://127.0.0.1:9/", Duration::from_millis(200)).unwrap();
        let mut monitor = LivenessMonitor::new(client, DEFAULT_POLL_INTERVAL);

        monitor.tick().await;
        monitor.tick().await;

        assert_eq!(monitor.stats().failures, 2);
        assert_eq!(monitor.stats().consecutive_failures, 2);
        assert!(monitor.stats().last_success.is_none());
    }

    #[tokio::test]
    async fn test_tick_mixed_outcomes() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200);
            })
            .await;

        let client = MonitorClient::new(server.url("/"), Duration::from_secs(1)).unwrap();
        let mut monitor = LivenessMonitor::new(client, DEFAULT_POLL_INTERVAL);

        monitor.tick().await;
        assert_eq!(monitor.stats().polls, 1);
        assert_eq!(monitor.stats().failures, 0);
        assert!(monitor.stats().last_success.is_some());
        mock.assert_async().await;
    }
}
