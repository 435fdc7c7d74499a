//! Cluster health polling.
//!
//! Polls `GET /_cluster/health` on the loopback interface until the reported
//! status reaches a target or a deadline passes. A server that is still
//! booting refuses connections or answers with an error status; both are
//! treated as "not yet" and polled again. Timing out is reported through
//! [`HealthOutcome`], never as an error.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, error, info};

use crate::constants::{DEFAULT_HEALTH_POLL_INTERVAL_MS, DEFAULT_HEALTH_TIMEOUT_MS};

/// The rendered per-run config leaves `network.host` unset, so the server
/// binds its default loopback addresses, which include `127.0.0.1`.
const HEALTH_HOST: &str = "127.0.0.1";

/// Lower bound for a single request's timeout near the deadline.
const MIN_REQUEST_TIMEOUT: Duration = Duration::from_millis(50);

/// Cluster status, ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterHealth {
    Red,
    Yellow,
    Green,
}

impl ClusterHealth {
    /// Whether this status is at least as good as `target`.
    pub fn satisfies(self, target: Self) -> bool {
        self >= target
    }
}

impl fmt::Display for ClusterHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Green => "green",
        })
    }
}

/// How a health wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthOutcome {
    /// The cluster reported this status, which satisfies the target.
    Reached(ClusterHealth),
    /// The deadline passed; `last` is the last status seen, if any.
    TimedOut { last: Option<ClusterHealth> },
    /// There was no running server to ask.
    NotStarted,
}

impl HealthOutcome {
    /// Whether the target status was reached.
    pub fn is_reached(&self) -> bool {
        matches!(self, Self::Reached(_))
    }
}

/// Poll interval and overall deadline for a health wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolling {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for HealthPolling {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_HEALTH_POLL_INTERVAL_MS),
            timeout: Duration::from_millis(DEFAULT_HEALTH_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: ClusterHealth,
}

/// URL of the health endpoint for `port`.
pub fn health_url(port: u16) -> String {
    format!("http://{HEALTH_HOST}:{port}/_cluster/health")
}

/// Ask the server for its current status once.
///
/// Returns `None` if the server cannot be reached or the answer cannot be
/// decoded.
pub fn fetch_health(port: u16, request_timeout: Duration) -> Option<ClusterHealth> {
    let url = health_url(port);
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(request_timeout))
        .build();
    let agent: ureq::Agent = config.into();

    let mut response = match agent.get(&url).call() {
        Ok(response) => response,
        Err(e) => {
            debug!(%url, error = %e, "Health request failed");
            return None;
        },
    };
    match response.body_mut().read_json::<HealthResponse>() {
        Ok(health) => Some(health.status),
        Err(e) => {
            debug!(%url, error = %e, "Unreadable health response");
            None
        },
    }
}

/// Poll until the cluster on `port` reports `target` (or better) or the
/// deadline passes.
pub fn wait_for_status(port: u16, target: ClusterHealth, polling: HealthPolling) -> HealthOutcome {
    let deadline = Instant::now()
        .checked_add(polling.timeout)
        .unwrap_or_else(|| Instant::now() + Duration::from_secs(u64::from(u32::MAX)));
    let mut last = None;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if let Some(status) = fetch_health(port, remaining.max(MIN_REQUEST_TIMEOUT)) {
            last = Some(status);
            if status.satisfies(target) {
                info!(port, %status, "Cluster health reached");
                return HealthOutcome::Reached(status);
            }
        }

        if Instant::now() >= deadline {
            let current = last.map_or_else(|| "unknown".to_string(), |s| s.to_string());
            error!(
                port,
                %target,
                timeout_ms = polling.timeout.as_millis(),
                "Cluster failed to turn {target} in time, current status is {current}"
            );
            return HealthOutcome::TimedOut { last };
        }
        thread::sleep(polling.interval);
    }
}
