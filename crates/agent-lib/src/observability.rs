//! Observability infrastructure for the panel agent
//!
//! Provides:
//! - Prometheus metrics (authorization outcomes, policy state, stats latency)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AgentMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct AgentMetricsInner {
    auth_unauthorized_total: IntCounter,
    auth_forbidden_total: IntCounter,
    policy_fail_open: IntGauge,
    policy_reloads_total: IntCounter,
    stats_latency_seconds: Histogram,
    backend_errors_total: IntCounter,
}

impl AgentMetricsInner {
    fn new() -> Self {
        Self {
            auth_unauthorized_total: register_int_counter!(
                "panel_agent_auth_unauthorized_total",
                "Requests rejected for a bad or missing bearer token"
            )
            .expect("Failed to register auth_unauthorized_total"),

            auth_forbidden_total: register_int_counter!(
                "panel_agent_auth_forbidden_total",
                "Requests rejected because the client address is not allowed"
            )
            .expect("Failed to register auth_forbidden_total"),

            policy_fail_open: register_int_gauge!(
                "panel_agent_policy_fail_open",
                "1 when the network policy fell back to allow-all on a load error"
            )
            .expect("Failed to register policy_fail_open"),

            policy_reloads_total: register_int_counter!(
                "panel_agent_policy_reloads_total",
                "Number of network policy reloads"
            )
            .expect("Failed to register policy_reloads_total"),

            stats_latency_seconds: register_histogram!(
                "panel_agent_stats_latency_seconds",
                "Time spent taking a one-shot stats snapshot and computing rates",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register stats_latency_seconds"),

            backend_errors_total: register_int_counter!(
                "panel_agent_backend_errors_total",
                "Total number of runtime backend call failures"
            )
            .expect("Failed to register backend_errors_total"),
        }
    }
}

/// Agent metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct AgentMetrics {
    // This is just a marker - we use the global instance
    _private: (),
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AgentMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Count a request rejected for a bad bearer token
    pub fn inc_unauthorized(&self) {
        self.inner().auth_unauthorized_total.inc();
    }

    /// Count a request rejected for a disallowed client address
    pub fn inc_forbidden(&self) {
        self.inner().auth_forbidden_total.inc();
    }

    /// Record whether the current policy is running fail-open
    pub fn set_policy_fail_open(&self, fail_open: bool) {
        self.inner().policy_fail_open.set(i64::from(fail_open));
    }

    /// Count a policy reload
    pub fn inc_policy_reloads(&self) {
        self.inner().policy_reloads_total.inc();
    }

    /// Record a stats request latency observation
    pub fn observe_stats_latency(&self, duration_secs: f64) {
        self.inner().stats_latency_seconds.observe(duration_secs);
    }

    /// Count a runtime backend call failure
    pub fn inc_backend_errors(&self) {
        self.inner().backend_errors_total.inc();
    }
}

/// Structured logger for agent lifecycle events
///
/// Provides consistent JSON-formatted logging for startup, shutdown and
/// policy changes.
#[derive(Clone)]
pub struct StructuredLogger {
    host_name: String,
}

impl StructuredLogger {
    pub fn new(host_name: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
        }
    }

    /// Log agent startup
    pub fn log_startup(&self, version: &str, listen_addr: &str) {
        info!(
            event = "agent_started",
            host = %self.host_name,
            agent_version = %version,
            listen_addr = %listen_addr,
            "Panel agent started"
        );
    }

    /// Log agent shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            host = %self.host_name,
            reason = %reason,
            "Panel agent shutting down"
        );
    }

    /// Log the outcome of a policy (re)load
    pub fn log_policy_loaded(&self, path: &str, allow_all: bool, fail_open: bool) {
        if fail_open {
            warn!(
                event = "policy_fail_open",
                host = %self.host_name,
                path = %path,
                "Network policy unavailable, admitting all client addresses"
            );
        } else {
            info!(
                event = "policy_loaded",
                host = %self.host_name,
                path = %path,
                allow_all = allow_all,
                "Network policy loaded"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_metrics_creation() {
        // Metrics are registered in a process-global registry, so this only
        // checks the handle works end to end.
        let metrics = AgentMetrics::new();

        metrics.inc_unauthorized();
        metrics.inc_forbidden();
        metrics.set_policy_fail_open(true);
        metrics.set_policy_fail_open(false);
        metrics.inc_policy_reloads();
        metrics.observe_stats_latency(0.004);
        metrics.inc_backend_errors();
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("web01");
        assert_eq!(logger.host_name, "web01");
    }
}
