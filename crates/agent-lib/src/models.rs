//! Core data models for the panel agent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observation of a container's cumulative counters.
///
/// Samples are owned by the [`crate::stats::SampleCache`] and replaced
/// atomically on every fresh observation; they are never partially mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub resource_id: String,
    /// Cumulative container CPU time in nanoseconds.
    pub cpu_total_ns: u64,
    /// Cumulative host CPU time in nanoseconds at the same instant.
    pub system_total_ns: u64,
    pub memory_usage_bytes: u64,
    pub memory_limit_bytes: u64,
    /// Cumulative receive bytes summed over all interfaces.
    pub network_rx_bytes: u64,
    /// Cumulative transmit bytes summed over all interfaces.
    pub network_tx_bytes: u64,
    pub observed_at: DateTime<Utc>,
}

/// Raw counters returned by a one-shot stats call against the runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterSnapshot {
    pub cpu_total_ns: u64,
    pub system_total_ns: u64,
    /// Number of per-core usage entries the runtime reported (0 if unknown).
    pub percpu_count: usize,
    pub memory_usage_bytes: u64,
    pub memory_limit_bytes: u64,
    pub network_rx_bytes: u64,
    pub network_tx_bytes: u64,
    pub observed_at: DateTime<Utc>,
}

impl CounterSnapshot {
    /// Bind a snapshot to the resource it was taken from.
    pub fn into_sample(self, resource_id: impl Into<String>) -> Sample {
        Sample {
            resource_id: resource_id.into(),
            cpu_total_ns: self.cpu_total_ns,
            system_total_ns: self.system_total_ns,
            memory_usage_bytes: self.memory_usage_bytes,
            memory_limit_bytes: self.memory_limit_bytes,
            network_rx_bytes: self.network_rx_bytes,
            network_tx_bytes: self.network_tx_bytes,
            observed_at: self.observed_at,
        }
    }
}

/// Hard CPU limit configured on a container, if any.
///
/// Docker expresses this either as an absolute `NanoCpus` quota or as a
/// CFS `quota`/`period` pair; both may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuLimit {
    pub nano_cpus: Option<i64>,
    pub quota: Option<i64>,
    pub period: Option<i64>,
}

/// Rates and limits derived from two counter observations, as returned
/// by the stats endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerStatsReport {
    pub cpu_percent: f64,
    pub cpu_limit_percent: f64,
    pub mem_usage_mb: f64,
    pub mem_limit_mb: f64,
    pub network_rx_bytes: u64,
    pub network_tx_bytes: u64,
    pub host_cpus: usize,
}
