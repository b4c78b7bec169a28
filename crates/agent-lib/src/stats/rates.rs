//! Rate calculation from cumulative counters
//!
//! Turns a (previous, current) pair of counter observations into normalized
//! percentages. The tricky cases all live here: a missing or stale previous
//! sample, counter resets after a container restart, and a zero system-time
//! divisor must all yield well-defined results, never a negative value or
//! NaN.

use crate::models::{CpuLimit, Sample};

/// A previous sample older than this is treated like no previous sample:
/// a delta against a 30-second-old baseline is not an instantaneous rate.
pub const STALE_AFTER_SECS: i64 = 30;

const BYTES_PER_MB: f64 = 1_048_576.0;

/// CPU usage percentage, normalized so one fully-busy core is 100.
///
/// With a fresh previous sample this is delta-based; with no usable
/// previous sample it falls back to the ratio of absolute counters.
pub fn cpu_percent(current: &Sample, previous: Option<&Sample>, cores: usize) -> f64 {
    let fresh = previous.filter(|prev| {
        current
            .observed_at
            .signed_duration_since(prev.observed_at)
            .num_seconds()
            <= STALE_AFTER_SECS
    });

    match fresh {
        Some(prev) => {
            // Strictly positive deltas only: a counter reset (container
            // restarted between samples) must read as 0, not negative.
            if current.cpu_total_ns > prev.cpu_total_ns
                && current.system_total_ns > prev.system_total_ns
            {
                let cpu_delta = (current.cpu_total_ns - prev.cpu_total_ns) as f64;
                let system_delta = (current.system_total_ns - prev.system_total_ns) as f64;
                (cpu_delta / system_delta) * cores as f64 * 100.0
            } else {
                0.0
            }
        }
        None => {
            if current.system_total_ns == 0 {
                0.0
            } else {
                (current.cpu_total_ns as f64 / current.system_total_ns as f64)
                    * cores as f64
                    * 100.0
            }
        }
    }
}

/// Number of cores to normalize against: the per-core entry count the
/// runtime reported, or the host's logical core count when unknown.
pub fn resolve_cores(percpu_count: usize) -> usize {
    if percpu_count > 0 {
        percpu_count
    } else {
        num_cpus::get()
    }
}

/// Configured hard CPU limit as a percentage, defaulting to all cores.
pub fn cpu_limit_percent(limit: &CpuLimit, cores: usize) -> f64 {
    if let Some(nano_cpus) = limit.nano_cpus.filter(|&n| n > 0) {
        return nano_cpus as f64 / 1e7;
    }
    if let (Some(quota), Some(period)) = (
        limit.quota.filter(|&q| q > 0),
        limit.period.filter(|&p| p > 0),
    ) {
        return quota as f64 / period as f64 * 100.0;
    }
    cores as f64 * 100.0
}

/// Bytes reported as megabytes, no delta involved.
pub fn mem_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}
