//! Container stats: last-sample cache and rate calculation.

mod cache;
pub mod rates;

pub use cache::SampleCache;
pub use rates::{cpu_limit_percent, cpu_percent, mem_mb, resolve_cores, STALE_AFTER_SECS};
