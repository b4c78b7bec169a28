//! Last-sample cache for rate computation
//!
//! Keeps the most recent [`Sample`] per resource so a stats request can be
//! answered from one fresh observation plus the cached previous one.
//! Entries are created on first observation and overwritten on every
//! subsequent one; they are never evicted (removed containers simply stop
//! being sampled, and the entry count is bounded by containers ever seen).

use crate::models::Sample;
use dashmap::DashMap;

/// Concurrency-safe mapping from resource id to its last observed sample.
///
/// `DashMap` shards the map, so samplers for different resources do not
/// contend; for a single resource, `replace` swaps the sample under the
/// shard lock, so a reader can never observe a torn sample and two
/// concurrent samplers cannot interleave read-old with write-new.
#[derive(Debug, Default)]
pub struct SampleCache {
    entries: DashMap<String, Sample>,
}

impl SampleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last sample observed for `resource_id`, if any.
    pub fn get(&self, resource_id: &str) -> Option<Sample> {
        self.entries.get(resource_id).map(|entry| entry.value().clone())
    }

    /// Store `sample` and return the previous one for the same resource.
    ///
    /// Read-old and write-new happen as one critical section per key.
    pub fn replace(&self, sample: Sample) -> Option<Sample> {
        self.entries.insert(sample.resource_id.clone(), sample)
    }

    /// Number of resources observed so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn sample(id: &str, cpu: u64) -> Sample {
        Sample {
            resource_id: id.to_string(),
            cpu_total_ns: cpu,
            system_total_ns: cpu * 10,
            memory_usage_bytes: 1024,
            memory_limit_bytes: 4096,
            network_rx_bytes: 0,
            network_tx_bytes: 0,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn first_observation_has_no_previous() {
        let cache = SampleCache::new();
        assert!(cache.replace(sample("c1", 100)).is_none());
        assert_eq!(cache.get("c1").unwrap().cpu_total_ns, 100);
    }

    #[test]
    fn replace_returns_the_prior_sample() {
        let cache = SampleCache::new();
        cache.replace(sample("c1", 100));
        let previous = cache.replace(sample("c1", 150)).unwrap();
        assert_eq!(previous.cpu_total_ns, 100);
        assert_eq!(cache.get("c1").unwrap().cpu_total_ns, 150);
    }

    #[test]
    fn resources_are_independent() {
        let cache = SampleCache::new();
        cache.replace(sample("c1", 100));
        assert!(cache.replace(sample("c2", 200)).is_none());
        assert_eq!(cache.get("c1").unwrap().cpu_total_ns, 100);
        assert_eq!(cache.get("c2").unwrap().cpu_total_ns, 200);
    }

    #[test]
    fn concurrent_replacement_forms_a_chain() {
        // Every inserted sample must show up exactly once, either as some
        // replacer's "previous" or as the final cache entry. Interleaved
        // read-old/write-new would duplicate or drop a value.
        let cache = Arc::new(SampleCache::new());
        cache.replace(sample("c1", 0));

        let handles: Vec<_> = (1..=32u64)
            .map(|cpu| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    cache.replace(sample("c1", cpu)).map(|prev| prev.cpu_total_ns)
                })
            })
            .collect();

        let mut seen: Vec<u64> = handles
            .into_iter()
            .map(|h| h.join().unwrap().expect("previous sample always present"))
            .collect();
        seen.push(cache.get("c1").unwrap().cpu_total_ns);

        let unique: HashSet<u64> = seen.iter().copied().collect();
        assert_eq!(unique.len(), seen.len(), "a sample was observed twice");
        assert_eq!(unique, (0..=32).collect::<HashSet<u64>>());
    }
}
