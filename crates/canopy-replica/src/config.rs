//! Replica configuration.

use serde::{Deserialize, Serialize};

/// Tunables for one group replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaConfig {
    /// Copies of a forwarded request that must arrive before the replica
    /// acts on it.
    ///
    /// A sending group runs N replicas of which up to F may be faulty, so a
    /// receiver trusts a forwarded request only after N - F equivalent
    /// copies. Client requests bypass the threshold.
    pub min_receive_count: u32,

    /// Capacity of the finalized-response cache.
    ///
    /// Must be large enough to outlive the forwarding round-trip window;
    /// eviction is capacity-triggered, not time-triggered.
    pub cache_capacity: usize,

    /// Ordered-dispatch attempts per downstream group before the dispatch
    /// is reported as failed.
    pub dispatch_attempts: u32,
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self {
            min_receive_count: 1,
            cache_capacity: 4096 * 1_000,
            dispatch_attempts: 3,
        }
    }
}

impl ReplicaConfig {
    /// Configuration for testing (small limits).
    pub fn testing() -> Self {
        Self {
            min_receive_count: 1,
            cache_capacity: 64,
            dispatch_attempts: 1,
        }
    }

    /// Sets the receive threshold, keeping the other tunables.
    #[must_use]
    pub fn with_min_receive_count(mut self, count: u32) -> Self {
        self.min_receive_count = count;
        self
    }

    /// Sets the cache capacity, keeping the other tunables.
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }
}
