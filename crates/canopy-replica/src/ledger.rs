//! Per-replica request ledger and response cache.
//!
//! A group replica receives up to N copies of every forwarded request, one
//! per replica of the sending group, and must act exactly once, on the copy
//! that completes the receive threshold. The ledger tracks that protocol:
//! receive counters in `pending`, finalized results in a bounded cache, and
//! an audit set of the requests this replica delivered locally.
//!
//! Ledger contents are part of the replica's checkpointed state and must be
//! identical across replicas that processed the same ordered input, so every
//! container here iterates in a canonical order.

use std::collections::{BTreeMap, BTreeSet};

use canopy_types::RequestId;
use canopy_wire::Response;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ReplicaConfig;

// ============================================================================
// ResponseCache
// ============================================================================

/// Bounded map from request identifier to finalized response, with
/// least-recently-used eviction.
///
/// # Design Invariants
///
/// 1. **Deterministic eviction** - replicas that perform the same sequence
///    of operations evict the same entries, so recency is a logical tick
///    counter rather than wall-clock time.
/// 2. **Capacity-triggered only** - entries never expire; they leave when
///    capacity forces out the least recently used one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseCache {
    capacity: usize,

    /// Logical clock advanced on every insert and hit.
    tick: u64,

    entries: BTreeMap<RequestId, CacheSlot>,

    /// Recency index: tick of last use to the entry used then.
    recency: BTreeMap<u64, RequestId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CacheSlot {
    last_use: u64,
    response: Response,
}

impl ResponseCache {
    /// Creates a cache holding at most `capacity` responses (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tick: 0,
            entries: BTreeMap::new(),
            recency: BTreeMap::new(),
        }
    }

    /// Looks up the response for `id`, marking it as recently used.
    pub fn get(&mut self, id: RequestId) -> Option<&Response> {
        let stale = self.entries.get(&id)?.last_use;
        self.recency.remove(&stale);
        self.tick += 1;
        self.recency.insert(self.tick, id);

        let tick = self.tick;
        let slot = self.entries.get_mut(&id)?;
        slot.last_use = tick;
        Some(&slot.response)
    }

    /// Returns true if a response is cached for `id`, without touching
    /// recency.
    pub fn contains(&self, id: RequestId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Inserts or replaces the response for `id`, evicting the least
    /// recently used entry if the cache is full.
    pub fn insert(&mut self, id: RequestId, response: Response) {
        if let Some(stale) = self.entries.get(&id).map(|slot| slot.last_use) {
            self.recency.remove(&stale);
        } else if self.entries.len() >= self.capacity {
            self.evict();
        }

        self.tick += 1;
        self.recency.insert(self.tick, id);
        self.entries.insert(
            id,
            CacheSlot {
                last_use: self.tick,
                response,
            },
        );
    }

    fn evict(&mut self) {
        if let Some((&oldest, &stale)) = self.recency.first_key_value() {
            self.recency.remove(&oldest);
            self.entries.remove(&stale);
            debug!(request = %stale, "evicted least recently used response");
        }
    }

    /// Returns the number of cached responses.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ============================================================================
// ReplicaLedger
// ============================================================================

/// Replicated per-replica protocol state.
///
/// # Design Invariants
///
/// 1. A request identifier moves from `pending` to the cache exactly once,
///    the instant its receive counter reaches the threshold, and is never
///    reinserted into `pending` afterward.
/// 2. Ledger contents are deterministic across replicas of one group fed
///    the same ordered input; the whole ledger serializes into the
///    replication engine's checkpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaLedger {
    /// Requests this group instance delivered locally (audit record).
    handled: BTreeSet<RequestId>,

    /// Receive counters for forwarded requests still below the threshold.
    pending: BTreeMap<RequestId, u32>,

    /// Finalized responses, bounded by LRU eviction.
    cache: ResponseCache,

    /// Copies required before a forwarded request is acted on.
    min_receive_count: u32,
}

impl ReplicaLedger {
    /// Creates an empty ledger from the replica configuration.
    pub fn new(config: &ReplicaConfig) -> Self {
        Self {
            handled: BTreeSet::new(),
            pending: BTreeMap::new(),
            cache: ResponseCache::new(config.cache_capacity),
            min_receive_count: config.min_receive_count.max(1),
        }
    }

    /// Looks up the finalized response for `id`, refreshing its recency.
    pub fn get_cached(&mut self, id: RequestId) -> Option<&Response> {
        self.cache.get(id)
    }

    /// Returns true if a finalized response exists for `id`.
    pub fn is_cached(&self, id: RequestId) -> bool {
        self.cache.contains(id)
    }

    /// Counts one more received copy of forwarded request `id`.
    ///
    /// Returns true exactly when the counter reaches the receive threshold,
    /// the signal to act on the request. Callers must consult
    /// [`ReplicaLedger::is_cached`] first: a settled request must not be
    /// counted again.
    pub fn enqueue(&mut self, id: RequestId) -> bool {
        let count = self.pending.entry(id).or_insert(0);
        *count += 1;
        *count >= self.min_receive_count
    }

    /// Stores the finalized response for `id` and retires its counter.
    pub fn cache_response(&mut self, id: RequestId, response: Response) {
        self.cache.insert(id, response);
        self.pending.remove(&id);
    }

    /// Records that this group instance was a direct target of `id`.
    pub fn mark_handled(&mut self, id: RequestId) {
        self.handled.insert(id);
    }

    /// Returns true if this group instance delivered `id` locally.
    pub fn was_handled(&self, id: RequestId) -> bool {
        self.handled.contains(&id)
    }

    /// Returns the receive counter for `id`, if still pending.
    pub fn pending_count(&self, id: RequestId) -> Option<u32> {
        self.pending.get(&id).copied()
    }

    /// Returns the configured receive threshold.
    pub fn min_receive_count(&self) -> u32 {
        self.min_receive_count
    }

    /// Returns the number of finalized responses held.
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
