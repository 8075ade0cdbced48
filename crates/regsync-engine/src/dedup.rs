//! Bounded dedup cache for already-mirrored layers.

use std::collections::{HashSet, VecDeque};

/// Fixed-capacity FIFO membership set recording which layers have already
/// been copied to which target.
///
/// Entries are keyed by `layer-id:target-region:target-bucket`. When the
/// cache is full, the oldest *inserted* entry is evicted first; lookups
/// never affect eviction order (this is insertion-order rotation, not an
/// LRU). There is no removal. The cache lives for the lifetime of the
/// process, spanning every session the process runs.
#[derive(Debug)]
pub struct DedupCache {
    members: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl DedupCache {
    /// Default capacity of the process-wide cache.
    pub const DEFAULT_CAPACITY: usize = 10_000;

    /// Create a cache holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            members: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Create a cache with [`DedupCache::DEFAULT_CAPACITY`].
    #[must_use]
    pub fn with_default_capacity() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }

    /// The dedup key for one layer mirrored to one target.
    #[must_use]
    pub fn layer_key(layer_id: &str, target_region: &str, target_bucket: &str) -> String {
        format!("{layer_id}:{target_region}:{target_bucket}")
    }

    /// Whether `key` was inserted and has not been evicted.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.members.contains(key)
    }

    /// Record `key`, evicting the oldest entry if the cache is full.
    ///
    /// Re-inserting a present key is a no-op; it keeps its original
    /// position in the eviction order.
    pub fn insert(&mut self, key: String) {
        if self.members.contains(&key) {
            return;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        self.members.insert(key.clone());
        self.order.push_back(key);
    }

    /// Number of entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Maximum number of entries the cache can hold.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
