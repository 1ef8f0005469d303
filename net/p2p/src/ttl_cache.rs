//! A bounded LRU cache with a per-entry TTL.
//!
//! Replaces the "global mutable caches" the redesign notes in spec.md §9
//! flag (recently-seen block roots, seen gossip message ids, exclusion
//! list): each such cache is now an explicit, independently-owned
//! component with its own capacity and expiry, passed in as a dependency
//! rather than reached through a package-level singleton. Grounded on the
//! `failed_chains: LRUTimeCache<Hash256>` field used by the teacher's
//! range-sync engine (`dabdb084…range.rs`).

use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

pub struct TtlCache<K: Eq + Hash> {
    inner: LruCache<K, Instant>,
    ttl: Duration,
}

impl<K: Eq + Hash + Clone> TtlCache<K> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: LruCache::new(NonZeroUsize::new(capacity.max(1)).unwrap()),
            ttl,
        }
    }

    /// Inserts `key`, refreshing its expiry. Lazily evicts the
    /// least-recently-used expired entries encountered along the way.
    pub fn insert(&mut self, key: K) {
        self.inner.put(key, Instant::now() + self.ttl);
    }

    /// True if `key` is present and has not expired.
    pub fn contains(&mut self, key: &K) -> bool {
        match self.inner.get(key) {
            Some(expiry) => *expiry > Instant::now(),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// One-year TTL for seen-gossip / seen-block-root dedup, per spec.md §9.
pub const ONE_YEAR: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_entries() {
        let mut cache: TtlCache<u32> = TtlCache::new(4, Duration::from_millis(10));
        cache.insert(1);
        assert!(cache.contains(&1));
        std::thread::sleep(Duration::from_millis(20));
        assert!(!cache.contains(&1));
    }

    #[test]
    fn distinct_keys_independent() {
        let mut cache: TtlCache<u32> = TtlCache::new(4, Duration::from_secs(60));
        cache.insert(1);
        cache.insert(2);
        assert!(cache.contains(&1));
        assert!(cache.contains(&2));
        assert!(!cache.contains(&3));
    }
}
