//! Per-worker scope cache
//!
//! Holds at most one snapshot per worker. The map is sharded, so workers
//! inserting and removing their own keys never contend on a single lock, and
//! no operation awaits while holding a shard.

use crate::cache::types::CacheStats;
use crate::settings::SystemSettings;
use crate::worker::WorkerId;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Mapping from worker to that worker's cached snapshot
pub struct ScopeCache<T = SystemSettings> {
    entries: DashMap<WorkerId, Arc<T>>,
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    clears: AtomicU64,
}

impl<T> ScopeCache<T> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            loads: AtomicU64::new(0),
            clears: AtomicU64::new(0),
        }
    }

    /// The snapshot cached for `worker`, if any. Never another worker's.
    pub fn get(&self, worker: WorkerId) -> Option<Arc<T>> {
        match self.entries.get(&worker) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Scope cache hit: {}", worker);
                Some(Arc::clone(entry.value()))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Scope cache miss: {}", worker);
                None
            }
        }
    }

    /// Store `value` as the scope entry for `worker`, replacing any previous one
    pub fn put(&self, worker: WorkerId, value: Arc<T>) {
        if self.entries.insert(worker, value).is_some() {
            debug!("Replaced scope entry: {}", worker);
        } else {
            debug!("Stored scope entry: {}", worker);
        }
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    /// Remove the scope entry for `worker`. Returns whether one existed.
    pub fn clear(&self, worker: WorkerId) -> bool {
        let removed = self.entries.remove(&worker).is_some();
        if removed {
            self.clears.fetch_add(1, Ordering::Relaxed);
            debug!("Cleared scope entry: {}", worker);
        }
        removed
    }

    /// Check for an entry without counting a hit or miss
    pub fn contains(&self, worker: WorkerId) -> bool {
        self.entries.contains_key(&worker)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}

impl<T> Default for ScopeCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for ScopeCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeCache")
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_clear() {
        let cache: ScopeCache<u32> = ScopeCache::new();
        let worker = WorkerId::next();

        assert!(cache.get(worker).is_none());

        cache.put(worker, Arc::new(10));
        assert_eq!(cache.get(worker).as_deref(), Some(&10));
        assert!(cache.contains(worker));

        assert!(cache.clear(worker));
        assert!(cache.get(worker).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_absent_is_noop() {
        let cache: ScopeCache<u32> = ScopeCache::new();
        let worker = WorkerId::next();

        assert!(!cache.clear(worker));
        assert!(!cache.clear(worker));
        assert_eq!(cache.stats().clears, 0);
    }

    #[test]
    fn test_entries_are_isolated_per_worker() {
        let cache: ScopeCache<u32> = ScopeCache::new();
        let w1 = WorkerId::next();
        let w2 = WorkerId::next();

        cache.put(w1, Arc::new(10));
        assert!(cache.get(w2).is_none());

        cache.put(w2, Arc::new(20));
        cache.clear(w1);

        assert!(cache.get(w1).is_none());
        assert_eq!(cache.get(w2).as_deref(), Some(&20));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_put_replaces_wholesale() {
        let cache: ScopeCache<String> = ScopeCache::new();
        let worker = WorkerId::next();

        cache.put(worker, Arc::new("old".to_string()));
        cache.put(worker, Arc::new("new".to_string()));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(worker).as_deref().map(String::as_str), Some("new"));
    }

    #[test]
    fn test_get_returns_same_allocation() {
        let cache: ScopeCache<u32> = ScopeCache::new();
        let worker = WorkerId::next();
        let value = Arc::new(42);

        cache.put(worker, Arc::clone(&value));
        let first = cache.get(worker).unwrap();
        let second = cache.get(worker).unwrap();

        assert!(Arc::ptr_eq(&first, &value));
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_stats_tracking() {
        let cache: ScopeCache<u32> = ScopeCache::new();
        let worker = WorkerId::next();

        cache.get(worker);
        cache.put(worker, Arc::new(1));
        cache.get(worker);
        cache.get(worker);
        cache.clear(worker);

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.loads, 1);
        assert_eq!(stats.clears, 1);
        assert_eq!(stats.entries, 0);
    }
}
