//! Bounded in-memory cache with LRU eviction and optional TTL.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::{CacheProvider, CacheStats, CacheValue};

#[derive(Debug)]
struct MemoryEntry {
    value: CacheValue,
    created: Instant,
    last_access: u64,
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: HashMap<String, MemoryEntry>,
    /// Logical clock for LRU tracking; bumped on every read and write.
    clock: u64,
    hits: u64,
    misses: u64,
    sets: u64,
    evictions: u64,
    expirations: u64,
}

impl MemoryInner {
    fn touch(&mut self, key: &str) {
        self.clock += 1;
        let clock = self.clock;
        if let Some(entry) = self.entries.get_mut(key) {
            entry.last_access = clock;
        }
    }

    fn evict_lru(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone());
        if let Some(key) = victim {
            log::trace!("evicting least recently used cache entry: {key}");
            self.entries.remove(&key);
            self.evictions += 1;
        }
    }
}

/// In-process cache bounded by entry count.
///
/// When full, inserting a new key evicts the least recently used entry.
/// Recency is updated by both reads and writes. With a TTL configured,
/// entries older than the TTL are treated as absent and removed on the
/// next lookup.
#[derive(Debug)]
pub struct InMemoryCache {
    inner: Mutex<MemoryInner>,
    max_size: Option<usize>,
    ttl: Option<Duration>,
}

impl InMemoryCache {
    /// Create a new in-memory cache.
    ///
    /// # Arguments
    ///
    /// * `max_size` - Maximum number of entries (`None` for unbounded)
    /// * `ttl` - Time-to-live for entries (`None` for no age expiry)
    #[must_use]
    pub fn new(max_size: Option<usize>, ttl: Option<Duration>) -> Self {
        Self {
            inner: Mutex::new(MemoryInner::default()),
            max_size,
            ttl,
        }
    }

    /// Create an unbounded cache without expiration.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(None, None)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, entry: &MemoryEntry) -> bool {
        self.ttl.is_some_and(|ttl| entry.created.elapsed() > ttl)
    }
}

impl CacheProvider for InMemoryCache {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> Option<CacheValue> {
        let mut inner = self.lock();

        let Some(entry) = inner.entries.get(key) else {
            inner.misses += 1;
            return None;
        };

        if self.is_expired(entry) {
            inner.entries.remove(key);
            inner.expirations += 1;
            inner.misses += 1;
            return None;
        }

        let value = entry.value.clone();
        inner.touch(key);
        inner.hits += 1;
        Some(value)
    }

    fn set(&self, key: &str, value: CacheValue) {
        let mut inner = self.lock();

        if let Some(max) = self.max_size {
            // Only a brand-new key can push the cache over capacity.
            if !inner.entries.contains_key(key) && inner.entries.len() >= max {
                inner.evict_lru();
            }
        }

        inner.clock += 1;
        let entry = MemoryEntry {
            value,
            created: Instant::now(),
            last_access: inner.clock,
        };
        inner.entries.insert(key.to_string(), entry);
        inner.sets += 1;
    }

    fn clear(&self) {
        self.lock().entries.clear();
    }

    fn invalidate(&self, keys: &[String]) -> usize {
        let mut inner = self.lock();
        keys.iter()
            .filter(|key| inner.entries.remove(key.as_str()).is_some())
            .count()
    }

    fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            sets: inner.sets,
            evictions: inner.evictions,
            expirations: inner.expirations,
            size: inner.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_key_is_a_miss() {
        let cache = InMemoryCache::unbounded();
        assert!(cache.get("nope").is_none());
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_set_then_get_round_trip() {
        let cache = InMemoryCache::unbounded();
        cache.set("k", json!({"language": "rust"}));
        assert_eq!(cache.get("k"), Some(json!({"language": "rust"})));
        let stats = cache.stats();
        assert_eq!(stats.sets, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn test_lru_eviction_removes_least_recently_accessed() {
        let cache = InMemoryCache::new(Some(2), None);
        cache.set("a", json!(1));
        cache.set("b", json!(2));

        // Touch "a" so "b" becomes the LRU entry.
        assert!(cache.get("a").is_some());

        cache.set("c", json!(3));
        assert_eq!(cache.stats().evictions, 1);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_exactly_one_eviction_for_n_plus_one_inserts() {
        let cache = InMemoryCache::new(Some(3), None);
        for i in 0..4 {
            cache.set(&format!("key{i}"), json!(i));
        }
        let stats = cache.stats();
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.size, 3);
        // No reads happened, so the first insert was least recently used.
        assert!(cache.get("key0").is_none());
    }

    #[test]
    fn test_updating_existing_key_does_not_evict() {
        let cache = InMemoryCache::new(Some(2), None);
        cache.set("a", json!(1));
        cache.set("b", json!(2));
        cache.set("a", json!(10));
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.get("a"), Some(json!(10)));
    }

    #[test]
    fn test_ttl_expiry_counts_expiration_and_miss() {
        let cache = InMemoryCache::new(None, Some(Duration::from_millis(20)));
        cache.set("k", json!("v"));
        std::thread::sleep(Duration::from_millis(40));

        assert!(cache.get("k").is_none());
        let stats = cache.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 0);
    }

    #[test]
    fn test_no_ttl_means_no_expiry() {
        let cache = InMemoryCache::unbounded();
        cache.set("k", json!("v"));
        std::thread::sleep(Duration::from_millis(10));
        assert!(cache.get("k").is_some());
        assert_eq!(cache.stats().expirations, 0);
    }

    #[test]
    fn test_clear_keeps_counters() {
        let cache = InMemoryCache::unbounded();
        cache.set("k", json!("v"));
        cache.get("k");
        cache.clear();
        let stats = cache.stats();
        assert_eq!(stats.size, 0);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.sets, 1);
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn test_invalidate_counts_removed_keys() {
        let cache = InMemoryCache::unbounded();
        cache.set("a", json!(1));
        cache.set("b", json!(2));
        let removed = cache.invalidate(&["a".to_string(), "missing".to_string()]);
        assert_eq!(removed, 1);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn test_pre_warm_inserts_all_entries() {
        let cache = InMemoryCache::unbounded();
        let mut entries = HashMap::new();
        entries.insert("x".to_string(), json!(1));
        entries.insert("y".to_string(), json!(2));
        cache.pre_warm(&entries);
        assert_eq!(cache.stats().sets, 2);
        assert!(cache.get("x").is_some());
        assert!(cache.get("y").is_some());
    }
}
