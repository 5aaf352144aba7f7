//! Property-based tests for the cache contract.

use proptest::prelude::*;
use serde_json::json;

use repolens::cache::{CacheProvider, InMemoryCache};

proptest! {
    /// Anything stored can be read back before eviction or expiry.
    #[test]
    fn set_then_get_round_trips(
        key in "[a-zA-Z0-9_/.-]{1,40}",
        value in "\\PC{0,60}",
    ) {
        let cache = InMemoryCache::unbounded();
        cache.set(&key, json!({ "payload": value }));
        prop_assert_eq!(cache.get(&key), Some(json!({ "payload": value })));
    }

    /// Keys that were never stored always miss.
    #[test]
    fn absent_keys_always_miss(keys in proptest::collection::hash_set("[a-z]{1,12}", 0..16)) {
        let cache = InMemoryCache::unbounded();
        for key in &keys {
            prop_assert!(cache.get(key).is_none());
        }
        let stats = cache.stats();
        prop_assert_eq!(stats.misses as usize, keys.len());
        prop_assert_eq!(stats.hits, 0);
    }

    /// A bounded cache never exceeds its capacity and evicts exactly the
    /// overflow when distinct keys are inserted without reads.
    #[test]
    fn eviction_count_matches_overflow(
        max_size in 1usize..16,
        keys in proptest::collection::hash_set("[a-z0-9]{1,10}", 1..32),
    ) {
        let cache = InMemoryCache::new(Some(max_size), None);
        for key in &keys {
            cache.set(key, json!(1));
        }

        let stats = cache.stats();
        prop_assert!(stats.size <= max_size);
        prop_assert_eq!(stats.size, keys.len().min(max_size));
        prop_assert_eq!(stats.evictions as usize, keys.len().saturating_sub(max_size));
    }

    /// Overwriting the same key never triggers eviction.
    #[test]
    fn overwrites_do_not_evict(values in proptest::collection::vec("\\PC{0,20}", 1..20)) {
        let cache = InMemoryCache::new(Some(1), None);
        for value in &values {
            cache.set("only", json!(value));
        }
        let stats = cache.stats();
        prop_assert_eq!(stats.evictions, 0);
        prop_assert_eq!(stats.size, 1);
        prop_assert_eq!(cache.get("only"), Some(json!(values.last().unwrap())));
    }

    /// Invalidation removes exactly the requested present keys.
    #[test]
    fn invalidate_removes_only_named_keys(
        keys in proptest::collection::hash_set("[a-z]{1,8}", 1..12),
    ) {
        let cache = InMemoryCache::unbounded();
        for key in &keys {
            cache.set(key, json!("v"));
        }

        let mut sorted: Vec<String> = keys.iter().cloned().collect();
        sorted.sort();
        let (victims, survivors) = sorted.split_at(sorted.len() / 2);

        let removed = cache.invalidate(&victims.to_vec());
        prop_assert_eq!(removed, victims.len());
        for key in victims {
            prop_assert!(cache.get(key).is_none());
        }
        for key in survivors {
            prop_assert!(cache.get(key).is_some());
        }
    }
}
