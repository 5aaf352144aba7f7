//! Tiered cache manager composing ordered backends into one façade.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::{CacheProvider, CacheStats, CacheValue};

/// Read-through, write-through cache over an ordered list of tiers.
///
/// Tiers are probed fastest-first. A hit in a slower tier is promoted by
/// writing the value into every faster tier that missed, so hot keys
/// migrate toward memory while durable tiers keep the full history.
/// Writes go to every tier unconditionally.
///
/// An empty tier list is a valid configuration: the manager then behaves
/// as a permanent-miss cache.
pub struct CacheManager {
    tiers: Vec<Arc<dyn CacheProvider>>,
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.tiers.iter().map(|t| t.name()).collect();
        f.debug_struct("CacheManager").field("tiers", &names).finish()
    }
}

impl CacheManager {
    /// Create a manager over `tiers`, ordered fastest/smallest first.
    #[must_use]
    pub fn new(tiers: Vec<Arc<dyn CacheProvider>>) -> Self {
        Self { tiers }
    }

    /// The managed tiers, in probe order.
    #[must_use]
    pub fn tiers(&self) -> &[Arc<dyn CacheProvider>] {
        &self.tiers
    }

    /// Per-tier statistics, keyed by probe position and backend identity
    /// (e.g. `"0-memory"`, `"1-sqlite"`).
    #[must_use]
    pub fn tier_stats(&self) -> BTreeMap<String, CacheStats> {
        self.tiers
            .iter()
            .enumerate()
            .map(|(idx, tier)| (format!("{idx}-{}", tier.name()), tier.stats()))
            .collect()
    }
}

impl CacheProvider for CacheManager {
    fn name(&self) -> &'static str {
        "tiered"
    }

    fn get(&self, key: &str) -> Option<CacheValue> {
        for (idx, tier) in self.tiers.iter().enumerate() {
            if let Some(value) = tier.get(key) {
                // Promote into every faster tier that missed.
                for faster in &self.tiers[..idx] {
                    faster.set(key, value.clone());
                }
                if idx > 0 {
                    log::trace!("promoted cache key {key} from tier {}", tier.name());
                }
                return Some(value);
            }
        }
        None
    }

    fn set(&self, key: &str, value: CacheValue) {
        for tier in &self.tiers {
            tier.set(key, value.clone());
        }
    }

    fn clear(&self) {
        for tier in &self.tiers {
            tier.clear();
        }
    }

    /// Returns the largest per-tier removal count, i.e. how many of the
    /// given keys were present somewhere in the hierarchy.
    fn invalidate(&self, keys: &[String]) -> usize {
        self.tiers
            .iter()
            .map(|tier| tier.invalidate(keys))
            .max()
            .unwrap_or(0)
    }

    fn pre_warm(&self, entries: &HashMap<String, CacheValue>) {
        for tier in &self.tiers {
            tier.pre_warm(entries);
        }
    }

    fn stats(&self) -> CacheStats {
        let mut aggregate = CacheStats::default();
        for tier in &self.tiers {
            aggregate.absorb(&tier.stats());
        }
        aggregate
    }
}
