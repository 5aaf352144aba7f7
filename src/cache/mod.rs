//! Result caching for analysis output.
//!
//! This module provides persistent and in-process storage for file analysis
//! results so repeated scans avoid re-analyzing unchanged content.
//!
//! # Architecture
//!
//! The caching system is built from interchangeable backends behind one
//! contract:
//!
//! * [`memory`]: bounded in-process LRU cache with optional TTL.
//! * [`sqlite`]: SQLite-backed store that survives process restarts.
//! * [`filesystem`]: one file per entry under a cache directory.
//! * [`manager`]: composes backends into a tiered read-through cache.
//!
//! # Failure Semantics
//!
//! Storage failures never propagate out of a backend. A tier that cannot
//! read or write degrades to a miss/no-op for that operation, so a broken
//! cache only costs performance, never correctness.

pub mod filesystem;
pub mod manager;
pub mod memory;
pub mod sqlite;

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use filesystem::FileSystemCache;
pub use manager::CacheManager;
pub use memory::InMemoryCache;
pub use sqlite::SqliteCache;

/// Values stored in the cache are opaque structured JSON.
pub type CacheValue = serde_json::Value;

/// Result type for cache construction and maintenance operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors raised while setting up or maintaining a cache backend.
///
/// Per-operation storage failures on the hot path (`get`/`set`) are not
/// surfaced through this type; backends degrade to a miss instead.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// An I/O error occurred while preparing cache storage.
    #[error("cache I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The cache database could not be opened or initialized.
    #[error("cache database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Snapshot of a backend's counters.
///
/// Counters are owned by the backend and internally synchronized; this
/// struct is only ever an immutable copy taken at one point in time.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups that returned a live entry.
    pub hits: u64,
    /// Lookups that found nothing (including expired entries).
    pub misses: u64,
    /// Successful writes.
    pub sets: u64,
    /// Entries removed to make room for new ones.
    pub evictions: u64,
    /// Entries removed because their age exceeded the TTL.
    pub expirations: u64,
    /// Number of entries currently stored.
    #[serde(default)]
    pub size: usize,
}

impl CacheStats {
    /// Fraction of lookups that hit, in `0.0..=1.0`.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }

    /// Fold another snapshot into this one (counter sums; size takes the
    /// maximum since tiers replicate the same keys).
    pub fn absorb(&mut self, other: &CacheStats) {
        self.hits += other.hits;
        self.misses += other.misses;
        self.sets += other.sets;
        self.evictions += other.evictions;
        self.expirations += other.expirations;
        self.size = self.size.max(other.size);
    }
}

/// Uniform contract implemented by every cache backend.
///
/// Implementations are internally synchronized: all methods take `&self`
/// and may be called from any number of threads or tasks concurrently.
/// The scanner shares one provider across its whole worker pool and never
/// wraps it in additional locking.
pub trait CacheProvider: Send + Sync {
    /// Short identity used to namespace statistics (e.g. `"memory"`).
    fn name(&self) -> &'static str;

    /// Look up a value. Expired entries are treated as absent and removed.
    fn get(&self, key: &str) -> Option<CacheValue>;

    /// Store a value under `key`, replacing any previous entry.
    fn set(&self, key: &str, value: CacheValue);

    /// Remove every entry. Statistics counters are preserved.
    fn clear(&self);

    /// Remove specific keys, returning how many were present.
    fn invalidate(&self, keys: &[String]) -> usize;

    /// Bulk-insert known results, e.g. to seed common file types before
    /// first use. Equivalent to calling [`set`](Self::set) per entry.
    fn pre_warm(&self, entries: &HashMap<String, CacheValue>) {
        for (key, value) in entries {
            self.set(key, value.clone());
        }
    }

    /// Snapshot of this backend's counters.
    fn stats(&self) -> CacheStats;
}
