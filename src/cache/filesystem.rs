//! File-per-entry cache tier under a dedicated directory.
//!
//! Each entry is a small JSON document holding the original key, the
//! cached value and a creation timestamp. Keys are hashed into hex
//! filenames so arbitrary key strings stay filesystem-safe. Aggregate
//! counters persist in a `cache_stats.json` sidecar across restarts.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::{CacheError, CacheProvider, CacheResult, CacheStats, CacheValue};

const STATS_FILE: &str = "cache_stats.json";

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct PersistedStats {
    hits: u64,
    misses: u64,
    sets: u64,
    evictions: u64,
    expirations: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct DiskEntry {
    key: String,
    value: CacheValue,
    created_at: f64,
}

/// Cache storing one file per key, useful for large values that should
/// not stay resident in memory.
#[derive(Debug)]
pub struct FileSystemCache {
    cache_dir: PathBuf,
    ttl: Option<Duration>,
    stats: Mutex<PersistedStats>,
}

impl FileSystemCache {
    /// Open or create a cache directory.
    ///
    /// # Arguments
    ///
    /// * `cache_dir` - Directory to store entry files in
    /// * `ttl` - Time-to-live for entries (`None` for no age expiry)
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(cache_dir: &Path, ttl: Option<Duration>) -> CacheResult<Self> {
        fs::create_dir_all(cache_dir).map_err(|source| CacheError::Io {
            path: cache_dir.to_path_buf(),
            source,
        })?;

        let cache = Self {
            cache_dir: cache_dir.to_path_buf(),
            ttl,
            stats: Mutex::new(PersistedStats::default()),
        };
        *cache.lock_stats() = cache.load_stats();
        Ok(cache)
    }

    /// Directory holding the entry files.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = blake3::hash(key.as_bytes()).to_hex();
        self.cache_dir.join(format!("{digest}.json"))
    }

    fn stats_path(&self) -> PathBuf {
        self.cache_dir.join(STATS_FILE)
    }

    fn lock_stats(&self) -> MutexGuard<'_, PersistedStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load_stats(&self) -> PersistedStats {
        let path = self.stats_path();
        if !path.exists() {
            return PersistedStats::default();
        }
        match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("resetting unreadable cache stats file {}: {e}", path.display());
                PersistedStats::default()
            }),
            Err(e) => {
                log::warn!("failed to load cache stats from {}: {e}", path.display());
                PersistedStats::default()
            }
        }
    }

    /// Mutate counters and flush them to disk in one step.
    fn update_stats(&self, update: impl FnOnce(&mut PersistedStats)) {
        let mut stats = self.lock_stats();
        update(&mut stats);
        match serde_json::to_string(&*stats) {
            Ok(raw) => {
                if let Err(e) = fs::write(self.stats_path(), raw) {
                    log::debug!("failed to persist cache stats: {e}");
                }
            }
            Err(e) => log::debug!("failed to serialize cache stats: {e}"),
        }
    }

    fn is_expired(&self, created_at: f64) -> bool {
        self.ttl
            .is_some_and(|ttl| epoch_secs() - created_at > ttl.as_secs_f64())
    }

    fn entry_files(&self) -> Vec<PathBuf> {
        let Ok(read_dir) = fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };
        read_dir
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.file_name().is_some_and(|n| n != STATS_FILE))
            .collect()
    }
}

fn epoch_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}

impl CacheProvider for FileSystemCache {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    fn get(&self, key: &str) -> Option<CacheValue> {
        let path = self.entry_path(key);
        if !path.exists() {
            self.update_stats(|s| s.misses += 1);
            return None;
        }

        let entry: DiskEntry = match fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|raw| serde_json::from_str(&raw).map_err(|e| e.to_string()))
        {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("discarding unreadable cache file {}: {e}", path.display());
                let _ = fs::remove_file(&path);
                self.update_stats(|s| s.misses += 1);
                return None;
            }
        };

        if self.is_expired(entry.created_at) {
            let _ = fs::remove_file(&path);
            self.update_stats(|s| {
                s.expirations += 1;
                s.misses += 1;
            });
            return None;
        }

        self.update_stats(|s| s.hits += 1);
        Some(entry.value)
    }

    fn set(&self, key: &str, value: CacheValue) {
        let entry = DiskEntry {
            key: key.to_string(),
            value,
            created_at: epoch_secs(),
        };
        let path = self.entry_path(key);
        match serde_json::to_string(&entry) {
            Ok(raw) => {
                if let Err(e) = fs::write(&path, raw) {
                    log::warn!("failed to write cache file {}: {e}", path.display());
                    return;
                }
                self.update_stats(|s| s.sets += 1);
            }
            Err(e) => log::warn!("failed to serialize cache entry for key {key}: {e}"),
        }
    }

    fn clear(&self) {
        for path in self.entry_files() {
            if let Err(e) = fs::remove_file(&path) {
                log::warn!("failed to delete cache file {}: {e}", path.display());
            }
        }
    }

    fn invalidate(&self, keys: &[String]) -> usize {
        keys.iter()
            .filter(|key| {
                let path = self.entry_path(key);
                path.exists() && fs::remove_file(&path).is_ok()
            })
            .count()
    }

    fn stats(&self) -> CacheStats {
        let persisted = self.lock_stats().clone();
        CacheStats {
            hits: persisted.hits,
            misses: persisted.misses,
            sets: persisted.sets,
            evictions: persisted.evictions,
            expirations: persisted.expirations,
            size: self.entry_files().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn open(dir: &TempDir, ttl: Option<Duration>) -> FileSystemCache {
        FileSystemCache::new(dir.path(), ttl).unwrap()
    }

    #[test]
    fn test_absent_key_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir, None);
        assert!(cache.get("nope").is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_set_then_get_round_trip() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir, None);
        cache.set("some key / with strange * chars", json!({"ok": true}));
        assert_eq!(
            cache.get("some key / with strange * chars"),
            Some(json!({"ok": true}))
        );
        assert_eq!(cache.stats().size, 1);
    }

    #[test]
    fn test_ttl_expiry_removes_entry_file() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir, Some(Duration::from_millis(20)));
        cache.set("k", json!("v"));
        std::thread::sleep(Duration::from_millis(40));

        assert!(cache.get("k").is_none());
        let stats = cache.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.size, 0);
    }

    #[test]
    fn test_clear_preserves_directory_and_stats_file() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir, None);
        cache.set("a", json!(1));
        cache.set("b", json!(2));
        cache.clear();

        assert_eq!(cache.stats().size, 0);
        assert!(dir.path().exists());
        assert!(dir.path().join(STATS_FILE).exists());
        // Counters survive the clear.
        assert_eq!(cache.stats().sets, 2);
    }

    #[test]
    fn test_stats_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let cache = open(&dir, None);
            cache.set("k", json!("v"));
            assert!(cache.get("k").is_some());
        }

        let cache = open(&dir, None);
        let stats = cache.stats();
        assert_eq!(stats.sets, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(cache.get("k"), Some(json!("v")));
    }

    #[test]
    fn test_corrupt_entry_file_degrades_to_miss() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir, None);
        cache.set("k", json!("v"));
        fs::write(cache.entry_path("k"), "not json").unwrap();

        assert!(cache.get("k").is_none());
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_invalidate_removes_files() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir, None);
        cache.set("a", json!(1));
        let removed = cache.invalidate(&["a".to_string(), "missing".to_string()]);
        assert_eq!(removed, 1);
        assert!(cache.get("a").is_none());
    }
}
