//! SQLite-backed persistent cache tier.
//!
//! Entries and statistics counters both live in the database, so cached
//! results and hit/miss history survive process restarts. A single
//! synchronized connection serializes all access; concurrent scan workers
//! share the provider without any external locking.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection, OptionalExtension};

use super::{CacheError, CacheProvider, CacheResult, CacheStats, CacheValue};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cache (
    key        TEXT PRIMARY KEY,
    value      TEXT NOT NULL,
    created_at REAL NOT NULL
);
CREATE TABLE IF NOT EXISTS cache_stats (
    name  TEXT PRIMARY KEY,
    value INTEGER NOT NULL
);
INSERT OR IGNORE INTO cache_stats (name, value) VALUES
    ('hits', 0), ('misses', 0), ('sets', 0),
    ('evictions', 0), ('expirations', 0);
";

/// Durable cache keyed by string, one row per entry.
///
/// TTL is enforced on read: a row older than the configured TTL is
/// deleted and reported as a miss. A hard database error latches the
/// tier into a degraded always-miss state for the rest of the process
/// rather than failing every subsequent operation.
pub struct SqliteCache {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    ttl: Option<Duration>,
    degraded: AtomicBool,
}

impl std::fmt::Debug for SqliteCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCache")
            .field("db_path", &self.db_path)
            .field("ttl", &self.ttl)
            .field("degraded", &self.degraded.load(Ordering::Relaxed))
            .finish()
    }
}

impl SqliteCache {
    /// Open or create a cache database at `db_path`.
    ///
    /// # Arguments
    ///
    /// * `db_path` - Path to the SQLite database file
    /// * `ttl` - Time-to-live for entries (`None` for no age expiry)
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// database cannot be opened and initialized.
    pub fn new(db_path: &Path, ttl: Option<Duration>) -> CacheResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let conn = Connection::open(db_path)?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: db_path.to_path_buf(),
            ttl,
            degraded: AtomicBool::new(false),
        })
    }

    /// Path of the backing database file.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn degrade(&self, context: &str, err: &rusqlite::Error) {
        log::warn!("sqlite cache {context} failed, tier degraded to always-miss: {err}");
        self.degraded.store(true, Ordering::Relaxed);
    }

    fn is_expired(&self, created_at: f64) -> bool {
        self.ttl
            .is_some_and(|ttl| epoch_secs() - created_at > ttl.as_secs_f64())
    }
}

fn epoch_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}

/// Best-effort counter update; counter drift on I/O failure is acceptable.
fn bump_stat(conn: &Connection, name: &str, delta: u64) {
    if let Err(e) = conn.execute(
        "UPDATE cache_stats SET value = value + ?1 WHERE name = ?2",
        params![delta as i64, name],
    ) {
        log::debug!("failed to update cache stat {name}: {e}");
    }
}

fn read_stat(conn: &Connection, name: &str) -> u64 {
    conn.query_row(
        "SELECT value FROM cache_stats WHERE name = ?1",
        params![name],
        |row| row.get::<_, i64>(0),
    )
    .map(|v| v.max(0) as u64)
    .unwrap_or(0)
}

impl CacheProvider for SqliteCache {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn get(&self, key: &str) -> Option<CacheValue> {
        if self.degraded.load(Ordering::Relaxed) {
            return None;
        }
        let conn = self.lock();

        let row = conn
            .query_row(
                "SELECT value, created_at FROM cache WHERE key = ?1",
                params![key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)),
            )
            .optional();

        match row {
            Ok(Some((raw, created_at))) => {
                if self.is_expired(created_at) {
                    let _ = conn.execute("DELETE FROM cache WHERE key = ?1", params![key]);
                    bump_stat(&conn, "expirations", 1);
                    bump_stat(&conn, "misses", 1);
                    return None;
                }
                match serde_json::from_str(&raw) {
                    Ok(value) => {
                        bump_stat(&conn, "hits", 1);
                        Some(value)
                    }
                    Err(e) => {
                        log::warn!("discarding corrupt cache row for key {key}: {e}");
                        let _ = conn.execute("DELETE FROM cache WHERE key = ?1", params![key]);
                        bump_stat(&conn, "misses", 1);
                        None
                    }
                }
            }
            Ok(None) => {
                bump_stat(&conn, "misses", 1);
                None
            }
            Err(e) => {
                self.degrade("read", &e);
                None
            }
        }
    }

    fn set(&self, key: &str, value: CacheValue) {
        if self.degraded.load(Ordering::Relaxed) {
            return;
        }
        let raw = match serde_json::to_string(&value) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("failed to serialize cache value for key {key}: {e}");
                return;
            }
        };

        let conn = self.lock();
        match conn.execute(
            "INSERT OR REPLACE INTO cache (key, value, created_at) VALUES (?1, ?2, ?3)",
            params![key, raw, epoch_secs()],
        ) {
            Ok(_) => bump_stat(&conn, "sets", 1),
            Err(e) => self.degrade("write", &e),
        }
    }

    fn clear(&self) {
        let conn = self.lock();
        if let Err(e) = conn.execute("DELETE FROM cache", params![]) {
            log::warn!("failed to clear sqlite cache: {e}");
        }
    }

    fn invalidate(&self, keys: &[String]) -> usize {
        let conn = self.lock();
        let mut removed = 0;
        for key in keys {
            match conn.execute("DELETE FROM cache WHERE key = ?1", params![key]) {
                Ok(n) => removed += n,
                Err(e) => log::warn!("failed to invalidate cache key {key}: {e}"),
            }
        }
        removed
    }

    fn pre_warm(&self, entries: &std::collections::HashMap<String, CacheValue>) {
        if entries.is_empty() || self.degraded.load(Ordering::Relaxed) {
            return;
        }
        let mut conn = self.lock();
        let tx = match conn.transaction() {
            Ok(tx) => tx,
            Err(e) => {
                self.degrade("pre-warm", &e);
                return;
            }
        };

        let now = epoch_secs();
        let mut stored = 0u64;
        for (key, value) in entries {
            let Ok(raw) = serde_json::to_string(value) else {
                log::warn!("skipping unserializable pre-warm entry {key}");
                continue;
            };
            match tx.execute(
                "INSERT OR REPLACE INTO cache (key, value, created_at) VALUES (?1, ?2, ?3)",
                params![key, raw, now],
            ) {
                Ok(_) => stored += 1,
                Err(e) => log::warn!("failed to pre-warm cache key {key}: {e}"),
            }
        }
        bump_stat(&tx, "sets", stored);
        if let Err(e) = tx.commit() {
            log::warn!("failed to commit cache pre-warm: {e}");
        }
    }

    fn stats(&self) -> CacheStats {
        let conn = self.lock();
        let size = conn
            .query_row("SELECT COUNT(*) FROM cache", params![], |row| {
                row.get::<_, i64>(0)
            })
            .map(|v| v.max(0) as usize)
            .unwrap_or(0);

        CacheStats {
            hits: read_stat(&conn, "hits"),
            misses: read_stat(&conn, "misses"),
            sets: read_stat(&conn, "sets"),
            evictions: read_stat(&conn, "evictions"),
            expirations: read_stat(&conn, "expirations"),
            size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn open(dir: &TempDir, ttl: Option<Duration>) -> SqliteCache {
        SqliteCache::new(&dir.path().join("cache.db"), ttl).unwrap()
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
        cache.set("k", json!({"file_type": "code"}));
        assert_eq!(cache.get("k"), Some(json!({"file_type": "code"})));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_entries_and_stats_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let cache = open(&dir, None);
            cache.set("persistent", json!("value"));
            assert!(cache.get("persistent").is_some());
        }

        let cache = open(&dir, None);
        assert_eq!(cache.get("persistent"), Some(json!("value")));
        let stats = cache.stats();
        assert_eq!(stats.sets, 1);
        // One hit before the reopen, one after.
        assert_eq!(stats.hits, 2);
    }

    #[test]
    fn test_ttl_expiry_deletes_row() {
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
    fn test_clear_removes_entries_but_keeps_stats() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir, None);
        cache.set("a", json!(1));
        cache.set("b", json!(2));
        cache.clear();
        let stats = cache.stats();
        assert_eq!(stats.size, 0);
        assert_eq!(stats.sets, 2);
    }

    #[test]
    fn test_invalidate_reports_removed_count() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir, None);
        cache.set("a", json!(1));
        let removed = cache.invalidate(&["a".to_string(), "missing".to_string()]);
        assert_eq!(removed, 1);
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn test_pre_warm_bulk_insert() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir, None);
        let mut entries = std::collections::HashMap::new();
        entries.insert("x".to_string(), json!({"language": "python"}));
        entries.insert("y".to_string(), json!({"language": "markdown"}));
        cache.pre_warm(&entries);

        assert_eq!(cache.stats().sets, 2);
        assert!(cache.get("x").is_some());
        assert!(cache.get("y").is_some());
    }

    #[test]
    fn test_corrupt_row_degrades_to_miss() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir, None);
        {
            let conn = cache.lock();
            conn.execute(
                "INSERT INTO cache (key, value, created_at) VALUES ('bad', 'not json', 0.0)",
                params![],
            )
            .unwrap();
        }
        assert!(cache.get("bad").is_none());
        // The corrupt row was removed on access.
        assert_eq!(cache.stats().size, 0);
    }
}
