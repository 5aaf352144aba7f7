//! Cache configuration and warm-up data.
//!
//! All cache defaults live in an explicit [`CacheSettings`] struct built
//! either programmatically or from CLI flags; there is no process-wide
//! state. Platform-specific default locations come from the
//! `directories` crate.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use serde_json::json;

use crate::cache::{
    CacheManager, CacheProvider, CacheResult, CacheValue, FileSystemCache, InMemoryCache,
    SqliteCache,
};
use crate::cli::{CacheConfigArgs, CacheTypeArg};

/// Default time-to-live for cache entries (24 hours).
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default maximum entries for the in-memory tier.
pub const DEFAULT_MAX_SIZE: usize = 1000;

/// Platform cache directory for repolens (e.g. `~/.cache/repolens`).
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    ProjectDirs::from("com", "repolens", "repolens")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".repolens").join("cache"))
}

/// Fully resolved cache configuration.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Backend to build.
    pub kind: CacheTypeArg,
    /// Entry time-to-live; `None` disables age expiry.
    pub ttl: Option<Duration>,
    /// Entry bound for the in-memory tier.
    pub max_size: usize,
    /// Directory for the filesystem tier.
    pub cache_dir: PathBuf,
    /// Database file for the SQLite tier.
    pub db_path: PathBuf,
    /// Tier order used when `kind` is [`CacheTypeArg::Tiered`],
    /// fastest first.
    pub tiers: Vec<CacheTypeArg>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let cache_dir = default_cache_dir();
        let db_path = cache_dir.join("cache.db");
        Self {
            kind: CacheTypeArg::Tiered,
            ttl: Some(DEFAULT_TTL),
            max_size: DEFAULT_MAX_SIZE,
            cache_dir,
            db_path,
            tiers: vec![CacheTypeArg::Memory, CacheTypeArg::Sqlite],
        }
    }
}

impl CacheSettings {
    /// Resolve CLI cache flags against the defaults.
    #[must_use]
    pub fn from_args(args: &CacheConfigArgs) -> Self {
        let defaults = Self::default();
        let cache_dir = args.cache_dir.clone().unwrap_or(defaults.cache_dir);
        let db_path = args
            .db_path
            .clone()
            .unwrap_or_else(|| cache_dir.join("cache.db"));

        Self {
            kind: args.cache_type,
            ttl: args.ttl.map(Duration::from_secs).or(defaults.ttl),
            max_size: args.max_cache_size.unwrap_or(defaults.max_size),
            cache_dir,
            db_path,
            tiers: defaults.tiers,
        }
    }
}

/// Build the configured cache as a tiered manager.
///
/// Single-backend configurations come back as a manager with one tier,
/// so callers always get per-tier statistics through the same type.
///
/// # Errors
///
/// Returns an error when a persistent tier's storage cannot be
/// initialized.
pub fn build_manager(settings: &CacheSettings) -> CacheResult<CacheManager> {
    let kinds: Vec<CacheTypeArg> = match settings.kind {
        CacheTypeArg::Tiered => settings.tiers.clone(),
        kind => vec![kind],
    };

    let mut tiers: Vec<Arc<dyn CacheProvider>> = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let tier: Arc<dyn CacheProvider> = match kind {
            CacheTypeArg::Memory => {
                Arc::new(InMemoryCache::new(Some(settings.max_size), settings.ttl))
            }
            CacheTypeArg::Sqlite => Arc::new(SqliteCache::new(&settings.db_path, settings.ttl)?),
            CacheTypeArg::Filesystem => {
                Arc::new(FileSystemCache::new(&settings.cache_dir, settings.ttl)?)
            }
            CacheTypeArg::Tiered => {
                // Nested tiered configurations are flattened away.
                continue;
            }
        };
        tiers.push(tier);
    }

    Ok(CacheManager::new(tiers))
}

/// Warm-up results for common file types, keyed by symbolic names.
///
/// Seeding these into a fresh cache gives maintenance commands and
/// statistics something meaningful to show before the first real scan.
#[must_use]
pub fn default_warmup() -> HashMap<String, CacheValue> {
    let mut entries = HashMap::new();
    entries.insert(
        "python_script".to_string(),
        json!({
            "file_type": "code",
            "language": "python",
            "purpose": "script",
            "characteristics": ["executable", "imports", "procedural"],
            "confidence": 0.95
        }),
    );
    entries.insert(
        "rust_module".to_string(),
        json!({
            "file_type": "code",
            "language": "rust",
            "purpose": "module",
            "characteristics": ["functions", "modules", "types"],
            "confidence": 0.95
        }),
    );
    entries.insert(
        "markdown_doc".to_string(),
        json!({
            "file_type": "documentation",
            "language": "markdown",
            "purpose": "documentation",
            "characteristics": ["formatted text", "headings", "lists"],
            "confidence": 0.95
        }),
    );
    entries.insert(
        "json_config".to_string(),
        json!({
            "file_type": "configuration",
            "language": "json",
            "purpose": "settings",
            "characteristics": ["structured data", "key-value pairs"],
            "confidence": 0.95
        }),
    );
    entries.insert(
        "text_file".to_string(),
        json!({
            "file_type": "text",
            "language": "plaintext",
            "purpose": "documentation",
            "characteristics": ["unformatted text"],
            "confidence": 0.90
        }),
    );
    entries.insert(
        "javascript_module".to_string(),
        json!({
            "file_type": "code",
            "language": "javascript",
            "purpose": "module",
            "characteristics": ["imports", "exports", "functions"],
            "confidence": 0.95
        }),
    );
    entries
}
