//! Cache-aware per-file analysis.
//!
//! [`FileAnalyzer`] implements the single-file pipeline both scan engines
//! share: fingerprint the content, consult the cache, fall through to the
//! provider on a miss, and store successful results back. Every failure
//! mode is folded into a [`FileAnalysis`] with an error marker so one bad
//! file never aborts a scan.

use std::path::Path;
use std::sync::Arc;

use crate::cache::CacheProvider;

use super::fingerprint::fingerprint;
use super::{AnalysisProvider, FileAnalysis};

/// Characters of content handed to the provider per file.
///
/// Interpretation backends typically bill or scale by input size; the
/// fingerprint still covers the full file so truncation never causes a
/// stale cache hit.
pub const DEFAULT_CONTENT_BUDGET: usize = 4000;

/// Analyzes files through a provider, with results cached by content
/// fingerprint.
pub struct FileAnalyzer {
    provider: Arc<dyn AnalysisProvider>,
    cache: Option<Arc<dyn CacheProvider>>,
    content_budget: usize,
}

impl std::fmt::Debug for FileAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileAnalyzer")
            .field("cached", &self.cache.is_some())
            .field("content_budget", &self.content_budget)
            .finish()
    }
}

impl FileAnalyzer {
    /// Create an analyzer without caching.
    #[must_use]
    pub fn new(provider: Arc<dyn AnalysisProvider>) -> Self {
        Self {
            provider,
            cache: None,
            content_budget: DEFAULT_CONTENT_BUDGET,
        }
    }

    /// Attach a result cache (typically a [`crate::cache::CacheManager`]).
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn CacheProvider>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Override how many characters of content the provider receives.
    #[must_use]
    pub fn with_content_budget(mut self, chars: usize) -> Self {
        self.content_budget = chars;
        self
    }

    /// Snapshot of the attached cache's statistics, if caching is enabled.
    #[must_use]
    pub fn cache_stats(&self) -> Option<crate::cache::CacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }

    /// Analyze a single file.
    ///
    /// Never fails: read errors and provider errors are returned as a
    /// result with the `error` field set.
    pub fn analyze_file(&self, path: &Path) -> FileAnalysis {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("failed to read {}: {e}", path.display());
                return FileAnalysis::failed(format!("failed to read {}: {e}", path.display()));
            }
        };

        let key = fingerprint(&bytes);

        if let Some(cache) = &self.cache {
            if let Some(value) = cache.get(&key) {
                match serde_json::from_value::<FileAnalysis>(value) {
                    Ok(hit) => {
                        log::debug!("cache hit for {}", path.display());
                        return hit;
                    }
                    Err(e) => {
                        log::warn!("ignoring malformed cache entry for {}: {e}", path.display());
                    }
                }
            }
        }

        let content = truncate_chars(String::from_utf8_lossy(&bytes), self.content_budget);

        match self.provider.analyze(path, &content) {
            Ok(result) => {
                if !result.is_error() {
                    if let Some(cache) = &self.cache {
                        match serde_json::to_value(&result) {
                            Ok(value) => {
                                cache.set(&key, value);
                                log::debug!("stored analysis for {}", path.display());
                            }
                            Err(e) => log::warn!(
                                "could not serialize result for {}: {e}",
                                path.display()
                            ),
                        }
                    }
                }
                result
            }
            Err(e) => {
                log::warn!("analysis failed for {}: {e}", path.display());
                FileAnalysis::failed(e.to_string())
            }
        }
    }
}

fn truncate_chars(content: std::borrow::Cow<'_, str>, budget: usize) -> String {
    match content.char_indices().nth(budget) {
        Some((byte_idx, _)) => content[..byte_idx].to_string(),
        None => content.into_owned(),
    }
}
