//! Repository scanner: discovery, filtering, prioritization and the two
//! analysis execution engines.
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`discovery`]: directory traversal with exclusion pruning, plus
//!   filtering and priority ordering
//! - `engine`: synchronous in-order execution
//! - `concurrent`: batched execution with a hard concurrency bound
//!
//! Both engines produce the same result map for the same input; only
//! wall-clock behavior differs.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use repolens::analysis::{FileAnalyzer, MockProvider};
//! use repolens::scanner::{RepositoryScanner, ScanOptions};
//!
//! let analyzer = Arc::new(FileAnalyzer::new(Arc::new(MockProvider::new())));
//! let scanner = RepositoryScanner::new(analyzer, ScanOptions::default());
//! let report = scanner.scan(std::path::Path::new(".")).unwrap();
//! println!("analyzed {} files", report.statistics.analyzed_files);
//! ```

mod concurrent;
pub mod discovery;
mod engine;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::analysis::{FileAnalysis, FileAnalyzer};
use crate::progress::ProgressReporter;

/// Default upper bound on analyzable file size (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Default number of concurrent analyses in the concurrent engine.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Default number of files scheduled per batch.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Default per-file provider timeout in the concurrent engine.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(60);

/// Directory names and file globs excluded by default.
///
/// Entries without wildcards prune whole directory subtrees during
/// discovery and drop files with that exact name; wildcard entries drop
/// matching files during filtering.
pub fn default_exclusions() -> Vec<String> {
    [
        // VCS directories
        ".git", ".svn", ".hg", ".bzr",
        // Dependency and build directories
        "node_modules", "venv", ".venv", "env", ".env", "__pycache__",
        "dist", "build", "target",
        // IDE directories
        ".idea", ".vscode",
        // Binary artifacts
        "*.exe", "*.dll", "*.so", "*.dylib", "*.pyc", "*.pyo",
        "*.obj", "*.o", "*.a", "*.lib", "*.bin", "*.jar", "*.war",
        "*.ear", "*.class", "*.pyd",
        // Images
        "*.jpg", "*.jpeg", "*.png", "*.gif", "*.bmp", "*.tiff",
        "*.webp", "*.ico", "*.svg",
        // Audio/video
        "*.mp3", "*.mp4", "*.avi", "*.mov", "*.mkv", "*.flv", "*.wav",
        // Archives
        "*.zip", "*.tar", "*.gz", "*.bz2", "*.rar", "*.7z",
        // Large document formats
        "*.pdf", "*.doc", "*.docx", "*.xls", "*.xlsx", "*.ppt", "*.pptx",
        // Databases
        "*.db", "*.sqlite", "*.sqlite3",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

/// Glob patterns marking files that should be analyzed first.
pub fn default_priority_patterns() -> Vec<String> {
    [
        // Documentation
        "README*", "*.md", "docs/*",
        // Manifests and configuration
        "*.json", "*.yaml", "*.yml", "*.toml", "*.ini",
        "package.json", "setup.py", "pyproject.toml", "Cargo.toml",
        // Entry points and common source files
        "main.*", "index.*", "app.*",
        "*.py", "*.rs", "*.js", "*.ts", "*.java", "*.c", "*.cpp", "*.h",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

/// Errors that abort a scan before any analysis begins.
///
/// Everything past discovery is captured per file instead of failing the
/// run.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The repository root does not exist.
    #[error("repository path does not exist: {0}")]
    RootNotFound(PathBuf),

    /// The repository root is not a directory.
    #[error("repository path is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The repository root could not be read.
    #[error("failed to read repository root: {source}")]
    RootUnreadable {
        /// The underlying traversal error
        #[source]
        source: walkdir::Error,
    },
}

/// A discovered file queued for analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    /// Absolute path to the file
    pub path: PathBuf,
    /// Whether the file matched a priority pattern
    pub is_priority: bool,
}

/// Aggregate counters for one scan run.
///
/// A fresh instance is produced per run and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanStatistics {
    /// Files discovered before filtering
    pub total_files: usize,
    /// Files actually analyzed (including error results)
    pub analyzed_files: usize,
    /// Files dropped by filtering (size, pattern or unreadable metadata)
    pub excluded_files: usize,
    /// Analyzed files whose result carries an error marker
    pub error_files: usize,
    /// Wall-clock duration of the run in seconds
    pub processing_time: f64,
    /// Language name -> count over successful results
    pub languages: BTreeMap<String, usize>,
    /// File type -> count over successful results
    pub file_types: BTreeMap<String, usize>,
    /// Whether the run was cut short by the cancellation flag
    pub interrupted: bool,
}

/// Output of a scan: per-file results keyed by root-relative path, plus
/// run statistics.
#[derive(Debug, Serialize)]
pub struct ScanReport {
    /// Canonical repository root that was scanned
    pub repository: String,
    /// Analysis results keyed by relative, forward-slash separated path
    pub analysis_results: BTreeMap<String, FileAnalysis>,
    /// Aggregate counters for the run
    pub statistics: ScanStatistics,
}

/// Tuning knobs for a scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Exclusion patterns; see [`default_exclusions`] for semantics.
    pub exclusions: Vec<String>,
    /// Files larger than this many bytes are skipped.
    pub max_file_size: u64,
    /// Hard bound on concurrent analyses (concurrent engine only).
    pub concurrency: usize,
    /// Files scheduled per wave in the concurrent engine.
    pub batch_size: usize,
    /// Globs marking files to analyze first.
    pub priority_patterns: Vec<String>,
    /// Per-file provider timeout (concurrent engine only).
    pub provider_timeout: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            exclusions: default_exclusions(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            batch_size: DEFAULT_BATCH_SIZE,
            priority_patterns: default_priority_patterns(),
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }
}

impl ScanOptions {
    /// Append additional exclusion patterns to the defaults.
    #[must_use]
    pub fn extend_exclusions(mut self, extra: impl IntoIterator<Item = String>) -> Self {
        self.exclusions.extend(extra);
        self
    }

    /// Replace the priority patterns.
    #[must_use]
    pub fn with_priority_patterns(mut self, patterns: Vec<String>) -> Self {
        self.priority_patterns = patterns;
        self
    }

    /// Set the maximum analyzable file size in bytes.
    #[must_use]
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Set the concurrency bound (clamped to at least 1).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Set the batch size (clamped to at least 1).
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the per-file provider timeout for the concurrent engine.
    #[must_use]
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }
}

/// Scanner that traverses a repository and drives file analysis.
pub struct RepositoryScanner {
    pub(crate) analyzer: Arc<FileAnalyzer>,
    pub(crate) options: ScanOptions,
    pub(crate) progress: Option<Arc<dyn ProgressReporter>>,
    pub(crate) cancel: Arc<AtomicBool>,
}

impl std::fmt::Debug for RepositoryScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryScanner")
            .field("options", &self.options)
            .field("has_progress", &self.progress.is_some())
            .finish()
    }
}

impl RepositoryScanner {
    /// Create a scanner around a shared analyzer.
    #[must_use]
    pub fn new(analyzer: Arc<FileAnalyzer>, options: ScanOptions) -> Self {
        Self {
            analyzer,
            options,
            progress: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Attach a progress reporter invoked once per analyzed file.
    #[must_use]
    pub fn with_progress(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress = Some(reporter);
        self
    }

    /// Use an externally owned cancellation flag.
    ///
    /// When the flag becomes `true` the scan stops between files
    /// (synchronous engine) or at the next batch boundary (concurrent
    /// engine).
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Scan `root` synchronously on the calling thread.
    ///
    /// # Errors
    ///
    /// Fails only when the root cannot be discovered; per-file problems
    /// are recorded in the report instead.
    pub fn scan(&self, root: &Path) -> Result<ScanReport, ScanError> {
        let started = Instant::now();
        let (root, total_files, targets) = self.prepare(root)?;
        let excluded_files = total_files - targets.len();

        let (results, interrupted) = engine::analyze_sequential(self, &root, &targets);

        Ok(self.assemble_report(&root, total_files, excluded_files, results, interrupted, started))
    }

    /// Scan `root` with the batched, concurrency-bounded engine.
    ///
    /// Produces the same result set as [`scan`](Self::scan) for the same
    /// input.
    ///
    /// # Errors
    ///
    /// Fails only when the root cannot be discovered.
    pub async fn scan_async(&self, root: &Path) -> Result<ScanReport, ScanError> {
        let started = Instant::now();
        let (root, total_files, targets) = self.prepare(root)?;
        let excluded_files = total_files - targets.len();

        let (results, interrupted) = concurrent::analyze_concurrent(self, &root, targets).await;

        Ok(self.assemble_report(&root, total_files, excluded_files, results, interrupted, started))
    }

    /// Discovery and filtering shared by both engines.
    fn prepare(&self, root: &Path) -> Result<(PathBuf, usize, Vec<ScanTarget>), ScanError> {
        let root = root
            .canonicalize()
            .map_err(|_| ScanError::RootNotFound(root.to_path_buf()))?;
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root));
        }

        log::info!("starting repository scan at {}", root.display());

        let discovered = discovery::discover_files(&root, &self.options.exclusions)?;
        let total_files = discovered.len();
        log::info!("found {total_files} files in repository");

        let targets = discovery::filter_and_prioritize(discovered, &root, &self.options);
        log::info!("{} files selected for analysis", targets.len());

        Ok((root, total_files, targets))
    }

    fn assemble_report(
        &self,
        root: &Path,
        total_files: usize,
        excluded_files: usize,
        results: BTreeMap<String, FileAnalysis>,
        interrupted: bool,
        started: Instant,
    ) -> ScanReport {
        let mut statistics = ScanStatistics {
            total_files,
            analyzed_files: results.len(),
            excluded_files,
            interrupted,
            processing_time: started.elapsed().as_secs_f64(),
            ..Default::default()
        };

        for result in results.values() {
            if result.is_error() {
                statistics.error_files += 1;
            } else {
                *statistics.languages.entry(result.language.clone()).or_default() += 1;
                *statistics
                    .file_types
                    .entry(result.file_type.clone())
                    .or_default() += 1;
            }
        }

        log::info!(
            "repository scan completed in {:.2}s: {} analyzed, {} excluded, {} errors",
            statistics.processing_time,
            statistics.analyzed_files,
            statistics.excluded_files,
            statistics.error_files
        );

        ScanReport {
            repository: root.display().to_string(),
            analysis_results: results,
            statistics,
        }
    }
}

/// Result key for a file: path relative to the scan root with forward
/// slashes, identical across platforms and engines.
pub(crate) fn relative_key(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
