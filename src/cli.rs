//! Command-line interface definitions for repolens.
//!
//! All arguments, subcommands and options use the clap derive API, with
//! global options (verbosity, error formatting) and subcommands for
//! scanning and cache maintenance.
//!
//! # Example
//!
//! ```bash
//! # Scan a repository and print the JSON report
//! repolens scan ~/projects/service
//!
//! # Concurrent scan with custom limits
//! repolens scan ~/projects/service --async --concurrency 8 --batch-size 20
//!
//! # Cache maintenance
//! repolens cache --stats
//! repolens cache --clear --cache-type sqlite
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Repository file analyzer with tiered result caching.
///
/// repolens discovers the files of a repository, analyzes them through a
/// pluggable backend and caches results across runs in memory, SQLite
/// and/or the filesystem.
#[derive(Debug, Parser)]
#[command(name = "repolens")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Emit errors as structured JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for repolens.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a repository and analyze its files
    Scan(ScanArgs),
    /// Inspect or maintain the result cache
    Cache(CacheArgs),
}

/// Cache backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CacheTypeArg {
    /// In-process LRU cache, fast but not persistent
    Memory,
    /// SQLite database, persistent across runs
    Sqlite,
    /// One file per entry under a cache directory
    Filesystem,
    /// Memory in front of SQLite (read-through with promotion)
    #[default]
    Tiered,
}

/// Cache configuration shared by the scan and cache subcommands.
#[derive(Debug, Clone, Args)]
pub struct CacheConfigArgs {
    /// Cache backend to use
    #[arg(long = "cache-type", value_enum, default_value = "tiered")]
    pub cache_type: CacheTypeArg,

    /// Time-to-live for cache entries in seconds (default: 24 hours)
    #[arg(long, value_name = "SECS")]
    pub ttl: Option<u64>,

    /// Maximum entries held by the in-memory tier
    #[arg(long = "max-cache-size", value_name = "N")]
    pub max_cache_size: Option<usize>,

    /// Directory for the filesystem cache tier
    ///
    /// If not specified, a platform-specific cache directory is used.
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Path to the SQLite cache database
    #[arg(long, value_name = "FILE")]
    pub db_path: Option<PathBuf>,
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Repository root to scan
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Use the concurrent analysis engine
    #[arg(long = "async")]
    pub use_async: bool,

    /// Additional exclusion patterns (can be specified multiple times)
    ///
    /// Names without wildcards prune whole directories; glob patterns
    /// drop matching files.
    #[arg(short, long = "exclude", value_name = "PATTERN")]
    pub exclusions: Vec<String>,

    /// Priority glob patterns, replacing the built-in set
    #[arg(long = "priority", value_name = "PATTERN")]
    pub priority_patterns: Vec<String>,

    /// Maximum file size to analyze (e.g. 1MB, 512KiB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size, default_value = "10MiB")]
    pub max_file_size: u64,

    /// Maximum number of concurrent analyses (with --async)
    #[arg(long, value_name = "N", default_value_t = 5)]
    pub concurrency: usize,

    /// Number of files scheduled per batch (with --async)
    #[arg(long, value_name = "N", default_value_t = 10)]
    pub batch_size: usize,

    /// Per-file analysis timeout in seconds (with --async)
    #[arg(long, value_name = "SECS", default_value_t = 60)]
    pub timeout: u64,

    /// Write the JSON report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Disable result caching entirely
    #[arg(long)]
    pub no_cache: bool,

    /// Cache configuration
    #[command(flatten)]
    pub cache: CacheConfigArgs,
}

/// Arguments for the cache subcommand.
#[derive(Debug, Args)]
pub struct CacheArgs {
    /// Show cache statistics per tier
    #[arg(long)]
    pub stats: bool,

    /// Remove every cached entry
    #[arg(long)]
    pub clear: bool,

    /// Seed the cache with results for common file types
    #[arg(long = "pre-warm")]
    pub pre_warm: bool,

    /// JSON file with additional warm-up entries (key -> result object)
    #[arg(long, value_name = "FILE", requires = "pre_warm")]
    pub warmup_file: Option<PathBuf>,

    /// Cache configuration
    #[command(flatten)]
    pub config: CacheConfigArgs,
}

/// Parse a human-readable size string into bytes.
///
/// # Example
///
/// ```
/// use repolens::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1_000);
/// assert_eq!(parse_size("1MiB").unwrap(), 1_048_576);
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, the number is invalid or
/// negative, or the suffix is unknown.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("size cannot be empty".to_string());
    }

    let split = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (number, suffix) = s.split_at(split);
    let suffix = suffix.trim().to_uppercase();

    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid number: '{number}'"))?;
    if value < 0.0 {
        return Err("size cannot be negative".to_string());
    }

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        _ => return Err(format!("unknown size suffix: '{suffix}'")),
    };

    Ok((value * multiplier as f64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_plain_bytes() {
        assert_eq!(parse_size("0").unwrap(), 0);
        assert_eq!(parse_size("4096").unwrap(), 4096);
        assert_eq!(parse_size("4096B").unwrap(), 4096);
    }

    #[test]
    fn test_parse_size_decimal_and_binary_suffixes() {
        assert_eq!(parse_size("1KB").unwrap(), 1_000);
        assert_eq!(parse_size("1KiB").unwrap(), 1_024);
        assert_eq!(parse_size("10MB").unwrap(), 10_000_000);
        assert_eq!(parse_size("1MiB").unwrap(), 1_048_576);
        assert_eq!(parse_size("1GiB").unwrap(), 1_073_741_824);
    }

    #[test]
    fn test_parse_size_fractional_and_case_insensitive() {
        assert_eq!(parse_size("1.5MB").unwrap(), 1_500_000);
        assert_eq!(parse_size("1kib").unwrap(), 1_024);
        assert_eq!(parse_size(" 2 KB ").unwrap(), 2_000);
    }

    #[test]
    fn test_parse_size_rejects_garbage() {
        assert!(parse_size("").is_err());
        assert!(parse_size("abc").is_err());
        assert!(parse_size("10XB").is_err());
    }

    #[test]
    fn test_cli_parses_scan_command() {
        let cli = Cli::try_parse_from([
            "repolens",
            "scan",
            "/tmp/repo",
            "--async",
            "--concurrency",
            "8",
            "--exclude",
            "*.generated",
            "--max-file-size",
            "1MB",
        ])
        .unwrap();

        let Commands::Scan(args) = cli.command else {
            panic!("expected scan command");
        };
        assert_eq!(args.path, PathBuf::from("/tmp/repo"));
        assert!(args.use_async);
        assert_eq!(args.concurrency, 8);
        assert_eq!(args.exclusions, vec!["*.generated".to_string()]);
        assert_eq!(args.max_file_size, 1_000_000);
    }

    #[test]
    fn test_cli_parses_cache_command() {
        let cli = Cli::try_parse_from([
            "repolens",
            "cache",
            "--stats",
            "--cache-type",
            "sqlite",
            "--ttl",
            "3600",
        ])
        .unwrap();

        let Commands::Cache(args) = cli.command else {
            panic!("expected cache command");
        };
        assert!(args.stats);
        assert_eq!(args.config.cache_type, CacheTypeArg::Sqlite);
        assert_eq!(args.config.ttl, Some(3600));
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["repolens", "-q", "-v", "scan", "/tmp"]);
        assert!(result.is_err());
    }
}
