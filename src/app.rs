//! Application logic behind the repolens CLI.
//!
//! [`run_app`] wires CLI arguments into the library: cache construction,
//! analyzer setup, scan execution and report output.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::analysis::{FileAnalyzer, MockProvider};
use crate::cache::{CacheProvider, CacheValue};
use crate::cli::{CacheArgs, Cli, Commands, ScanArgs};
use crate::config::{self, CacheSettings};
use crate::error::ExitCode;
use crate::logging;
use crate::progress::ScanProgressBar;
use crate::scanner::{RepositoryScanner, ScanOptions, ScanReport};

/// Run the application and return the exit code to report.
///
/// # Errors
///
/// Returns an error for failures that abort the run entirely, such as an
/// unreadable repository root or unusable cache configuration.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Scan(args) => run_scan(args, cli.quiet),
        Commands::Cache(args) => run_cache(args),
    }
}

/// Shared cancellation flag flipped by Ctrl+C.
fn install_ctrlc_handler() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    if let Err(e) = ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    }) {
        log::warn!("could not install Ctrl+C handler: {e}");
    }
    flag
}

fn build_cache(args: &ScanArgs) -> Option<Arc<dyn CacheProvider>> {
    if args.no_cache {
        return None;
    }
    let settings = CacheSettings::from_args(&args.cache);
    match config::build_manager(&settings) {
        Ok(manager) => {
            let manager: Arc<dyn CacheProvider> = Arc::new(manager);
            let warmup = config::default_warmup();
            manager.pre_warm(&warmup);
            log::debug!("pre-warmed cache with {} entries", warmup.len());
            Some(manager)
        }
        Err(e) => {
            // A broken cache only costs speed; the scan proceeds without it.
            log::warn!("caching disabled: {e}");
            None
        }
    }
}

fn run_scan(args: ScanArgs, quiet: bool) -> Result<ExitCode> {
    let cancel = install_ctrlc_handler();

    let mut analyzer = FileAnalyzer::new(Arc::new(MockProvider::new()));
    if let Some(cache) = build_cache(&args) {
        analyzer = analyzer.with_cache(cache);
    }

    let mut options = ScanOptions::default()
        .extend_exclusions(args.exclusions)
        .with_max_file_size(args.max_file_size)
        .with_concurrency(args.concurrency)
        .with_batch_size(args.batch_size)
        .with_provider_timeout(Duration::from_secs(args.timeout.max(1)));
    if !args.priority_patterns.is_empty() {
        options = options.with_priority_patterns(args.priority_patterns);
    }

    let mut scanner =
        RepositoryScanner::new(Arc::new(analyzer), options).with_cancel_flag(cancel);
    if !args.no_progress && !quiet {
        scanner = scanner.with_progress(Arc::new(ScanProgressBar::new()));
    }

    let report = if args.use_async {
        log::info!("using concurrent analysis engine");
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        runtime.block_on(scanner.scan_async(&args.path))?
    } else {
        scanner.scan(&args.path)?
    };

    write_report(&report, args.output.as_deref())?;
    if !quiet {
        print_summary(&report);
    }

    Ok(if report.statistics.interrupted {
        ExitCode::Interrupted
    } else if report.statistics.error_files > 0 {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    })
}

fn write_report(report: &ScanReport, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("failed to serialize scan report")?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create output directory {}", parent.display())
                    })?;
                }
            }
            fs::write(path, json)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            log::info!("results written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn print_summary(report: &ScanReport) {
    let stats = &report.statistics;
    eprintln!();
    eprintln!("Summary:");
    eprintln!("- Files found: {}", stats.total_files);
    eprintln!("- Files analyzed: {}", stats.analyzed_files);
    eprintln!("- Files excluded: {}", stats.excluded_files);
    eprintln!("- Files with errors: {}", stats.error_files);
    eprintln!("- Processing time: {:.2} seconds", stats.processing_time);
    if stats.interrupted {
        eprintln!("- Scan was interrupted before completion");
    }

    print_breakdown("Language breakdown", &stats.languages);
    print_breakdown("File type breakdown", &stats.file_types);
}

fn print_breakdown(title: &str, counts: &std::collections::BTreeMap<String, usize>) {
    if counts.is_empty() {
        return;
    }
    let mut sorted: Vec<_> = counts.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    eprintln!();
    eprintln!("{title}:");
    for (name, count) in sorted {
        eprintln!("- {name}: {count} files");
    }
}

fn run_cache(args: CacheArgs) -> Result<ExitCode> {
    if !args.stats && !args.clear && !args.pre_warm {
        bail!("no action specified; use --stats, --clear or --pre-warm");
    }

    let settings = CacheSettings::from_args(&args.config);
    let manager = config::build_manager(&settings)?;

    if args.clear {
        manager.clear();
        println!("cache cleared");
    }

    if args.pre_warm {
        let mut entries = config::default_warmup();
        if let Some(path) = &args.warmup_file {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read warm-up file {}", path.display()))?;
            let custom: HashMap<String, CacheValue> = serde_json::from_str(&raw)
                .with_context(|| format!("invalid warm-up file {}", path.display()))?;
            entries.extend(custom);
        }
        manager.pre_warm(&entries);
        println!("cache pre-warmed with {} entries", entries.len());
    }

    if args.stats {
        for (tier, stats) in manager.tier_stats() {
            println!("{tier}:");
            println!("  hits: {}", stats.hits);
            println!("  misses: {}", stats.misses);
            println!("  sets: {}", stats.sets);
            println!("  evictions: {}", stats.evictions);
            println!("  expirations: {}", stats.expirations);
            println!("  size: {}", stats.size);
        }
        let aggregate = manager.stats();
        let lookups = aggregate.hits + aggregate.misses;
        println!(
            "overall hit rate: {:.1}% ({}/{lookups})",
            aggregate.hit_rate() * 100.0,
            aggregate.hits
        );
    }

    Ok(ExitCode::Success)
}
