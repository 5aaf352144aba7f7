//! Batched analysis engine with a hard concurrency bound.
//!
//! Targets are processed in waves of `batch_size`; inside a wave at most
//! `concurrency` analyses run at once, enforced by a semaphore rather
//! than best effort. Per-file work is blocking (file I/O, cache tiers,
//! provider call) and runs on the blocking thread pool.
//!
//! Completion order within a batch is unspecified, so the progress
//! counter and its callback are updated together under one lock; the
//! reported sequence is strictly increasing and gap-free regardless of
//! which file finishes first.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::analysis::FileAnalysis;

use super::{relative_key, RepositoryScanner, ScanTarget};

/// Run targets through the analyzer with bounded concurrency.
///
/// Returns the result map and whether the run stopped at a batch
/// boundary due to cancellation. The result set is identical to the
/// synchronous engine's for the same input.
pub(crate) async fn analyze_concurrent(
    scanner: &RepositoryScanner,
    root: &Path,
    targets: Vec<ScanTarget>,
) -> (BTreeMap<String, FileAnalysis>, bool) {
    let total = targets.len();
    let batch_size = scanner.options.batch_size.max(1);
    let concurrency = scanner.options.concurrency.max(1);

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let progress_counter = Arc::new(Mutex::new(0usize));
    let mut results = BTreeMap::new();
    let mut interrupted = false;

    for batch in targets.chunks(batch_size) {
        if scanner.is_cancelled() {
            log::info!(
                "scan interrupted at batch boundary after {} of {total} files",
                results.len()
            );
            interrupted = true;
            break;
        }

        let mut tasks = JoinSet::new();
        for target in batch {
            let analyzer = Arc::clone(&scanner.analyzer);
            let semaphore = Arc::clone(&semaphore);
            let progress = scanner.progress.clone();
            let counter = Arc::clone(&progress_counter);
            let timeout_after = scanner.options.provider_timeout;
            let key = relative_key(&target.path, root);
            let path = target.path.clone();

            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (key, FileAnalysis::failed("scan aborted")),
                };

                let worker_path = path.clone();
                let outcome = tokio::time::timeout(
                    timeout_after,
                    tokio::task::spawn_blocking(move || analyzer.analyze_file(&worker_path)),
                )
                .await;

                let analysis = match outcome {
                    Ok(Ok(analysis)) => analysis,
                    Ok(Err(join_error)) => {
                        log::error!("analysis task for {} failed: {join_error}", path.display());
                        FileAnalysis::failed(format!("analysis task failed: {join_error}"))
                    }
                    Err(_) => {
                        log::warn!(
                            "analysis of {} timed out after {:?}",
                            path.display(),
                            timeout_after
                        );
                        FileAnalysis::failed(format!(
                            "analysis timed out after {}s",
                            timeout_after.as_secs()
                        ))
                    }
                };

                if let Some(reporter) = &progress {
                    // Increment and report atomically so concurrent
                    // completions cannot reorder the observed sequence.
                    let mut processed =
                        counter.lock().unwrap_or_else(PoisonError::into_inner);
                    *processed += 1;
                    reporter.on_progress(*processed, total);
                }

                (key, analysis)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((key, analysis)) => {
                    results.insert(key, analysis);
                }
                Err(e) => log::error!("scan worker panicked: {e}"),
            }
        }
        log::debug!("batch complete: {}/{total} files analyzed", results.len());
    }

    (results, interrupted)
}
