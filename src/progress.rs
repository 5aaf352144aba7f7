//! Progress reporting for scan runs.
//!
//! The scanner invokes a [`ProgressReporter`] exactly once per analyzed
//! file with a strictly increasing processed count. The bundled
//! [`ScanProgressBar`] renders that stream as an indicatif bar for
//! terminal output; library users can plug in anything else.

use std::sync::{Mutex, PoisonError};

use indicatif::{ProgressBar, ProgressStyle};

/// Callback for per-file scan progress.
///
/// Implementations must be shareable across scan workers; the scanner
/// serializes invocations, so `processed` is guaranteed to arrive as
/// `1, 2, ..., total` without gaps or repeats.
pub trait ProgressReporter: Send + Sync {
    /// Called after each file has been analyzed.
    ///
    /// # Arguments
    ///
    /// * `processed` - Number of files completed so far (1-based)
    /// * `total` - Total number of files selected for analysis
    fn on_progress(&self, processed: usize, total: usize);
}

/// Terminal progress bar backed by indicatif.
///
/// The bar is created lazily on the first callback, once the total is
/// known, and finishes itself when the count reaches the total.
pub struct ScanProgressBar {
    bar: Mutex<Option<ProgressBar>>,
}

impl ScanProgressBar {
    /// Create a progress bar reporter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%)",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
    }
}

impl Default for ScanProgressBar {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ScanProgressBar {
    fn on_progress(&self, processed: usize, total: usize) {
        let mut slot = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        let bar = slot.get_or_insert_with(|| {
            let bar = ProgressBar::new(total as u64);
            bar.set_style(Self::style());
            bar
        });

        bar.set_position(processed as u64);
        if processed >= total {
            bar.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar_tolerates_full_sequence() {
        let reporter = ScanProgressBar::new();
        for n in 1..=5 {
            reporter.on_progress(n, 5);
        }
        let slot = reporter.bar.lock().unwrap();
        let bar = slot.as_ref().unwrap();
        assert!(bar.is_finished());
        assert_eq!(bar.position(), 5);
    }

    #[test]
    fn test_zero_total_does_not_panic() {
        let reporter = ScanProgressBar::new();
        reporter.on_progress(0, 0);
    }
}
