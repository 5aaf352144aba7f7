//! Synchronous analysis engine.
//!
//! Processes targets in order on the calling thread. The progress
//! callback fires exactly once per file with a strictly increasing count
//! that reaches the total on the last file.

use std::collections::BTreeMap;
use std::path::Path;

use crate::analysis::FileAnalysis;

use super::{relative_key, RepositoryScanner, ScanTarget};

/// Run every target through the analyzer sequentially.
///
/// Returns the result map and whether the run was interrupted by the
/// cancellation flag.
pub(crate) fn analyze_sequential(
    scanner: &RepositoryScanner,
    root: &Path,
    targets: &[ScanTarget],
) -> (BTreeMap<String, FileAnalysis>, bool) {
    let total = targets.len();
    let mut results = BTreeMap::new();

    for (index, target) in targets.iter().enumerate() {
        if scanner.is_cancelled() {
            log::info!("scan interrupted after {index} of {total} files");
            return (results, true);
        }

        let key = relative_key(&target.path, root);
        let analysis = scanner.analyzer.analyze_file(&target.path);
        results.insert(key, analysis);

        let processed = index + 1;
        if let Some(reporter) = &scanner.progress {
            reporter.on_progress(processed, total);
        }
        if processed % 10 == 0 || processed == total {
            log::debug!("analyzed {processed}/{total} files");
        }
    }

    (results, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{FileAnalyzer, MockProvider};
    use crate::progress::ProgressReporter;
    use crate::scanner::ScanOptions;
    use std::fs::File;
    use std::io::Write;
    use std::sync::atomic::AtomicBool;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    struct RecordingReporter {
        calls: Mutex<Vec<(usize, usize)>>,
    }

    impl RecordingReporter {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl ProgressReporter for RecordingReporter {
        fn on_progress(&self, processed: usize, total: usize) {
            self.calls.lock().unwrap().push((processed, total));
        }
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in [("a.py", "print(1)"), ("b.md", "# b"), ("c.rs", "fn c() {}")] {
            let mut file = File::create(dir.path().join(name)).unwrap();
            write!(file, "{content}").unwrap();
        }
        dir
    }

    fn scanner() -> RepositoryScanner {
        let analyzer = Arc::new(FileAnalyzer::new(Arc::new(MockProvider::new())));
        RepositoryScanner::new(analyzer, ScanOptions::default())
    }

    #[test]
    fn test_sequential_scan_analyzes_every_target() {
        let dir = fixture();
        let report = scanner().scan(dir.path()).unwrap();

        assert_eq!(report.statistics.total_files, 3);
        assert_eq!(report.statistics.analyzed_files, 3);
        assert_eq!(report.statistics.error_files, 0);
        assert!(report.analysis_results.contains_key("a.py"));
        assert!(report.analysis_results.contains_key("b.md"));
        assert!(report.analysis_results.contains_key("c.rs"));
    }

    #[test]
    fn test_progress_sequence_is_gap_free() {
        let dir = fixture();
        let reporter = Arc::new(RecordingReporter::new());
        let report = scanner()
            .with_progress(reporter.clone())
            .scan(dir.path())
            .unwrap();

        let calls = reporter.calls.lock().unwrap();
        let expected: Vec<(usize, usize)> = (1..=report.statistics.analyzed_files)
            .map(|n| (n, report.statistics.analyzed_files))
            .collect();
        assert_eq!(*calls, expected);
    }

    #[test]
    fn test_cancel_flag_stops_the_run() {
        let dir = fixture();
        let cancel = Arc::new(AtomicBool::new(true));
        let report = scanner()
            .with_cancel_flag(cancel)
            .scan(dir.path())
            .unwrap();

        assert!(report.statistics.interrupted);
        assert_eq!(report.statistics.analyzed_files, 0);
    }

    #[test]
    fn test_statistics_tally_languages_and_file_types() {
        let dir = fixture();
        let report = scanner().scan(dir.path()).unwrap();

        assert_eq!(report.statistics.languages.get("python"), Some(&1));
        assert_eq!(report.statistics.languages.get("markdown"), Some(&1));
        assert_eq!(report.statistics.languages.get("rust"), Some(&1));
        assert_eq!(report.statistics.file_types.get("code"), Some(&2));
        assert_eq!(report.statistics.file_types.get("documentation"), Some(&1));
    }

    #[test]
    fn test_provider_failures_are_counted_not_fatal() {
        use crate::analysis::{AnalysisProvider, ProviderError};
        use std::path::Path;

        struct PythonHater {
            inner: MockProvider,
        }
        impl AnalysisProvider for PythonHater {
            fn analyze(
                &self,
                path: &Path,
                content: &str,
            ) -> Result<crate::analysis::FileAnalysis, ProviderError> {
                if path.extension().is_some_and(|e| e == "py") {
                    return Err(ProviderError::Backend("python rejected".to_string()));
                }
                self.inner.analyze(path, content)
            }
        }

        let dir = fixture();
        let analyzer = Arc::new(FileAnalyzer::new(Arc::new(PythonHater {
            inner: MockProvider::new(),
        })));
        let report = RepositoryScanner::new(analyzer, ScanOptions::default())
            .scan(dir.path())
            .unwrap();

        // The run completes; the rejected file is its own error result.
        assert_eq!(report.statistics.analyzed_files, 3);
        assert_eq!(report.statistics.error_files, 1);
        assert!(report.analysis_results["a.py"].is_error());
        // Failed results are not tallied into language counts.
        assert!(!report.statistics.languages.contains_key("python"));
    }
}
