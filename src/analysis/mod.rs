//! File analysis pipeline.
//!
//! The scanner delegates content interpretation to an [`AnalysisProvider`].
//! [`FileAnalyzer`] wires a provider together with content reading,
//! fingerprinting and the result cache, so callers only ever see a single
//! `analyze_file` operation.
//!
//! Network-backed providers are intentionally out of scope; the trait is
//! the plug-in seam and [`MockProvider`] ships as the offline default.

pub mod analyzer;
pub mod fingerprint;
pub mod mock;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use analyzer::FileAnalyzer;
pub use mock::MockProvider;

/// Metadata produced for one file.
///
/// The cache treats this as an opaque JSON value; only the scanner's
/// statistics care about individual fields. A populated `error` marks the
/// file as failed without aborting the surrounding run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAnalysis {
    /// Broad category, e.g. "code", "documentation", "configuration".
    pub file_type: String,
    /// Detected language, e.g. "rust", "python", "markdown".
    pub language: String,
    /// What the file is for, e.g. "implementation", "settings".
    pub purpose: String,
    /// Free-form descriptive tags.
    #[serde(default)]
    pub characteristics: Vec<String>,
    /// Provider confidence in `0.0..=1.0`.
    #[serde(default)]
    pub confidence: f64,
    /// Present when analysis failed; the file counts as an error in scan
    /// statistics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileAnalysis {
    /// Result recorded for a file whose analysis failed.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            file_type: "unknown".to_string(),
            language: "unknown".to_string(),
            purpose: "unknown".to_string(),
            characteristics: Vec::new(),
            confidence: 0.0,
            error: Some(message.into()),
        }
    }

    /// Whether this result carries an error marker.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Errors raised by an analysis backend for a single file.
#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    /// The backend could not be reached or is not configured.
    #[error("analysis backend unavailable: {0}")]
    Unavailable(String),

    /// The backend returned a failure for this input.
    #[error("analysis backend failed: {0}")]
    Backend(String),
}

/// Pluggable content-interpretation backend.
///
/// Implementations receive the file's path (for naming heuristics) and
/// its content, and return structured metadata. They must be shareable
/// across scan workers.
pub trait AnalysisProvider: Send + Sync {
    /// Analyze one file's content.
    fn analyze(&self, path: &Path, content: &str) -> Result<FileAnalysis, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_result_is_error() {
        let result = FileAnalysis::failed("boom");
        assert!(result.is_error());
        assert_eq!(result.language, "unknown");
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_error_field_omitted_when_absent() {
        let result = FileAnalysis {
            file_type: "code".to_string(),
            language: "rust".to_string(),
            purpose: "implementation".to_string(),
            characteristics: vec!["functions".to_string()],
            confidence: 0.9,
            error: None,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("error"));
    }

    #[test]
    fn test_round_trips_through_cache_value() {
        let result = FileAnalysis::failed("read error");
        let value = serde_json::to_value(&result).unwrap();
        let back: FileAnalysis = serde_json::from_value(value).unwrap();
        assert_eq!(back, result);
    }
}
