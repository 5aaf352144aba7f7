//! Offline analysis provider with extension-keyed canned results.

use std::path::Path;

use super::{AnalysisProvider, FileAnalysis, ProviderError};

fn canned(
    file_type: &str,
    language: &str,
    purpose: &str,
    characteristics: &[&str],
) -> FileAnalysis {
    FileAnalysis {
        file_type: file_type.to_string(),
        language: language.to_string(),
        purpose: purpose.to_string(),
        characteristics: characteristics.iter().map(|c| (*c).to_string()).collect(),
        confidence: 0.9,
        error: None,
    }
}

/// Deterministic provider that classifies files by name alone.
///
/// Used as the CLI default and throughout the test suite: the result for
/// a given path never changes, which makes the synchronous and concurrent
/// engines directly comparable.
#[derive(Debug, Default)]
pub struct MockProvider;

impl MockProvider {
    /// Create a new mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl AnalysisProvider for MockProvider {
    fn analyze(&self, path: &Path, content: &str) -> Result<FileAnalysis, ProviderError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());

        let analysis = match extension.as_deref() {
            Some("py") => canned("code", "python", "implementation", &["functions", "classes", "module"]),
            Some("rs") => canned("code", "rust", "implementation", &["functions", "modules"]),
            Some("js") => canned("code", "javascript", "implementation", &["functions", "module"]),
            Some("ts") => canned("code", "typescript", "implementation", &["functions", "module"]),
            Some("json") => canned("code", "json", "configuration", &["settings", "data"]),
            Some("md") => canned("documentation", "markdown", "documentation", &["text", "formatting"]),
            Some("yml") | Some("yaml") => {
                canned("configuration", "yaml", "configuration", &["settings", "environment"])
            }
            Some("toml") => canned("configuration", "toml", "project configuration", &["settings", "metadata"]),
            Some("html") => canned("markup", "html", "user interface", &["markup", "structure"]),
            Some("css") => canned("code", "css", "styling", &["styles", "presentation"]),
            Some("sh") => canned("code", "shell", "automation", &["commands", "script"]),
            _ if file_name == "requirements.txt" => {
                canned("configuration", "text", "dependencies", &["packages", "dependencies"])
            }
            _ => {
                let shape = if content.bytes().any(|b| b == 0) {
                    "binary"
                } else {
                    "text"
                };
                FileAnalysis {
                    file_type: "unknown".to_string(),
                    language: "unknown".to_string(),
                    purpose: "unknown".to_string(),
                    characteristics: vec![shape.to_string()],
                    confidence: 0.5,
                    error: None,
                }
            }
        };

        Ok(analysis)
    }
}
