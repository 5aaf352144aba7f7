//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for the repolens application.
///
/// - 0: Success (scan completed, no per-file errors)
/// - 1: General error (unexpected failure, e.g. unreadable root)
/// - 3: Partial success (scan completed with some per-file errors)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: scan or cache operation completed cleanly.
    Success = 0,
    /// General error: an unexpected error occurred.
    GeneralError = 1,
    /// Partial success: the scan completed but some files failed analysis.
    PartialSuccess = 3,
    /// Interrupted: the run was stopped by the user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "RL000",
            Self::GeneralError => "RL001",
            Self::PartialSuccess => "RL003",
            Self::Interrupted => "RL130",
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "RL001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: err.to_string(),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::GeneralError.as_i32(), 1);
        assert_eq!(ExitCode::PartialSuccess.as_i32(), 3);
        assert_eq!(ExitCode::Interrupted.as_i32(), 130);
    }

    #[test]
    fn test_code_prefixes() {
        assert_eq!(ExitCode::Success.code_prefix(), "RL000");
        assert_eq!(ExitCode::Interrupted.code_prefix(), "RL130");
    }

    #[test]
    fn test_structured_error_marks_interruption() {
        let err = anyhow::anyhow!("stopped");
        let structured = StructuredError::new(&err, ExitCode::Interrupted);
        assert!(structured.interrupted);
        assert_eq!(structured.exit_code, 130);
        assert_eq!(structured.message, "stopped");
    }
}
