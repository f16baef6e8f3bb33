//! Error types for spike detection.

use thiserror::Error;

/// Result type for detection operations.
pub type DetectResult<T> = Result<T, DetectError>;

/// Errors that abort detection for a single file.
///
/// Verdicts such as "no spike found" are not errors; see
/// [`Verdict`](crate::decision::Verdict).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Insufficient data: {found} samples in [{window_start_secs:.1}s, {window_end_secs:.1}s], need at least {required}")]
    InsufficientData {
        found: usize,
        required: usize,
        window_start_secs: f64,
        window_end_secs: f64,
    },
}

impl DetectError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether the file should be reported as undetectable rather than failed.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, DetectError::InsufficientData { .. })
    }
}
