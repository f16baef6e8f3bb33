//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("No input files: {0}")]
    NoInputs(String),

    #[error("Logging setup failed: {0}")]
    LoggingFailed(String),

    #[error("Media error: {0}")]
    Media(#[from] tailtrim_media::MediaError),

    #[error("Detection error: {0}")]
    Detect(#[from] tailtrim_detect::DetectError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn no_inputs(msg: impl Into<String>) -> Self {
        Self::NoInputs(msg.into())
    }

    pub fn logging_failed(msg: impl Into<String>) -> Self {
        Self::LoggingFailed(msg.into())
    }

    /// Check if the error means nothing could be processed.
    ///
    /// Setup errors (configuration, tooling, input and output locations)
    /// are fatal. Plain IO and JSON errors only come from writing the
    /// report once the batch has run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, WorkerError::Json(_) | WorkerError::Io(_))
    }
}

/// Whether a top-level error should fail the process.
///
/// Errors that are not a [`WorkerError`] come straight from setup helpers
/// and are always fatal.
pub fn is_fatal_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<WorkerError>().map_or(true, WorkerError::is_fatal)
}
