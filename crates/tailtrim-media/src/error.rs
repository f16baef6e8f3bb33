//! Error types for media operations.

use std::path::{Path, PathBuf};
use tailtrim_models::TraceError;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while probing, analysing or trimming a file.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("Invalid or unsupported media file: {0}")]
    InvalidMedia(PathBuf),

    #[error("No audio stream in {0}")]
    NoAudioStream(PathBuf),

    #[error("No loudness data extracted from {0}")]
    NoLoudnessData(PathBuf),

    #[error("Invalid loudness trace: {0}")]
    InvalidTrace(#[from] TraceError),

    #[error("Invalid naming scheme '{scheme}': {reason}")]
    InvalidNamingScheme { scheme: String, reason: String },

    #[error("Output would overwrite its own input: {0}")]
    OutputIsInput(PathBuf),

    #[error("Directory is not writable: {0}")]
    DirectoryNotWritable(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a naming scheme error.
    pub fn invalid_naming_scheme(scheme: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNamingScheme {
            scheme: scheme.into(),
            reason: reason.into(),
        }
    }

    /// Classify a failed ffmpeg/ffprobe run from its diagnostic output.
    ///
    /// Only recognisable input problems are mapped; anything else is
    /// reported as invalid media for `path`.
    pub fn from_tool_output(path: &Path, stderr: &str) -> Self {
        let lower = stderr.to_lowercase();
        if lower.contains("permission denied") {
            Self::PermissionDenied(path.to_path_buf())
        } else if lower.contains("no such file") {
            Self::FileNotFound(path.to_path_buf())
        } else {
            Self::InvalidMedia(path.to_path_buf())
        }
    }

    /// Whether the error means the tooling itself is unavailable.
    pub fn is_missing_tool(&self) -> bool {
        matches!(self, Self::FfmpegNotFound | Self::FfprobeNotFound)
    }
}
