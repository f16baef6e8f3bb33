//! Tracing setup and structured per-file logging.
//!
//! Console output is human-readable with ANSI colours by default and JSON
//! when `LOG_FORMAT=json`. With `--log-file DIR` a second, plain-text layer
//! writes the same events to `DIR/log_<timestamp>.log`.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn, Span, Subscriber};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

use crate::cli::LogLevel;
use crate::error::{WorkerError, WorkerResult};

impl LogLevel {
    /// Level applied to the `tailtrim*` targets.
    pub fn level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Light => LevelFilter::INFO,
            LogLevel::Standard => LevelFilter::DEBUG,
            LogLevel::Verbose | LogLevel::Debug => LevelFilter::TRACE,
        }
    }

    fn shows_locations(&self) -> bool {
        matches!(self, LogLevel::Debug)
    }
}

/// Build the filter: `RUST_LOG` for everything else, `level` for our crates.
pub fn build_env_filter(level: LogLevel) -> WorkerResult<EnvFilter> {
    let directive = format!("tailtrim={}", level.level_filter())
        .parse()
        .map_err(|e| WorkerError::logging_failed(format!("invalid log directive: {}", e)))?;

    Ok(EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy()
        .add_directive(directive))
}

/// File name for a log started at `now`.
pub fn log_file_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!("log_{}.log", now.format("%Y-%m-%d_%H%M%S"))
}

fn file_layer<S>(file: Option<File>, locations: bool) -> Option<impl Layer<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    file.map(|f| {
        fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_file(locations)
            .with_line_number(locations)
            .with_writer(Mutex::new(f))
    })
}

/// Install the global subscriber.
///
/// Returns the log file path when file logging is enabled.
pub async fn init_tracing(level: LogLevel, log_dir: Option<&Path>) -> WorkerResult<Option<PathBuf>> {
    let (file, log_path) = match log_dir {
        Some(dir) => {
            let dir = tailtrim_media::ensure_dir_writable(dir, true).await?;
            let path = dir.join(log_file_name(chrono::Local::now()));
            let file = File::create(&path).map_err(|e| {
                WorkerError::logging_failed(format!("cannot create {}: {}", path.display(), e))
            })?;
            (Some(file), Some(path))
        }
        None => (None, None),
    };

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);
    let locations = level.shows_locations();
    let env_filter = build_env_filter(level)?;

    let result = if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(file_layer(file, locations))
            .with(env_filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(locations)
                    .with_line_number(locations),
            )
            .with(file_layer(file, locations))
            .with(env_filter)
            .try_init()
    };

    result.map_err(|e| WorkerError::logging_failed(e.to_string()))?;
    Ok(log_path)
}

/// File logger for structured logging with consistent formatting.
///
/// Every event carries the file name and the pipeline stage.
#[derive(Debug, Clone)]
pub struct FileLogger {
    file: String,
    stage: String,
}

impl FileLogger {
    /// Create a logger for `path` in `stage` (e.g. "probe", "trim").
    pub fn new(path: &Path, stage: &str) -> Self {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            file,
            stage: stage.to_string(),
        }
    }

    /// Same file, different stage.
    pub fn stage(&self, stage: &str) -> Self {
        Self {
            file: self.file.clone(),
            stage: stage.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(file = %self.file, stage = %self.stage, "Started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(file = %self.file, stage = %self.stage, "{}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(file = %self.file, stage = %self.stage, "{}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(file = %self.file, stage = %self.stage, "Failed: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(file = %self.file, stage = %self.stage, "Done: {}", message);
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn stage_name(&self) -> &str {
        &self.stage
    }

    /// Span attached to everything logged while processing this file.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("file", name = %self.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_level_mapping() {
        assert_eq!(LogLevel::Light.level_filter(), LevelFilter::INFO);
        assert_eq!(LogLevel::Standard.level_filter(), LevelFilter::DEBUG);
        assert_eq!(LogLevel::Verbose.level_filter(), LevelFilter::TRACE);
        assert_eq!(LogLevel::Debug.level_filter(), LevelFilter::TRACE);
    }

    #[test]
    fn test_env_filter_builds() {
        for level in [LogLevel::Light, LogLevel::Standard, LogLevel::Verbose, LogLevel::Debug] {
            assert!(build_env_filter(level).is_ok());
        }
    }

    #[test]
    fn test_log_file_name() {
        let now = chrono::Local.with_ymd_and_hms(2024, 11, 2, 9, 5, 0).single().unwrap();
        assert_eq!(log_file_name(now), "log_2024-11-02_090500.log");
    }

    #[test]
    fn test_file_logger() {
        let logger = FileLogger::new(Path::new("/recordings/week1.m4a"), "probe");
        assert_eq!(logger.file(), "week1.m4a");
        assert_eq!(logger.stage_name(), "probe");
        assert_eq!(logger.stage("trim").stage_name(), "trim");
    }
}
