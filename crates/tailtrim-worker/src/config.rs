//! Trimmer configuration.

use std::path::PathBuf;

use tailtrim_detect::{DetectorConfig, ProfileKind, ProfileSelector, TrimPolicy};
use tailtrim_media::{ConflictPolicy, NamingScheme, DEFAULT_EXTENSION};

use crate::cli::{Cli, FfmpegLogLevel};
use crate::error::{WorkerError, WorkerResult};

/// Where to look for recordings.
#[derive(Debug, Clone, PartialEq)]
pub struct InputConfig {
    pub path: PathBuf,
    pub recursive: bool,
    pub extensions: Vec<String>,
}

/// Immutable run configuration, validated before the first file.
#[derive(Debug, Clone)]
pub struct TrimmerConfig {
    pub input: InputConfig,
    /// Output directory for trimmed files
    pub output_dir: PathBuf,
    pub naming_scheme: NamingScheme,
    pub on_conflict: ConflictPolicy,
    /// Write trimmed files; otherwise only report
    pub trim_enabled: bool,
    pub detector: DetectorConfig,
    /// Maximum files processed concurrently
    pub max_concurrent_files: usize,
    pub ffmpeg_log_level: FfmpegLogLevel,
    pub ffmpeg_timeout_secs: Option<u64>,
    pub report_json: Option<PathBuf>,
}

impl Default for TrimmerConfig {
    fn default() -> Self {
        Self {
            input: InputConfig {
                path: PathBuf::from("."),
                recursive: false,
                extensions: vec![DEFAULT_EXTENSION.to_string()],
            },
            output_dir: PathBuf::from("trimmed"),
            naming_scheme: NamingScheme::default(),
            on_conflict: ConflictPolicy::Rename,
            trim_enabled: false,
            detector: DetectorConfig::default(),
            max_concurrent_files: 2,
            ffmpeg_log_level: FfmpegLogLevel::Warning,
            ffmpeg_timeout_secs: None,
            report_json: None,
        }
    }
}

impl TrimmerConfig {
    /// Build and validate the configuration from parsed arguments.
    pub fn from_cli(cli: &Cli) -> WorkerResult<Self> {
        let naming_scheme = NamingScheme::parse(&cli.naming_scheme)?;

        let mut profiles = ProfileSelector::default()
            .with_bands(cli.short_max_mins * 60.0, cli.medium_max_mins * 60.0);
        if let Some(kind) = cli.profile {
            profiles = profiles.with_forced(kind);
        }
        for kind in ProfileKind::ALL {
            profiles = profiles.with_overrides(kind, cli.tuning.overrides(kind));
        }

        let policy = TrimPolicy::default()
            .with_user_offset_secs(cli.trim.unwrap_or(0.0))
            .with_min_segment_secs(cli.trim_min_seg_dur)
            .with_min_file_secs(cli.trim_min_file_dur);

        let extensions: Vec<String> = cli
            .extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_string())
            .filter(|e| !e.is_empty())
            .collect();

        let config = Self {
            input: InputConfig {
                path: cli.input.clone(),
                recursive: cli.recursive,
                extensions,
            },
            output_dir: cli.output.clone(),
            naming_scheme,
            on_conflict: cli.on_conflict,
            trim_enabled: cli.trim.is_some(),
            detector: DetectorConfig::new(profiles, policy),
            max_concurrent_files: cli.jobs,
            ffmpeg_log_level: cli.ffmpeg_log_level,
            ffmpeg_timeout_secs: cli.ffmpeg_timeout,
            report_json: cli.report_json.clone(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check everything that does not need the filesystem.
    pub fn validate(&self) -> WorkerResult<()> {
        self.detector.validate()?;

        if self.max_concurrent_files == 0 {
            return Err(WorkerError::config_error("--jobs must be at least 1"));
        }
        if self.input.extensions.is_empty() {
            return Err(WorkerError::config_error("at least one --ext is required"));
        }
        if self.ffmpeg_timeout_secs == Some(0) {
            return Err(WorkerError::config_error("--ffmpeg-timeout must be positive"));
        }
        Ok(())
    }
}
