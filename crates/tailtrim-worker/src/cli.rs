//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tailtrim_detect::{ProfileKind, ProfileOverrides};
use tailtrim_media::{ConflictPolicy, DEFAULT_EXTENSION, DEFAULT_NAMING_SCHEME};
use tailtrim_models::parse_timestamp;

/// Find and losslessly trim noisy tails (applause, chatter) from long recordings.
///
/// Without `--trim` the run is a dry run that only reports cut points.
#[derive(Parser, Debug, Clone)]
#[command(name = "tailtrim")]
#[command(version)]
pub struct Cli {
    // Input
    /// File or directory to process
    #[arg(short, long, default_value = ".", env = "TAILTRIM_INPUT")]
    pub input: PathBuf,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// File extensions to pick up from directories (comma separated)
    #[arg(long = "ext", value_delimiter = ',', default_value = DEFAULT_EXTENSION)]
    pub extensions: Vec<String>,

    // Output
    /// Output directory for trimmed files
    #[arg(short, long, default_value = "trimmed", env = "TAILTRIM_OUTPUT_DIR")]
    pub output: PathBuf,

    /// Output file name without extension; placeholders {ORIGINAL}, {TIMESTAMP}, {UNIX}
    #[arg(long, default_value = DEFAULT_NAMING_SCHEME)]
    pub naming_scheme: String,

    /// What to do when an output file already exists
    #[arg(long, default_value_t = ConflictPolicy::Rename)]
    pub on_conflict: ConflictPolicy,

    /// JSON report destination
    #[arg(long, value_name = "PATH")]
    pub report_json: Option<PathBuf>,

    // Trimming
    /// Trim files, shifting each cut by OFFSET (seconds or [-]MM:SS, default 0)
    ///
    /// Use `--trim=-1:30` for negative clock-style offsets.
    #[arg(
        short = 't',
        long = "trim",
        value_name = "OFFSET",
        num_args = 0..=1,
        default_missing_value = "0",
        allow_negative_numbers = true,
        value_parser = parse_offset
    )]
    pub trim: Option<f64>,

    /// Ignore files shorter than this (seconds or MM:SS)
    #[arg(long, default_value = "600", value_parser = parse_duration)]
    pub trim_min_file_dur: f64,

    /// Do not trim when less than this would be removed (seconds or MM:SS)
    #[arg(long, default_value = "180", value_parser = parse_duration)]
    pub trim_min_seg_dur: f64,

    // Profiles
    /// Use one profile for every file instead of choosing by duration
    #[arg(long, value_name = "PROFILE")]
    pub profile: Option<ProfileKind>,

    /// Files shorter than this many minutes use the short profile
    #[arg(long, default_value_t = 30.0)]
    pub short_max_mins: f64,

    /// Files shorter than this many minutes (and not short) use the medium profile
    #[arg(long, default_value_t = 90.0)]
    pub medium_max_mins: f64,

    #[command(flatten)]
    pub tuning: ProfileTuning,

    // Execution
    /// Number of files processed concurrently
    #[arg(short, long, default_value_t = 2, env = "TAILTRIM_JOBS")]
    pub jobs: usize,

    /// Kill an ffmpeg/ffprobe run after this many seconds
    #[arg(long, env = "TAILTRIM_FFMPEG_TIMEOUT")]
    pub ffmpeg_timeout: Option<u64>,

    // Logging
    /// Console verbosity
    #[arg(short, long, value_enum, default_value_t = LogLevel::Light, env = "TAILTRIM_LOG_LEVEL")]
    pub log_level: LogLevel,

    /// ffmpeg's own verbosity while trimming
    #[arg(long, value_enum, default_value_t = FfmpegLogLevel::Warning)]
    pub ffmpeg_log_level: FfmpegLogLevel,

    /// Also write logs to a timestamped file in this directory
    #[arg(long, value_name = "DIR")]
    pub log_file: Option<PathBuf>,
}

/// Per-profile parameter overrides. Unset flags keep the profile default.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ProfileTuning {
    /// [short] Loudness rise over baseline in dB
    #[arg(long)]
    pub short_delta_db: Option<f64>,
    /// [medium] Loudness rise over baseline in dB
    #[arg(long)]
    pub medium_delta_db: Option<f64>,
    /// [long] Loudness rise over baseline in dB
    #[arg(long)]
    pub long_delta_db: Option<f64>,

    /// [short] Averaging window in seconds
    #[arg(long)]
    pub short_window_secs: Option<f64>,
    /// [medium] Averaging window in seconds
    #[arg(long)]
    pub medium_window_secs: Option<f64>,
    /// [long] Averaging window in seconds
    #[arg(long)]
    pub long_window_secs: Option<f64>,

    /// [short] Confirmation offsets in seconds (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub short_confirm_secs: Option<Vec<f64>>,
    /// [medium] Confirmation offsets in seconds (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub medium_confirm_secs: Option<Vec<f64>>,
    /// [long] Confirmation offsets in seconds (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub long_confirm_secs: Option<Vec<f64>>,

    /// [short] Minutes skipped at the start
    #[arg(long)]
    pub short_skip_mins: Option<f64>,
    /// [medium] Minutes skipped at the start
    #[arg(long)]
    pub medium_skip_mins: Option<f64>,
    /// [long] Minutes skipped at the start
    #[arg(long)]
    pub long_skip_mins: Option<f64>,

    /// [short] Minutes after the skip used for the baseline
    #[arg(long)]
    pub short_analysis_mins: Option<f64>,
    /// [medium] Minutes after the skip used for the baseline
    #[arg(long)]
    pub medium_analysis_mins: Option<f64>,
    /// [long] Minutes after the skip used for the baseline
    #[arg(long)]
    pub long_analysis_mins: Option<f64>,
}

impl ProfileTuning {
    /// Overrides for one profile, converted to seconds.
    pub fn overrides(&self, kind: ProfileKind) -> ProfileOverrides {
        let (delta, window, confirm, skip_mins, analysis_mins) = match kind {
            ProfileKind::Short => (
                self.short_delta_db,
                self.short_window_secs,
                &self.short_confirm_secs,
                self.short_skip_mins,
                self.short_analysis_mins,
            ),
            ProfileKind::Medium => (
                self.medium_delta_db,
                self.medium_window_secs,
                &self.medium_confirm_secs,
                self.medium_skip_mins,
                self.medium_analysis_mins,
            ),
            ProfileKind::Long => (
                self.long_delta_db,
                self.long_window_secs,
                &self.long_confirm_secs,
                self.long_skip_mins,
                self.long_analysis_mins,
            ),
        };

        ProfileOverrides {
            min_loudness_delta_db: delta,
            window_secs: window,
            confirm_offsets_secs: confirm.clone(),
            skip_start_secs: skip_mins.map(|m| m * 60.0),
            analysis_window_secs: analysis_mins.map(|m| m * 60.0),
        }
    }
}

/// Console verbosity presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Per-file verdicts only
    Light,
    /// Adds baseline, profile and stage results
    Standard,
    /// Adds every candidate and confirmation check
    Verbose,
    /// Verbose plus source locations
    Debug,
}

/// ffmpeg `-v` levels accepted for trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FfmpegLogLevel {
    Info,
    Warning,
    Error,
}

impl FfmpegLogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FfmpegLogLevel::Info => "info",
            FfmpegLogLevel::Warning => "warning",
            FfmpegLogLevel::Error => "error",
        }
    }
}

/// Parse a signed offset: `30`, `-30`, `+1:30`, `-00:01:30.5`.
pub fn parse_offset(value: &str) -> Result<f64, String> {
    let value = value.trim();
    let (sign, magnitude) = match value.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, value.strip_prefix('+').unwrap_or(value)),
    };
    parse_timestamp(magnitude)
        .map(|secs| sign * secs)
        .map_err(|e| e.to_string())
}

/// Parse a non-negative duration in seconds or clock form.
pub fn parse_duration(value: &str) -> Result<f64, String> {
    parse_timestamp(value).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_offset("0"), Ok(0.0));
        assert_eq!(parse_offset("-30"), Ok(-30.0));
        assert_eq!(parse_offset("+1:30"), Ok(90.0));
        assert_eq!(parse_offset("-00:01:30.5"), Ok(-90.5));
        assert!(parse_offset("--5").is_err());
        assert!(parse_offset("soon").is_err());
    }

    #[test]
    fn test_defaults_are_dry_run() {
        let cli = Cli::try_parse_from(["tailtrim"]).unwrap();
        assert_eq!(cli.trim, None);
        assert_eq!(cli.jobs, 2);
        assert_eq!(cli.extensions, vec!["m4a".to_string()]);
        assert_eq!(cli.on_conflict, ConflictPolicy::Rename);
        assert_eq!(cli.trim_min_file_dur, 600.0);
        assert_eq!(cli.log_level, LogLevel::Light);
        assert_eq!(cli.ffmpeg_log_level, FfmpegLogLevel::Warning);
    }

    #[test]
    fn test_trim_flag_forms() {
        let bare = Cli::try_parse_from(["tailtrim", "-t"]).unwrap();
        assert_eq!(bare.trim, Some(0.0));

        let negative = Cli::try_parse_from(["tailtrim", "-t", "-30", "-r"]).unwrap();
        assert_eq!(negative.trim, Some(-30.0));
        assert!(negative.recursive);

        let clock = Cli::try_parse_from(["tailtrim", "--trim=-1:30"]).unwrap();
        assert_eq!(clock.trim, Some(-90.0));
    }

    #[test]
    fn test_profile_tuning_converts_minutes() {
        let cli = Cli::try_parse_from([
            "tailtrim",
            "--medium-delta-db",
            "15",
            "--medium-skip-mins",
            "2",
            "--long-confirm-secs",
            "5,10",
        ])
        .unwrap();

        let medium = cli.tuning.overrides(ProfileKind::Medium);
        assert_eq!(medium.min_loudness_delta_db, Some(15.0));
        assert_eq!(medium.skip_start_secs, Some(120.0));
        assert_eq!(medium.window_secs, None);

        let long = cli.tuning.overrides(ProfileKind::Long);
        assert_eq!(long.confirm_offsets_secs, Some(vec![5.0, 10.0]));
        assert!(cli.tuning.overrides(ProfileKind::Short).is_empty());
    }

    #[test]
    fn test_forced_profile_and_conflict_policy() {
        let cli =
            Cli::try_parse_from(["tailtrim", "--profile", "long", "--on-conflict", "fail"]).unwrap();
        assert_eq!(cli.profile, Some(ProfileKind::Long));
        assert_eq!(cli.on_conflict, ConflictPolicy::Fail);
    }
}
