//! Per-file batch reports.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Final outcome for one input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    /// The tail was cut and the result written to `output`.
    Trimmed { at_secs: f64, output: PathBuf },
    /// A cut point was found but trimming is disabled (dry run).
    WouldTrim { at_secs: f64 },
    /// Analysis completed without a confirmed spike.
    NoSpikeFound,
    /// The segment that would be removed is shorter than the minimum.
    SkippedTooShort { remaining_secs: f64 },
    /// The file is shorter than the minimum file duration.
    SkippedFileTooShort,
    /// An output file already exists and the conflict policy is `fail`.
    OutputConflict { path: PathBuf },
    /// Not enough loudness data to decide; the file was left untouched.
    Undetectable { reason: String },
    /// Probing, analysis, configuration or trimming failed.
    Failed { reason: String },
}

impl FileOutcome {
    /// Short label for tables.
    pub fn label(&self) -> &'static str {
        match self {
            FileOutcome::Trimmed { .. } => "trimmed",
            FileOutcome::WouldTrim { .. } => "would trim",
            FileOutcome::NoSpikeFound => "no spike",
            FileOutcome::SkippedTooShort { .. } => "segment too short",
            FileOutcome::SkippedFileTooShort => "file too short",
            FileOutcome::OutputConflict { .. } => "output exists",
            FileOutcome::Undetectable { .. } => "undetectable",
            FileOutcome::Failed { .. } => "failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            FileOutcome::Failed { .. } | FileOutcome::Undetectable { .. }
        )
    }
}

/// Everything reported about one processed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReport {
    pub file: PathBuf,
    /// Probed duration in seconds, when probing succeeded.
    pub duration_secs: Option<f64>,
    /// Name of the parameter profile used for detection.
    pub profile: Option<String>,
    /// Offset of the confirmed spike, before user offset and clamping.
    pub detected_secs: Option<f64>,
    /// Whether the effective cut point was clamped into the recording.
    #[serde(default)]
    pub clamped: bool,
    #[serde(flatten)]
    pub outcome: FileOutcome,
    /// Human-readable explanation of the outcome.
    pub note: Option<String>,
}

impl FileReport {
    /// Report for a file that failed before detection produced a decision.
    pub fn failed(file: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            duration_secs: None,
            profile: None,
            detected_secs: None,
            clamped: false,
            outcome: FileOutcome::Failed {
                reason: reason.into(),
            },
            note: None,
        }
    }
}

/// Aggregate counts over a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub trimmed: usize,
    pub would_trim: usize,
    pub no_spike: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_reports(reports: &[FileReport]) -> Self {
        let mut summary = Self {
            total: reports.len(),
            ..Self::default()
        };

        for report in reports {
            match report.outcome {
                FileOutcome::Trimmed { .. } => summary.trimmed += 1,
                FileOutcome::WouldTrim { .. } => summary.would_trim += 1,
                FileOutcome::NoSpikeFound => summary.no_spike += 1,
                FileOutcome::SkippedTooShort { .. }
                | FileOutcome::SkippedFileTooShort
                | FileOutcome::OutputConflict { .. } => summary.skipped += 1,
                FileOutcome::Undetectable { .. } | FileOutcome::Failed { .. } => {
                    summary.failed += 1
                }
            }
        }

        summary
    }
}
