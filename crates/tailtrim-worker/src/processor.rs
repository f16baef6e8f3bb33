//! Per-file pipeline: probe, measure, detect, trim.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tailtrim_detect::{detect, file_too_short_decision, DetectError, Detection, Verdict};
use tailtrim_media::{
    extract_loudness_trace, probe_audio, resolve_output_path, trim_to, FfmpegRunner,
    OutputReservations, OutputTarget,
};
use tailtrim_models::{format_hms, FileOutcome, FileReport};
use tracing::Instrument;

use crate::config::TrimmerConfig;
use crate::error::WorkerResult;
use crate::logging::FileLogger;

/// Shared state for processing files.
#[derive(Debug)]
pub struct ProcessingContext {
    pub config: TrimmerConfig,
    pub runner: FfmpegRunner,
    /// Output names already handed to files of this batch
    pub reservations: OutputReservations,
}

impl ProcessingContext {
    pub fn new(config: TrimmerConfig) -> Self {
        let runner = match config.ffmpeg_timeout_secs {
            Some(secs) => FfmpegRunner::new().with_timeout(secs),
            None => FfmpegRunner::new(),
        };
        Self {
            config,
            runner,
            reservations: OutputReservations::new(),
        }
    }
}

/// Process one file. Never fails: every problem becomes a report row.
pub async fn process_file(ctx: Arc<ProcessingContext>, path: PathBuf) -> FileReport {
    let logger = FileLogger::new(&path, "process");
    let span = logger.create_span();

    async move {
        logger.log_start(&path.display().to_string());
        let report = run_pipeline(&ctx, &path, &logger).await;

        match &report.outcome {
            FileOutcome::Failed { reason } | FileOutcome::Undetectable { reason } => {
                logger.log_error(reason)
            }
            outcome => logger.log_completion(outcome.label()),
        }
        report
    }
    .instrument(span)
    .await
}

async fn run_pipeline(ctx: &ProcessingContext, path: &Path, logger: &FileLogger) -> FileReport {
    let config = &ctx.config;

    let info = match probe_audio(path, &ctx.runner).await {
        Ok(info) => info,
        Err(e) => return FileReport::failed(path, e.to_string()),
    };
    let duration = info.duration;
    logger.stage("probe").log_progress(&format!(
        "Duration {} ({}, {} Hz, {} ch)",
        format_hms(duration),
        info.codec,
        info.sample_rate,
        info.channels
    ));

    // Skip the full decode for files that would never be analysed
    let policy = &config.detector.policy;
    if duration < policy.min_file_secs {
        let decision = file_too_short_decision(duration, policy);
        let mut report = base_report(path, duration, None);
        report.outcome = FileOutcome::SkippedFileTooShort;
        report.note = Some(decision.rationale);
        return report;
    }

    let trace = match extract_loudness_trace(path, &ctx.runner).await {
        Ok(trace) => trace,
        Err(e) => {
            let reason = e.to_string();
            return report_with(path, duration, FileOutcome::Failed { reason });
        }
    };
    logger
        .stage("loudness")
        .log_progress(&format!("Extracted {} loudness samples", trace.len()));

    let detector = config.detector.clone();
    let detection =
        match tokio::task::spawn_blocking(move || detect(&trace, duration, &detector)).await {
            Ok(Ok(detection)) => detection,
            Ok(Err(e)) => return report_with(path, duration, detect_error_outcome(e)),
            Err(join_err) => {
                return report_with(
                    path,
                    duration,
                    FileOutcome::Failed {
                        reason: format!("detection task failed: {}", join_err),
                    },
                )
            }
        };

    let outcome = match verdict_outcome(&detection.decision.verdict, config.trim_enabled) {
        Some(outcome) => outcome,
        None => match trim(ctx, path, &detection, logger).await {
            Ok(outcome) => outcome,
            Err(e) => FileOutcome::Failed {
                reason: e.to_string(),
            },
        },
    };

    let mut report = base_report(path, duration, Some(&detection));
    report.outcome = outcome;
    report
}

/// Write the trimmed copy for a `Trim` verdict.
async fn trim(
    ctx: &ProcessingContext,
    path: &Path,
    detection: &Detection,
    logger: &FileLogger,
) -> WorkerResult<FileOutcome> {
    let config = &ctx.config;
    let Some(at_secs) = detection.decision.verdict.cut_point() else {
        return Ok(FileOutcome::NoSpikeFound);
    };

    let target = resolve_output_path(
        path,
        &config.naming_scheme,
        &config.output_dir,
        config.on_conflict,
        chrono::Local::now(),
        &ctx.reservations,
    )?;
    let output = match target {
        OutputTarget::New(out) | OutputTarget::Overwrite(out) | OutputTarget::Renamed(out) => out,
        OutputTarget::Conflict(existing) => {
            logger.stage("trim").log_warning(&format!(
                "Output exists, skipped: {}",
                existing.display()
            ));
            return Ok(FileOutcome::OutputConflict { path: existing });
        }
    };

    trim_to(
        path,
        &output,
        at_secs,
        config.ffmpeg_log_level.as_str(),
        &ctx.runner,
    )
    .await?;

    Ok(FileOutcome::Trimmed { at_secs, output })
}

/// Outcome for verdicts that need no trimming; `None` means "go trim".
pub fn verdict_outcome(verdict: &Verdict, trim_enabled: bool) -> Option<FileOutcome> {
    match *verdict {
        Verdict::Trim { at_secs } if !trim_enabled => Some(FileOutcome::WouldTrim { at_secs }),
        Verdict::Trim { .. } => None,
        Verdict::NoSpikeFound => Some(FileOutcome::NoSpikeFound),
        Verdict::SkippedTooShort { remaining_secs } => {
            Some(FileOutcome::SkippedTooShort { remaining_secs })
        }
        Verdict::SkippedFileTooShort => Some(FileOutcome::SkippedFileTooShort),
    }
}

/// Undetectable files are left untouched; other detector errors are failures.
pub fn detect_error_outcome(err: DetectError) -> FileOutcome {
    if err.is_insufficient_data() {
        FileOutcome::Undetectable {
            reason: err.to_string(),
        }
    } else {
        FileOutcome::Failed {
            reason: err.to_string(),
        }
    }
}

/// Report populated from a detection, with a placeholder outcome.
pub fn base_report(path: &Path, duration: f64, detection: Option<&Detection>) -> FileReport {
    FileReport {
        file: path.to_path_buf(),
        duration_secs: Some(duration),
        profile: detection
            .and_then(|d| d.profile.as_ref())
            .map(|p| p.kind.to_string()),
        detected_secs: detection.and_then(|d| d.decision.spike_secs),
        clamped: detection.is_some_and(|d| d.decision.clamped),
        outcome: FileOutcome::NoSpikeFound,
        note: detection.map(|d| d.decision.rationale.clone()),
    }
}

fn report_with(path: &Path, duration: f64, outcome: FileOutcome) -> FileReport {
    let mut report = base_report(path, duration, None);
    report.outcome = outcome;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use tailtrim_detect::DetectorConfig;
    use tailtrim_media::ConflictPolicy;
    use tailtrim_models::LoudnessTrace;

    #[test]
    fn test_verdict_outcome_dry_run() {
        let trim = Verdict::Trim { at_secs: 3000.0 };
        assert_eq!(
            verdict_outcome(&trim, false),
            Some(FileOutcome::WouldTrim { at_secs: 3000.0 })
        );
        assert_eq!(verdict_outcome(&trim, true), None);
        assert_eq!(
            verdict_outcome(&Verdict::NoSpikeFound, true),
            Some(FileOutcome::NoSpikeFound)
        );
    }

    #[test]
    fn test_insufficient_data_is_undetectable() {
        let err = DetectError::InsufficientData {
            found: 1,
            required: 3,
            window_start_secs: 60.0,
            window_end_secs: 300.0,
        };
        assert!(matches!(detect_error_outcome(err), FileOutcome::Undetectable { .. }));
        assert!(matches!(
            detect_error_outcome(DetectError::configuration("skip too long")),
            FileOutcome::Failed { .. }
        ));
    }

    #[test]
    fn test_base_report_from_detection() {
        let trace = LoudnessTrace::from_pairs((0..12000).map(|i| {
            let t = i as f64 / 10.0;
            (t, if t >= 1000.0 { -10.0 } else { -30.0 })
        }))
        .unwrap();
        let detection = detect(&trace, 1200.0, &DetectorConfig::default()).unwrap();

        let report = base_report(Path::new("talk.m4a"), 1200.0, Some(&detection));
        assert_eq!(report.profile.as_deref(), Some("short"));
        assert_eq!(report.detected_secs, Some(1000.0));
        assert!(report.note.is_some());
        assert_eq!(
            verdict_outcome(&detection.decision.verdict, false),
            Some(FileOutcome::WouldTrim { at_secs: 1000.0 })
        );
    }

    #[tokio::test]
    async fn test_name_taken_in_batch_is_a_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrimmerConfig {
            output_dir: dir.path().to_path_buf(),
            trim_enabled: true,
            on_conflict: ConflictPolicy::Fail,
            ..TrimmerConfig::default()
        };
        let ctx = ProcessingContext::new(config);
        let logger = FileLogger::new(Path::new("lecture.m4a"), "trim");

        // Another in-flight file already holds the name
        resolve_output_path(
            Path::new("/rec/week1/lecture.m4a"),
            &ctx.config.naming_scheme,
            dir.path(),
            ConflictPolicy::Rename,
            chrono::Local::now(),
            &ctx.reservations,
        )
        .unwrap();

        let trace = LoudnessTrace::from_pairs((0..12000).map(|i| {
            let t = i as f64 / 10.0;
            (t, if t >= 1000.0 { -10.0 } else { -30.0 })
        }))
        .unwrap();
        let detection = detect(&trace, 1200.0, &ctx.config.detector).unwrap();

        let outcome = trim(&ctx, Path::new("/rec/week2/lecture.m4a"), &detection, &logger)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            FileOutcome::OutputConflict {
                path: dir.path().join("lecture_trimmed.m4a")
            }
        );
        assert!(!dir.path().join("lecture_trimmed.m4a").exists());
    }

    #[tokio::test]
    async fn test_missing_file_becomes_failed_report() {
        let ctx = Arc::new(ProcessingContext::new(TrimmerConfig::default()));
        let report = process_file(ctx, PathBuf::from("/nonexistent/tailtrim/talk.m4a")).await;
        assert!(report.outcome.is_failure());
        assert!(report.duration_secs.is_none());
    }
}
