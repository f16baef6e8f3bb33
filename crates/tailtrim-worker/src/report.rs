//! Batch summary table and JSON report.

use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tailtrim_models::{format_hms, BatchSummary, FileOutcome, FileReport};

use crate::error::WorkerResult;

const NOTE_WIDTH: usize = 60;

/// JSON document written by `--report-json`.
#[derive(Debug, Serialize)]
pub struct BatchReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub trim_enabled: bool,
    pub summary: BatchSummary,
    pub files: &'a [FileReport],
}

impl<'a> BatchReport<'a> {
    pub fn new(files: &'a [FileReport], trim_enabled: bool) -> Self {
        Self {
            generated_at: Utc::now(),
            trim_enabled,
            summary: BatchSummary::from_reports(files),
            files,
        }
    }
}

/// Text shown in the "outcome" column.
fn outcome_cell(outcome: &FileOutcome) -> String {
    match outcome {
        FileOutcome::Trimmed { at_secs, .. } => format!("trimmed @ {}", format_hms(*at_secs)),
        FileOutcome::WouldTrim { at_secs } => format!("would trim @ {}", format_hms(*at_secs)),
        FileOutcome::SkippedTooShort { remaining_secs } => {
            format!("skipped ({} left)", format_hms(*remaining_secs))
        }
        other => other.label().to_string(),
    }
}

fn note_cell(report: &FileReport) -> String {
    let note = match &report.outcome {
        FileOutcome::Trimmed { output, .. } => output.display().to_string(),
        FileOutcome::OutputConflict { path } => format!("exists: {}", path.display()),
        FileOutcome::Failed { reason } | FileOutcome::Undetectable { reason } => reason.clone(),
        _ => report.note.clone().unwrap_or_default(),
    };
    truncate(&note, NOTE_WIDTH)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Render the per-file table followed by the totals line.
pub fn render_table(reports: &[FileReport]) -> String {
    let rows: Vec<[String; 5]> = reports
        .iter()
        .map(|r| {
            let name = r
                .file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| r.file.display().to_string());
            [
                name,
                r.duration_secs.map(format_hms).unwrap_or_else(|| "-".into()),
                r.detected_secs.map(format_hms).unwrap_or_else(|| "-".into()),
                outcome_cell(&r.outcome),
                note_cell(r),
            ]
        })
        .collect();

    let headers = ["file", "duration", "detected", "outcome", "note"];
    let mut widths = headers.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let mut push_row = |cells: &[String]| {
        let line: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect();
        let _ = writeln!(out, "{}", line.join("  ").trim_end());
    };

    push_row(&headers.map(String::from));
    push_row(&widths.map(|w| "-".repeat(w)));
    for row in &rows {
        push_row(row);
    }

    let _ = write!(out, "\n{}", render_summary(&BatchSummary::from_reports(reports)));
    out
}

/// One-line batch totals.
pub fn render_summary(summary: &BatchSummary) -> String {
    format!(
        "{} file(s): {} trimmed, {} would trim, {} no spike, {} skipped, {} failed",
        summary.total,
        summary.trimmed,
        summary.would_trim,
        summary.no_spike,
        summary.skipped,
        summary.failed
    )
}

/// Write the JSON report, creating parent directories as needed.
pub async fn write_json_report(path: &Path, report: &BatchReport<'_>) -> WorkerResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(report)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn report(file: &str, outcome: FileOutcome) -> FileReport {
        FileReport {
            file: PathBuf::from(file),
            duration_secs: Some(3900.0),
            profile: Some("medium".into()),
            detected_secs: Some(3600.0),
            clamped: false,
            outcome,
            note: Some("confirmed at 1:00:00".into()),
        }
    }

    #[test]
    fn test_render_table() {
        let reports = vec![
            report("/rec/monday.m4a", FileOutcome::WouldTrim { at_secs: 3600.0 }),
            FileReport::failed("/rec/broken.m4a", "invalid media"),
        ];
        let table = render_table(&reports);
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[0].starts_with("file"));
        assert!(lines[2].starts_with("monday.m4a"));
        assert!(lines[2].contains("would trim @ 01:00:00"));
        assert!(lines[3].contains("invalid media"));
        assert!(table.ends_with("2 file(s): 0 trimmed, 1 would trim, 0 no spike, 0 skipped, 1 failed"));
    }

    #[test]
    fn test_truncate_note() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }

    #[tokio::test]
    async fn test_write_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/run.json");
        let reports = vec![report("a.m4a", FileOutcome::NoSpikeFound)];

        write_json_report(&path, &BatchReport::new(&reports, true))
            .await
            .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["summary"]["total"], 1);
        assert_eq!(value["files"][0]["outcome"], "no_spike_found");
        assert_eq!(value["trim_enabled"], true);
    }
}
