//! Lossless tail trimming.
//!
//! The cut is a stream copy (`-c copy`), so nothing is re-encoded. ffmpeg
//! writes to a uniquely named hidden sibling of the destination first; the
//! finished file is renamed into place, so an interrupted run never leaves
//! a truncated output behind.

use std::path::Path;

use tempfile::TempPath;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Write the first `cut_secs` of `input` to `output`.
pub async fn trim_to(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    cut_secs: f64,
    ffmpeg_log_level: &str,
    runner: &FfmpegRunner,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    if input == output {
        return Err(MediaError::OutputIsInput(output.to_path_buf()));
    }
    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    let staging = staging_file(output).await?;
    let cmd = FfmpegCommand::new(input, &staging)
        .log_level(ffmpeg_log_level)
        .duration(cut_secs)
        .codec_copy();

    debug!(
        input = %input.display(),
        staging = %staging.display(),
        cut_secs,
        "Trimming with stream copy"
    );

    // Dropping `staging` on any early return removes the partial file
    runner.run(&cmd).await?;
    staging.persist(output).map_err(|e| MediaError::Io(e.error))?;

    info!(
        input = %input.display(),
        output = %output.display(),
        cut_secs,
        "Trimmed file written"
    );
    Ok(())
}

/// Create an empty, uniquely named hidden sibling of `output`.
///
/// The name keeps the output's extension so ffmpeg still picks the right
/// muxer, e.g. `.talk_trimmed.Ab12Cd.partial.m4a`.
async fn staging_file(output: &Path) -> MediaResult<TempPath> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = match output.extension() {
        Some(ext) => format!(".partial.{}", ext.to_string_lossy()),
        None => ".partial".to_string(),
    };

    tokio::task::spawn_blocking(move || {
        tempfile::Builder::new()
            .prefix(&format!(".{}.", stem))
            .suffix(&suffix)
            .tempfile_in(&dir)
            .map(|file| file.into_temp_path())
    })
    .await
    .map_err(std::io::Error::other)?
    .map_err(MediaError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_staging_files_are_unique_per_run() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("lecture_trimmed.m4a");

        let first = staging_file(&output).await.unwrap();
        let second = staging_file(&output).await.unwrap();
        assert_ne!(&*first, &*second);

        for staging in [&first, &second] {
            assert_eq!(staging.parent(), Some(dir.path()));
            assert_eq!(staging.extension().unwrap(), "m4a");
            let name = staging.file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with(".lecture_trimmed."), "{}", name);
            assert!(name.ends_with(".partial.m4a"), "{}", name);
        }

        let path = first.to_path_buf();
        drop(first);
        assert!(!path.exists());
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_refuses_in_place_trim() {
        let runner = FfmpegRunner::new();
        let err = trim_to("talk.m4a", "talk.m4a", 10.0, "error", &runner)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::OutputIsInput(_)));
    }

    #[tokio::test]
    async fn test_missing_input() {
        let dir = tempfile::TempDir::new().unwrap();
        let runner = FfmpegRunner::new();
        let err = trim_to(
            dir.path().join("missing.m4a"),
            dir.path().join("out.m4a"),
            10.0,
            "error",
            &runner,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
