//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Where ffmpeg writes its result.
#[derive(Debug, Clone, PartialEq)]
enum Destination {
    File(PathBuf),
    /// `-f null -`: decode and filter only.
    Null,
}

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output destination
    output: Destination,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a command writing to `output`.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self::with_output(input, Destination::File(output.as_ref().to_path_buf()))
    }

    /// Create a command that discards its output (`-f null -`).
    pub fn analyze(input: impl AsRef<Path>) -> Self {
        Self::with_output(input, Destination::Null)
    }

    fn with_output(input: impl AsRef<Path>, output: Destination) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output,
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Add an output argument (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Stop writing output after `seconds`.
    pub fn duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format!("{:.3}", seconds))
    }

    /// Set audio filter.
    pub fn audio_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-af").output_arg(filter)
    }

    /// Copy all streams without re-encoding.
    pub fn codec_copy(self) -> Self {
        self.output_arg("-c").output_arg("copy")
    }

    /// Whether to pass `-y`.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-hide_banner".to_string());
        args.push("-nostats".to_string());

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.iter().cloned());

        match &self.output {
            Destination::File(path) => args.push(path.to_string_lossy().to_string()),
            Destination::Null => {
                args.push("-f".to_string());
                args.push("null".to_string());
                args.push("-".to_string());
            }
        }

        args
    }
}

/// Captured diagnostic output of a finished ffmpeg run.
#[derive(Debug, Clone, Default)]
pub struct FfmpegOutput {
    pub stderr: String,
}

/// Runner for FFmpeg and FFprobe with an optional timeout.
///
/// Every external process of a file's pipeline goes through the same
/// runner, so a hung tool never holds a worker slot past the timeout.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run an FFmpeg command, capturing stderr.
    ///
    /// A non-zero exit is classified by [`MediaError::from_tool_output`].
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<FfmpegOutput> {
        let ffmpeg = check_ffmpeg()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut command = Command::new(ffmpeg);
        command.args(&args).stdout(Stdio::null());

        let output = self.wait_for("FFmpeg", command).await?;
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            Ok(FfmpegOutput { stderr })
        } else {
            debug!(
                exit_code = ?output.status.code(),
                stderr = %stderr.trim(),
                "FFmpeg exited with non-zero status"
            );
            Err(MediaError::from_tool_output(cmd.input(), &stderr))
        }
    }

    /// Run `ffprobe` on `path` and return its JSON description.
    pub async fn probe_json(&self, path: &Path) -> MediaResult<Vec<u8>> {
        let ffprobe = check_ffprobe()?;

        let mut command = Command::new(ffprobe);
        command
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .stdout(Stdio::piped());

        let output = self.wait_for("FFprobe", command).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(path = %path.display(), stderr = %stderr.trim(), "FFprobe failed");
            return Err(MediaError::from_tool_output(path, &stderr));
        }

        Ok(output.stdout)
    }

    /// Spawn `command` and collect its output, killing it on timeout.
    async fn wait_for(&self, tool: &str, mut command: Command) -> MediaResult<Output> {
        let child = command
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        match self.timeout_secs {
            Some(secs) => {
                match tokio::time::timeout(Duration::from_secs(secs), child.wait_with_output()).await {
                    Ok(result) => Ok(result?),
                    Err(_) => {
                        // Dropping the wait future kills the child
                        warn!("{} timed out after {} seconds, killing process", tool, secs);
                        Err(MediaError::Timeout(secs))
                    }
                }
            }
            None => Ok(child.wait_with_output().await?),
        }
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_command_args() {
        let cmd = FfmpegCommand::new("in.m4a", "out.m4a")
            .log_level("warning")
            .duration(3600.0)
            .codec_copy();

        let args = cmd.build_args();
        assert_eq!(
            args,
            vec![
                "-y", "-hide_banner", "-nostats", "-v", "warning", "-i", "in.m4a", "-t",
                "3600.000", "-c", "copy", "out.m4a",
            ]
        );
    }

    #[test]
    fn test_analyze_command_writes_to_null() {
        let args = FfmpegCommand::analyze("talk.m4a")
            .log_level("info")
            .audio_filter("ebur128=peak=true")
            .build_args();

        let tail: Vec<&str> = args.iter().rev().take(3).rev().map(String::as_str).collect();
        assert_eq!(tail, vec!["-f", "null", "-"]);
        assert!(args.windows(2).any(|w| w[0] == "-af" && w[1] == "ebur128=peak=true"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_hung_process() {
        let runner = FfmpegRunner::new().with_timeout(1);
        let mut command = Command::new("sleep");
        command.arg("30");

        let started = std::time::Instant::now();
        let err = runner.wait_for("sleep", command).await.unwrap_err();
        assert!(matches!(err, MediaError::Timeout(1)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_overwrite_flag_optional() {
        let args = FfmpegCommand::new("a.m4a", "b.m4a").overwrite(false).build_args();
        assert!(!args.contains(&"-y".to_string()));
    }
}
