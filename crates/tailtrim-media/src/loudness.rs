//! Momentary loudness extraction with ffmpeg's `ebur128` filter.
//!
//! The filter logs one line per ~0.1 s of audio:
//!
//! ```text
//! [Parsed_ebur128_0 @ 0x5581] t: 12.3     TARGET:-23 LUFS    M: -24.6 S: -25.1 ...
//! ```
//!
//! Only `t` (seconds) and `M` (momentary loudness, LUFS) are kept.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tailtrim_models::{LoudnessSample, LoudnessTrace};
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

const EBUR128_PREFIX: &str = "[Parsed_ebur128_0";

static EBUR128_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"t:\s*(\d+\.?\d*)\s*.*M:\s*(-?\d+\.?\d*)").expect("ebur128 pattern is valid")
});

/// Run the loudness filter over `path` and build its trace.
pub async fn extract_loudness_trace(
    path: impl AsRef<Path>,
    runner: &FfmpegRunner,
) -> MediaResult<LoudnessTrace> {
    let path = path.as_ref();

    let cmd = FfmpegCommand::analyze(path)
        .log_level("info")
        .output_arg("-vn")
        .audio_filter("ebur128=peak=true");

    let output = runner.run(&cmd).await?;
    let samples = parse_ebur128_output(&output.stderr);

    if samples.is_empty() {
        return Err(MediaError::NoLoudnessData(path.to_path_buf()));
    }

    debug!(
        path = %path.display(),
        samples = samples.len(),
        "Extracted loudness samples"
    );

    Ok(LoudnessTrace::new(samples)?)
}

/// Parse `ebur128` log lines into ordered samples.
///
/// Samples that are non-finite or do not advance in time are dropped so the
/// result always satisfies the trace invariant.
pub fn parse_ebur128_output(stderr: &str) -> Vec<LoudnessSample> {
    let mut samples: Vec<LoudnessSample> = Vec::new();

    for line in stderr.lines() {
        if !line.starts_with(EBUR128_PREFIX) {
            continue;
        }
        let Some(caps) = EBUR128_LINE.captures(line) else {
            continue;
        };
        let (Ok(t), Ok(m)) = (caps[1].parse::<f64>(), caps[2].parse::<f64>()) else {
            continue;
        };
        if !t.is_finite() || !m.is_finite() {
            continue;
        }
        if samples.last().is_some_and(|prev| t <= prev.offset_secs) {
            continue;
        }
        samples.push(LoudnessSample::new(t, m));
    }

    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'talk.m4a':
[Parsed_ebur128_0 @ 0x55d1c1a0] t: 0.1      TARGET:-23 LUFS    M:-120.7 S:-120.7     I: -70.0 LUFS       LRA:   0.0 LU  FTPK: -inf dBFS  TPK: -inf dBFS
[Parsed_ebur128_0 @ 0x55d1c1a0] t: 0.2      TARGET:-23 LUFS    M: -31.5 S:-120.7     I: -31.5 LUFS       LRA:   0.0 LU  FTPK: -12.1 dBFS  TPK: -12.1 dBFS
[Parsed_ebur128_0 @ 0x55d1c1a0] t: 0.2      TARGET:-23 LUFS    M: -30.0 S:-120.7     I: -31.5 LUFS       LRA:   0.0 LU  FTPK: -12.1 dBFS  TPK: -12.1 dBFS
[Parsed_ebur128_0 @ 0x55d1c1a0] t: 0.3      TARGET:-23 LUFS    M: -28.25 S:-120.7     I: -30.2 LUFS       LRA:   0.0 LU  FTPK: -10.0 dBFS  TPK: -10.0 dBFS
[Parsed_ebur128_0 @ 0x55d1c1a0] Summary:
";

    #[test]
    fn test_parse_ebur128_lines() {
        let samples = parse_ebur128_output(LOG);
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], LoudnessSample::new(0.1, -120.7));
        assert_eq!(samples[1], LoudnessSample::new(0.2, -31.5));
        assert_eq!(samples[2], LoudnessSample::new(0.3, -28.25));
    }

    #[test]
    fn test_parse_ignores_foreign_lines() {
        let samples = parse_ebur128_output("t: 1.0 M: -20.0\n[aac @ 0x1] t: 2.0 M: -20.0\n");
        assert!(samples.is_empty());
    }

    #[test]
    fn test_parsed_samples_form_valid_trace() {
        let trace = LoudnessTrace::new(parse_ebur128_output(LOG)).unwrap();
        assert_eq!(trace.last_offset(), Some(0.3));
    }
}
