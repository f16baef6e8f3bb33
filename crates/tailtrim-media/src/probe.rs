//! FFprobe audio information.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::command::FfmpegRunner;
use crate::error::{MediaError, MediaResult};

/// Audio file information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Audio codec
    pub codec: String,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u32,
    /// File size in bytes
    pub size: u64,
    /// Bitrate in bits/second
    pub bitrate: u64,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
}

/// Probe an audio file for information.
///
/// ffprobe runs under `runner`, so its timeout applies.
pub async fn probe_audio(path: impl AsRef<Path>, runner: &FfmpegRunner) -> MediaResult<AudioInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let stdout = runner.probe_json(path).await?;
    parse_probe_output(path, &stdout)
}

/// Interpret ffprobe's JSON for `path`.
fn parse_probe_output(path: &Path, stdout: &[u8]) -> MediaResult<AudioInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let audio_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "audio")
        .ok_or_else(|| MediaError::NoAudioStream(path.to_path_buf()))?;

    let duration = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| MediaError::InvalidMedia(path.to_path_buf()))?;

    let size = probe
        .format
        .size
        .as_deref()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    let bitrate = probe
        .format
        .bit_rate
        .as_deref()
        .and_then(|b| b.parse::<u64>().ok())
        .unwrap_or(0);

    let sample_rate = audio_stream
        .sample_rate
        .as_deref()
        .and_then(|r| r.parse::<u32>().ok())
        .unwrap_or(0);

    Ok(AudioInfo {
        duration,
        codec: audio_stream.codec_name.clone().unwrap_or_default(),
        sample_rate,
        channels: audio_stream.channels.unwrap_or(0),
        size,
        bitrate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const AAC_PROBE: &str = r#"{
        "streams": [
            {"index": 0, "codec_name": "aac", "codec_type": "audio", "sample_rate": "48000", "channels": 2}
        ],
        "format": {"filename": "talk.m4a", "duration": "3725.120000", "size": "59602944", "bit_rate": "128000"}
    }"#;

    #[test]
    fn test_parse_audio_probe() {
        let info = parse_probe_output(Path::new("talk.m4a"), AAC_PROBE.as_bytes()).unwrap();
        assert!((info.duration - 3725.12).abs() < 1e-9);
        assert_eq!(info.codec, "aac");
        assert_eq!(info.sample_rate, 48000);
        assert_eq!(info.channels, 2);
        assert_eq!(info.bitrate, 128000);
    }

    #[test]
    fn test_video_only_rejected() {
        let json = r#"{"streams":[{"codec_type":"video","codec_name":"h264"}],"format":{"duration":"10.0"}}"#;
        let err = parse_probe_output(Path::new("clip.mp4"), json.as_bytes()).unwrap_err();
        assert!(matches!(err, MediaError::NoAudioStream(_)));
    }

    #[test]
    fn test_missing_duration_rejected() {
        let json = r#"{"streams":[{"codec_type":"audio"}],"format":{}}"#;
        let err = parse_probe_output(Path::new("broken.m4a"), json.as_bytes()).unwrap_err();
        assert!(matches!(err, MediaError::InvalidMedia(_)));
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let err = probe_audio("/nonexistent/tailtrim/talk.m4a", &FfmpegRunner::new())
            .await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
