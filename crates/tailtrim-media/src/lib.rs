//! FFmpeg CLI wrapper for loudness analysis and lossless trimming.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and a runner with timeouts
//! - Audio probing via `ffprobe`
//! - Momentary loudness traces from the `ebur128` filter
//! - Stream-copy tail trimming
//! - Input discovery, output naming and conflict handling

pub mod command;
pub mod discovery;
pub mod error;
pub mod fs_utils;
pub mod loudness;
pub mod output;
pub mod probe;
pub mod trim;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegOutput, FfmpegRunner};
pub use discovery::{discover_inputs, Discovery, DEFAULT_EXTENSION};
pub use error::{MediaError, MediaResult};
pub use fs_utils::ensure_dir_writable;
pub use loudness::{extract_loudness_trace, parse_ebur128_output};
pub use output::{
    resolve_output_path, ConflictPolicy, NamingScheme, OutputReservations, OutputTarget,
    DEFAULT_NAMING_SCHEME,
};
pub use probe::{probe_audio, AudioInfo};
pub use trim::trim_to;
