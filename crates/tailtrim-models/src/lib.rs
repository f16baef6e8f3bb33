//! Shared data models for tailtrim.
//!
//! This crate provides Serde-serializable types for:
//! - Loudness traces produced by the media layer and consumed by the detector
//! - Per-file batch reports
//! - Timestamp formatting for logs and reports

pub mod report;
pub mod timestamp;
pub mod trace;

// Re-export common types
pub use report::{BatchSummary, FileOutcome, FileReport};
pub use timestamp::{format_hms, parse_timestamp, TimestampError};
pub use trace::{LoudnessSample, LoudnessTrace, TraceError};
