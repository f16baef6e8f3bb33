//! Loudness trace types.
//!
//! A trace is the time-ordered sequence of momentary loudness measurements
//! for one recording. The media layer produces it (ffmpeg `ebur128`) and the
//! detector consumes it; neither side mutates it after construction.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a trace violates its ordering invariant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TraceError {
    #[error("Sample {index} has a non-finite offset or level")]
    NonFinite { index: usize },

    #[error("Sample {index} at {offset_secs:.3}s does not follow the previous sample at {previous_secs:.3}s")]
    NotIncreasing {
        index: usize,
        offset_secs: f64,
        previous_secs: f64,
    },

    #[error("Sample {index} has a negative offset ({offset_secs:.3}s)")]
    NegativeOffset { index: usize, offset_secs: f64 },
}

/// A single momentary loudness measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoudnessSample {
    /// Offset from the start of the recording in seconds.
    pub offset_secs: f64,
    /// Momentary loudness (LUFS / dB-like units).
    pub level_db: f64,
}

impl LoudnessSample {
    pub fn new(offset_secs: f64, level_db: f64) -> Self {
        Self {
            offset_secs,
            level_db,
        }
    }
}

/// Ordered loudness samples for one recording.
///
/// Offsets are finite, non-negative and strictly increasing.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LoudnessTrace {
    samples: Vec<LoudnessSample>,
}

impl LoudnessTrace {
    /// Build a trace, validating the ordering invariant.
    pub fn new(samples: Vec<LoudnessSample>) -> Result<Self, TraceError> {
        let mut previous: Option<f64> = None;

        for (index, sample) in samples.iter().enumerate() {
            if !sample.offset_secs.is_finite() || !sample.level_db.is_finite() {
                return Err(TraceError::NonFinite { index });
            }
            if sample.offset_secs < 0.0 {
                return Err(TraceError::NegativeOffset {
                    index,
                    offset_secs: sample.offset_secs,
                });
            }
            if let Some(previous_secs) = previous {
                if sample.offset_secs <= previous_secs {
                    return Err(TraceError::NotIncreasing {
                        index,
                        offset_secs: sample.offset_secs,
                        previous_secs,
                    });
                }
            }
            previous = Some(sample.offset_secs);
        }

        Ok(Self { samples })
    }

    /// Build a trace from `(offset, level)` pairs.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, TraceError>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(offset, level)| LoudnessSample::new(offset, level))
                .collect(),
        )
    }

    pub fn samples(&self) -> &[LoudnessSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Offset of the last sample, if any.
    pub fn last_offset(&self) -> Option<f64> {
        self.samples.last().map(|s| s.offset_secs)
    }

    /// Index of the first sample whose offset is `>= offset_secs`.
    pub fn index_at_or_after(&self, offset_secs: f64) -> Option<usize> {
        let idx = self
            .samples
            .partition_point(|s| s.offset_secs < offset_secs);
        (idx < self.samples.len()).then_some(idx)
    }

    /// Index of the first sample whose offset is strictly `> offset_secs`.
    pub fn index_after(&self, offset_secs: f64) -> Option<usize> {
        let idx = self
            .samples
            .partition_point(|s| s.offset_secs <= offset_secs);
        (idx < self.samples.len()).then_some(idx)
    }

    /// Samples whose offsets fall inside `[start_secs, end_secs]`.
    pub fn range_inclusive(&self, start_secs: f64, end_secs: f64) -> &[LoudnessSample] {
        let start = self.samples.partition_point(|s| s.offset_secs < start_secs);
        let end = self.samples.partition_point(|s| s.offset_secs <= end_secs);
        if start >= end {
            return &[];
        }
        &self.samples[start..end]
    }
}

impl<'de> Deserialize<'de> for LoudnessTrace {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            samples: Vec<LoudnessSample>,
        }

        let raw = Raw::deserialize(deserializer)?;
        LoudnessTrace::new(raw.samples).map_err(serde::de::Error::custom)
    }
}
