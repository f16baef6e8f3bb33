//! Baseline loudness estimation.
//!
//! The baseline is the "normal content" level of a recording, measured
//! over `[skip_start, skip_start + analysis_window]`. A 10% symmetric
//! trimmed mean keeps a single applause break inside the analysis window
//! from dragging the baseline up.

use serde::{Deserialize, Serialize};
use tailtrim_models::LoudnessTrace;

use crate::error::{DetectError, DetectResult};
use crate::profile::Profile;

/// Fewer samples than this in the analysis window means the file is undetectable.
pub const MIN_BASELINE_SAMPLES: usize = 3;

/// Fraction trimmed from each end before averaging.
const TRIM_FRACTION: f64 = 0.1;

/// Normal-content loudness for one recording.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub level_db: f64,
    /// Samples observed in the analysis window (before trimming).
    pub sample_count: usize,
    pub window_start_secs: f64,
    pub window_end_secs: f64,
}

/// Estimate the baseline from the profile's analysis window.
pub fn estimate_baseline(trace: &LoudnessTrace, profile: &Profile) -> DetectResult<Baseline> {
    let window_start_secs = profile.skip_start_secs;
    let window_end_secs = profile.skip_start_secs + profile.analysis_window_secs;

    let samples = trace.range_inclusive(window_start_secs, window_end_secs);
    if samples.len() < MIN_BASELINE_SAMPLES {
        return Err(DetectError::InsufficientData {
            found: samples.len(),
            required: MIN_BASELINE_SAMPLES,
            window_start_secs,
            window_end_secs,
        });
    }

    let mut levels: Vec<f64> = samples.iter().map(|s| s.level_db).collect();

    Ok(Baseline {
        level_db: trimmed_mean(&mut levels),
        sample_count: samples.len(),
        window_start_secs,
        window_end_secs,
    })
}

/// Symmetric trimmed mean; never trims below [`MIN_BASELINE_SAMPLES`] values.
///
/// `levels` must hold at least [`MIN_BASELINE_SAMPLES`] values and is sorted in place.
fn trimmed_mean(levels: &mut [f64]) -> f64 {
    levels.sort_by(f64::total_cmp);

    let n = levels.len();
    let max_trim = n.saturating_sub(MIN_BASELINE_SAMPLES) / 2;
    let trim = ((n as f64 * TRIM_FRACTION).floor() as usize).min(max_trim);

    let kept = &levels[trim..n - trim];
    kept.iter().sum::<f64>() / kept.len() as f64
}
