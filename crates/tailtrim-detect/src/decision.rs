//! Turning a confirmed (or absent) spike into a trim verdict.

use serde::{Deserialize, Serialize};
use tailtrim_models::format_hms;

use crate::confirm::ConfirmedSpike;
use crate::error::{DetectError, DetectResult};

/// Minimum-duration policies and the user's cut offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimPolicy {
    /// Signed shift applied to the detected spike before cutting.
    pub user_offset_secs: f64,
    /// Do not trim when less than this would be removed.
    pub min_segment_secs: f64,
    /// Files shorter than this are not analysed.
    pub min_file_secs: f64,
}

impl Default for TrimPolicy {
    fn default() -> Self {
        Self {
            user_offset_secs: 0.0,
            min_segment_secs: 3.0 * 60.0,
            min_file_secs: 10.0 * 60.0,
        }
    }
}

impl TrimPolicy {
    pub fn with_user_offset_secs(mut self, secs: f64) -> Self {
        self.user_offset_secs = secs;
        self
    }

    pub fn with_min_segment_secs(mut self, secs: f64) -> Self {
        self.min_segment_secs = secs;
        self
    }

    pub fn with_min_file_secs(mut self, secs: f64) -> Self {
        self.min_file_secs = secs;
        self
    }

    pub fn validate(&self) -> DetectResult<()> {
        if !self.user_offset_secs.is_finite() {
            return Err(DetectError::configuration(format!(
                "Trim offset must be a finite number (got {})",
                self.user_offset_secs
            )));
        }
        if !(self.min_segment_secs.is_finite() && self.min_segment_secs >= 0.0) {
            return Err(DetectError::configuration(format!(
                "Minimum segment duration must be non-negative (got {}s)",
                self.min_segment_secs
            )));
        }
        if !(self.min_file_secs.is_finite() && self.min_file_secs >= 0.0) {
            return Err(DetectError::configuration(format!(
                "Minimum file duration must be non-negative (got {}s)",
                self.min_file_secs
            )));
        }
        Ok(())
    }
}

/// Terminal verdict for one recording.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Trim { at_secs: f64 },
    NoSpikeFound,
    SkippedTooShort { remaining_secs: f64 },
    SkippedFileTooShort,
}

impl Verdict {
    pub fn cut_point(&self) -> Option<f64> {
        match self {
            Verdict::Trim { at_secs } => Some(*at_secs),
            _ => None,
        }
    }
}

/// The detector's output: a verdict plus why it was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimDecision {
    pub verdict: Verdict,
    /// Start of the confirmed spike, if one was found.
    pub spike_secs: Option<f64>,
    /// `spike + user offset` before clamping.
    pub requested_cut_secs: Option<f64>,
    /// Whether the requested cut fell outside `[0, total]`.
    pub clamped: bool,
    pub rationale: String,
}

/// Verdict for a file below the minimum file duration.
pub fn file_too_short_decision(total_duration_secs: f64, policy: &TrimPolicy) -> TrimDecision {
    TrimDecision {
        verdict: Verdict::SkippedFileTooShort,
        spike_secs: None,
        requested_cut_secs: None,
        clamped: false,
        rationale: format!(
            "Duration {} is below the minimum file duration {}",
            format_hms(total_duration_secs),
            format_hms(policy.min_file_secs)
        ),
    }
}

/// Combine a spike search result with the trim policy.
pub fn decide(
    spike: Option<ConfirmedSpike>,
    total_duration_secs: f64,
    policy: &TrimPolicy,
) -> TrimDecision {
    if total_duration_secs < policy.min_file_secs {
        return file_too_short_decision(total_duration_secs, policy);
    }

    let Some(spike) = spike else {
        return TrimDecision {
            verdict: Verdict::NoSpikeFound,
            spike_secs: None,
            requested_cut_secs: None,
            clamped: false,
            rationale: "No sustained loudness spike was confirmed".to_string(),
        };
    };

    let requested = spike.start_secs + policy.user_offset_secs;
    let cut = requested.clamp(0.0, total_duration_secs);
    let clamped = cut != requested;
    let remaining = total_duration_secs - cut;

    let mut rationale = format!(
        "Spike confirmed at {}, offset {:+}s",
        format_hms(spike.start_secs),
        policy.user_offset_secs
    );
    if clamped {
        rationale.push_str(&format!(
            "; requested cut {} clamped to {}",
            format_hms(requested),
            format_hms(cut)
        ));
    }

    let verdict = if remaining < policy.min_segment_secs {
        rationale.push_str(&format!(
            "; only {} would be removed (minimum {})",
            format_hms(remaining),
            format_hms(policy.min_segment_secs)
        ));
        Verdict::SkippedTooShort {
            remaining_secs: remaining,
        }
    } else {
        rationale.push_str(&format!("; cut at {}", format_hms(cut)));
        Verdict::Trim { at_secs: cut }
    };

    TrimDecision {
        verdict,
        spike_secs: Some(spike.start_secs),
        requested_cut_secs: Some(requested),
        clamped,
        rationale,
    }
}
