//! Loudness-spike detection for trimming noisy recording tails.
//!
//! Given a recording's momentary loudness trace, find the point where
//! content ends and a sustained noisy tail (applause, chatter, shuffling)
//! begins. Detection is a pure function: no I/O, no shared state, and the
//! same inputs always produce the same [`TrimDecision`].
//!
//! # Pipeline
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ Loudness     │───►│ Profile      │───►│ Baseline     │
//! │ trace        │    │ (by duration)│    │ (trimmed avg)│
//! └──────────────┘    └──────────────┘    └──────────────┘
//!                                                │
//!                                                ▼
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ Trim         │◄───│ Confirmation │◄───│ Spike        │
//! │ decision     │    │ (offsets)    │    │ scanner      │
//! └──────────────┘    └──────────────┘    └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use tailtrim_detect::{detect, DetectorConfig};
//!
//! let config = DetectorConfig::default();
//! config.validate()?;
//! let detection = detect(&trace, duration_secs, &config)?;
//! println!("{}", detection.decision.rationale);
//! ```

pub mod baseline;
pub mod confirm;
pub mod decision;
pub mod error;
pub mod profile;
pub mod scanner;
pub mod window;

use serde::{Deserialize, Serialize};
use tailtrim_models::LoudnessTrace;
use tracing::{debug, info};

pub use baseline::{estimate_baseline, Baseline, MIN_BASELINE_SAMPLES};
pub use confirm::{
    find_confirmed_spike, ConfirmCheck, Confirmation, ConfirmationEngine, ConfirmedSpike,
    SpikeSearch,
};
pub use decision::{decide, file_too_short_decision, TrimDecision, TrimPolicy, Verdict};
pub use error::{DetectError, DetectResult};
pub use profile::{
    Profile, ProfileKind, ProfileOverrides, ProfileSelector, DEFAULT_MEDIUM_MAX_SECS,
    DEFAULT_SHORT_MAX_SECS,
};
pub use scanner::{Candidate, SpikeScanner};
pub use window::RollingWindow;

/// Everything the detector needs besides the trace itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub profiles: ProfileSelector,
    pub policy: TrimPolicy,
}

impl DetectorConfig {
    pub fn new(profiles: ProfileSelector, policy: TrimPolicy) -> Self {
        Self { profiles, policy }
    }

    pub fn validate(&self) -> DetectResult<()> {
        self.profiles.validate()?;
        self.policy.validate()
    }
}

/// Full result of one detection run.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Resolved profile; `None` when the file was too short to analyse.
    pub profile: Option<Profile>,
    pub baseline: Option<Baseline>,
    pub candidates_examined: usize,
    pub decision: TrimDecision,
}

/// Run the full pipeline on one trace.
///
/// `total_duration_secs` is the recording's probed duration; the trace may
/// end slightly before or after it. Errors are
/// [`DetectError::Configuration`] for an unusable resolved profile and
/// [`DetectError::InsufficientData`] when the baseline window is too sparse.
pub fn detect(
    trace: &LoudnessTrace,
    total_duration_secs: f64,
    config: &DetectorConfig,
) -> DetectResult<Detection> {
    let policy = &config.policy;

    if total_duration_secs < policy.min_file_secs {
        let decision = file_too_short_decision(total_duration_secs, policy);
        info!(
            duration_secs = total_duration_secs,
            min_file_secs = policy.min_file_secs,
            "File below minimum duration, not analysed"
        );
        return Ok(Detection {
            profile: None,
            baseline: None,
            candidates_examined: 0,
            decision,
        });
    }

    let profile = config.profiles.resolve(total_duration_secs)?;
    debug!(
        profile = %profile.kind,
        delta_db = profile.min_loudness_delta_db,
        window_secs = profile.window_secs,
        skip_start_secs = profile.skip_start_secs,
        "Profile resolved"
    );

    let baseline = estimate_baseline(trace, &profile)?;
    let threshold_db = profile.threshold_db(baseline.level_db);
    debug!(
        baseline_db = baseline.level_db,
        threshold_db,
        samples = baseline.sample_count,
        "Baseline estimated"
    );

    let window = RollingWindow::new(trace, profile.window_secs);
    let scanner = SpikeScanner::new(&window, threshold_db, profile.skip_start_secs);
    let engine = ConfirmationEngine::new(&window, threshold_db, &profile.confirm_offsets_secs);
    let search = find_confirmed_spike(scanner, &engine);

    let decision = decide(search.spike, total_duration_secs, policy);
    info!(
        profile = %profile.kind,
        verdict = ?decision.verdict,
        candidates = search.candidates_examined,
        "{}",
        decision.rationale
    );

    Ok(Detection {
        profile: Some(profile),
        baseline: Some(baseline),
        candidates_examined: search.candidates_examined,
        decision,
    })
}
