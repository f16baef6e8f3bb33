//! Parameter profiles and duration-based profile selection.
//!
//! Recordings of very different lengths need different sensitivity: a
//! ten-minute talk and a three-hour lecture do not share a sensible skip
//! region or confirmation horizon. Three built-in profiles cover short,
//! medium and long recordings; every field can be overridden per profile.
//!
//! | Profile | Δ dB | window | confirm offsets | skip start | analysis window |
//! |---------|------|--------|-----------------|------------|-----------------|
//! | short   | 12   | 3 s    | 3 s, 6 s        | 1 min      | 4 min           |
//! | medium  | 11   | 5 s    | 4 s, 8 s        | 5 min      | 10 min          |
//! | long    | 10   | 7 s    | 5 s, 10 s, 25 s | 30 min     | 20 min          |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DetectError, DetectResult};

/// Default upper bound (exclusive) of the short band: 30 minutes.
pub const DEFAULT_SHORT_MAX_SECS: f64 = 30.0 * 60.0;

/// Default upper bound (exclusive) of the medium band: 90 minutes.
pub const DEFAULT_MEDIUM_MAX_SECS: f64 = 90.0 * 60.0;

/// Cap applied to the "band must span three skip regions" rule.
const MIN_BAND_FLOOR_SECS: f64 = 10.0 * 60.0;

/// Which built-in parameter set applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    Short,
    Medium,
    Long,
}

impl ProfileKind {
    pub const ALL: [ProfileKind; 3] = [ProfileKind::Short, ProfileKind::Medium, ProfileKind::Long];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileKind::Short => "short",
            ProfileKind::Medium => "medium",
            ProfileKind::Long => "long",
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileKind {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" => Ok(ProfileKind::Short),
            "medium" => Ok(ProfileKind::Medium),
            "long" => Ok(ProfileKind::Long),
            other => Err(DetectError::configuration(format!(
                "Unknown profile '{}': expected short, medium or long",
                other
            ))),
        }
    }
}

/// A fully resolved parameter set for one detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub kind: ProfileKind,
    /// How far above the baseline the windowed loudness must rise (dB).
    pub min_loudness_delta_db: f64,
    /// Width of the sliding average window in seconds.
    pub window_secs: f64,
    /// Offsets after a candidate's start that must also be loud, ascending.
    pub confirm_offsets_secs: Vec<f64>,
    /// Leading region excluded from scanning (seconds).
    pub skip_start_secs: f64,
    /// Length of the baseline region that starts at `skip_start_secs`.
    pub analysis_window_secs: f64,
}

impl Profile {
    /// Built-in defaults for a profile kind.
    pub fn defaults(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::Short => Self {
                kind,
                min_loudness_delta_db: 12.0,
                window_secs: 3.0,
                confirm_offsets_secs: vec![3.0, 6.0],
                skip_start_secs: 60.0,
                analysis_window_secs: 4.0 * 60.0,
            },
            ProfileKind::Medium => Self {
                kind,
                min_loudness_delta_db: 11.0,
                window_secs: 5.0,
                confirm_offsets_secs: vec![4.0, 8.0],
                skip_start_secs: 5.0 * 60.0,
                analysis_window_secs: 10.0 * 60.0,
            },
            ProfileKind::Long => Self {
                kind,
                min_loudness_delta_db: 10.0,
                window_secs: 7.0,
                confirm_offsets_secs: vec![5.0, 10.0, 25.0],
                skip_start_secs: 30.0 * 60.0,
                analysis_window_secs: 20.0 * 60.0,
            },
        }
    }

    /// Loudness a window must exceed to count as elevated.
    pub fn threshold_db(&self, baseline_db: f64) -> f64 {
        baseline_db + self.min_loudness_delta_db
    }

    /// Check field ranges independent of any recording.
    pub fn validate(&self) -> DetectResult<()> {
        let name = self.kind;

        if !(self.min_loudness_delta_db.is_finite() && self.min_loudness_delta_db > 0.0) {
            return Err(DetectError::configuration(format!(
                "[{}] loudness delta must be a positive number (got {})",
                name, self.min_loudness_delta_db
            )));
        }
        if !(self.window_secs.is_finite() && self.window_secs > 0.0) {
            return Err(DetectError::configuration(format!(
                "[{}] window must be positive (got {}s)",
                name, self.window_secs
            )));
        }
        if !(self.skip_start_secs.is_finite() && self.skip_start_secs >= 0.0) {
            return Err(DetectError::configuration(format!(
                "[{}] skip start must be non-negative (got {}s)",
                name, self.skip_start_secs
            )));
        }
        if !(self.analysis_window_secs.is_finite() && self.analysis_window_secs > 0.0) {
            return Err(DetectError::configuration(format!(
                "[{}] analysis window must be positive (got {}s)",
                name, self.analysis_window_secs
            )));
        }
        validate_confirm_offsets(name, &self.confirm_offsets_secs)
    }
}

fn validate_confirm_offsets(name: ProfileKind, offsets: &[f64]) -> DetectResult<()> {
    if offsets.is_empty() {
        return Err(DetectError::configuration(format!(
            "[{}] at least one confirmation offset is required",
            name
        )));
    }
    if let Some(bad) = offsets.iter().find(|o| !(o.is_finite() && **o > 0.0)) {
        return Err(DetectError::configuration(format!(
            "[{}] confirmation offsets must be positive (got {})",
            name, bad
        )));
    }
    if offsets.windows(2).any(|pair| pair[1] <= pair[0]) {
        return Err(DetectError::configuration(format!(
            "[{}] confirmation offsets must be strictly increasing without duplicates (got {:?})",
            name, offsets
        )));
    }
    Ok(())
}

/// Field-level overrides for one profile. `None` keeps the default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileOverrides {
    pub min_loudness_delta_db: Option<f64>,
    pub window_secs: Option<f64>,
    pub confirm_offsets_secs: Option<Vec<f64>>,
    pub skip_start_secs: Option<f64>,
    pub analysis_window_secs: Option<f64>,
}

impl ProfileOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge these overrides into `base`, touching only the supplied fields.
    pub fn apply_to(&self, base: Profile) -> Profile {
        Profile {
            kind: base.kind,
            min_loudness_delta_db: self
                .min_loudness_delta_db
                .unwrap_or(base.min_loudness_delta_db),
            window_secs: self.window_secs.unwrap_or(base.window_secs),
            confirm_offsets_secs: self
                .confirm_offsets_secs
                .clone()
                .unwrap_or(base.confirm_offsets_secs),
            skip_start_secs: self.skip_start_secs.unwrap_or(base.skip_start_secs),
            analysis_window_secs: self
                .analysis_window_secs
                .unwrap_or(base.analysis_window_secs),
        }
    }

    pub fn with_min_loudness_delta_db(mut self, db: f64) -> Self {
        self.min_loudness_delta_db = Some(db);
        self
    }

    pub fn with_window_secs(mut self, secs: f64) -> Self {
        self.window_secs = Some(secs);
        self
    }

    pub fn with_confirm_offsets_secs(mut self, offsets: Vec<f64>) -> Self {
        self.confirm_offsets_secs = Some(offsets);
        self
    }

    pub fn with_skip_start_secs(mut self, secs: f64) -> Self {
        self.skip_start_secs = Some(secs);
        self
    }

    pub fn with_analysis_window_secs(mut self, secs: f64) -> Self {
        self.analysis_window_secs = Some(secs);
        self
    }
}

/// Maps a recording duration to a resolved [`Profile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSelector {
    /// Durations strictly below this use the short profile.
    pub short_max_secs: f64,
    /// Durations strictly below this (and not short) use the medium profile.
    pub medium_max_secs: f64,
    /// Use this profile regardless of duration.
    pub forced: Option<ProfileKind>,
    pub short: ProfileOverrides,
    pub medium: ProfileOverrides,
    pub long: ProfileOverrides,
}

impl Default for ProfileSelector {
    fn default() -> Self {
        Self {
            short_max_secs: DEFAULT_SHORT_MAX_SECS,
            medium_max_secs: DEFAULT_MEDIUM_MAX_SECS,
            forced: None,
            short: ProfileOverrides::default(),
            medium: ProfileOverrides::default(),
            long: ProfileOverrides::default(),
        }
    }
}

impl ProfileSelector {
    /// Builder-style setter for the band edges.
    pub fn with_bands(mut self, short_max_secs: f64, medium_max_secs: f64) -> Self {
        self.short_max_secs = short_max_secs;
        self.medium_max_secs = medium_max_secs;
        self
    }

    /// Builder-style setter forcing one profile for every duration.
    pub fn with_forced(mut self, kind: ProfileKind) -> Self {
        self.forced = Some(kind);
        self
    }

    /// Builder-style setter for one profile's overrides.
    pub fn with_overrides(mut self, kind: ProfileKind, overrides: ProfileOverrides) -> Self {
        *self.overrides_mut(kind) = overrides;
        self
    }

    pub fn overrides(&self, kind: ProfileKind) -> &ProfileOverrides {
        match kind {
            ProfileKind::Short => &self.short,
            ProfileKind::Medium => &self.medium,
            ProfileKind::Long => &self.long,
        }
    }

    fn overrides_mut(&mut self, kind: ProfileKind) -> &mut ProfileOverrides {
        match kind {
            ProfileKind::Short => &mut self.short,
            ProfileKind::Medium => &mut self.medium,
            ProfileKind::Long => &mut self.long,
        }
    }

    /// Band for a duration; lower bounds are inclusive.
    pub fn kind_for(&self, total_duration_secs: f64) -> ProfileKind {
        if let Some(kind) = self.forced {
            return kind;
        }
        if total_duration_secs < self.short_max_secs {
            ProfileKind::Short
        } else if total_duration_secs < self.medium_max_secs {
            ProfileKind::Medium
        } else {
            ProfileKind::Long
        }
    }

    /// Defaults for `kind` merged with its overrides.
    pub fn profile(&self, kind: ProfileKind) -> Profile {
        self.overrides(kind).apply_to(Profile::defaults(kind))
    }

    /// Validate band edges and every merged profile.
    pub fn validate(&self) -> DetectResult<()> {
        if !(self.short_max_secs.is_finite() && self.short_max_secs > 0.0) {
            return Err(DetectError::configuration(format!(
                "Short band upper bound must be positive (got {}s)",
                self.short_max_secs
            )));
        }
        if !(self.medium_max_secs.is_finite() && self.short_max_secs < self.medium_max_secs) {
            return Err(DetectError::configuration(format!(
                "Short band upper bound ({}s) must be strictly less than medium band upper bound ({}s)",
                self.short_max_secs, self.medium_max_secs
            )));
        }

        for kind in ProfileKind::ALL {
            self.profile(kind).validate()?;
        }

        let short = self.profile(ProfileKind::Short);
        let min_short = (short.skip_start_secs * 3.0).min(MIN_BAND_FLOOR_SECS);
        if self.short_max_secs < min_short {
            return Err(DetectError::configuration(format!(
                "Short band upper bound must be >= min(3 x short skip start, 10 min) = {}s (got {}s)",
                min_short, self.short_max_secs
            )));
        }

        let medium = self.profile(ProfileKind::Medium);
        let min_medium = (medium.skip_start_secs * 3.0).min(MIN_BAND_FLOOR_SECS);
        if self.medium_max_secs < min_medium {
            return Err(DetectError::configuration(format!(
                "Medium band upper bound must be >= min(3 x medium skip start, 10 min) = {}s (got {}s)",
                min_medium, self.medium_max_secs
            )));
        }

        let long = self.profile(ProfileKind::Long);
        if self.medium_max_secs <= long.skip_start_secs + MIN_BAND_FLOOR_SECS {
            return Err(DetectError::configuration(format!(
                "Medium band upper bound ({}s) must exceed long skip start + 10 min ({}s)",
                self.medium_max_secs,
                long.skip_start_secs + MIN_BAND_FLOOR_SECS
            )));
        }

        Ok(())
    }

    /// Resolve the profile for a recording of `total_duration_secs`.
    ///
    /// Fails when the duration is not a positive number or when the
    /// resolved skip region covers the whole recording.
    pub fn resolve(&self, total_duration_secs: f64) -> DetectResult<Profile> {
        if !(total_duration_secs.is_finite() && total_duration_secs > 0.0) {
            return Err(DetectError::configuration(format!(
                "Recording duration must be positive (got {}s)",
                total_duration_secs
            )));
        }

        let profile = self.profile(self.kind_for(total_duration_secs));
        profile.validate()?;

        if profile.skip_start_secs >= total_duration_secs {
            return Err(DetectError::configuration(format!(
                "[{}] skip start ({}s) is not shorter than the recording ({:.1}s)",
                profile.kind, profile.skip_start_secs, total_duration_secs
            )));
        }

        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries() {
        let selector = ProfileSelector::default();
        assert_eq!(selector.kind_for(0.5), ProfileKind::Short);
        assert_eq!(selector.kind_for(29.0 * 60.0 + 59.0), ProfileKind::Short);
        assert_eq!(selector.kind_for(30.0 * 60.0), ProfileKind::Medium);
        assert_eq!(selector.kind_for(89.0 * 60.0 + 59.0), ProfileKind::Medium);
        assert_eq!(selector.kind_for(90.0 * 60.0), ProfileKind::Long);
        assert_eq!(selector.kind_for(10.0 * 3600.0), ProfileKind::Long);
    }

    #[test]
    fn test_forced_profile_ignores_duration() {
        let selector = ProfileSelector::default().with_forced(ProfileKind::Long);
        assert_eq!(selector.kind_for(120.0), ProfileKind::Long);
    }

    #[test]
    fn test_defaults_match_table() {
        let long = Profile::defaults(ProfileKind::Long);
        assert_eq!(long.min_loudness_delta_db, 10.0);
        assert_eq!(long.window_secs, 7.0);
        assert_eq!(long.confirm_offsets_secs, vec![5.0, 10.0, 25.0]);
        assert_eq!(long.skip_start_secs, 1800.0);

        let short = Profile::defaults(ProfileKind::Short);
        assert_eq!(short.confirm_offsets_secs, vec![3.0, 6.0]);
        assert_eq!(short.skip_start_secs, 60.0);
    }

    #[test]
    fn test_override_merge_is_field_local() {
        let selector = ProfileSelector::default().with_overrides(
            ProfileKind::Medium,
            ProfileOverrides::default().with_min_loudness_delta_db(15.0),
        );

        let merged = selector.profile(ProfileKind::Medium);
        let defaults = Profile::defaults(ProfileKind::Medium);

        assert_eq!(merged.min_loudness_delta_db, 15.0);
        assert_eq!(merged.window_secs, defaults.window_secs);
        assert_eq!(merged.confirm_offsets_secs, defaults.confirm_offsets_secs);
        assert_eq!(merged.skip_start_secs, defaults.skip_start_secs);
        assert_eq!(merged.analysis_window_secs, defaults.analysis_window_secs);

        // Other profiles untouched
        assert_eq!(selector.profile(ProfileKind::Short), Profile::defaults(ProfileKind::Short));
    }

    #[test]
    fn test_skip_start_beyond_duration_rejected() {
        let selector = ProfileSelector::default().with_overrides(
            ProfileKind::Short,
            ProfileOverrides::default().with_skip_start_secs(600.0),
        );

        let err = selector.resolve(600.0).unwrap_err();
        assert!(matches!(err, DetectError::Configuration(_)));
        assert!(selector.resolve(601.0).is_ok());
    }

    #[test]
    fn test_invalid_duration_rejected() {
        let selector = ProfileSelector::default();
        assert!(selector.resolve(0.0).is_err());
        assert!(selector.resolve(f64::NAN).is_err());
    }

    #[test]
    fn test_confirm_offsets_validation() {
        let mut profile = Profile::defaults(ProfileKind::Short);
        profile.confirm_offsets_secs = vec![3.0, 3.0];
        assert!(profile.validate().is_err());

        profile.confirm_offsets_secs = vec![6.0, 3.0];
        assert!(profile.validate().is_err());

        profile.confirm_offsets_secs = vec![];
        assert!(profile.validate().is_err());

        profile.confirm_offsets_secs = vec![0.0, 3.0];
        assert!(profile.validate().is_err());

        profile.confirm_offsets_secs = vec![1.0, 2.5];
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_selector_validation() {
        assert!(ProfileSelector::default().validate().is_ok());

        // Inverted bands
        let inverted = ProfileSelector::default().with_bands(5400.0, 1800.0);
        assert!(inverted.validate().is_err());

        // Short band narrower than three skip regions (and under 10 min)
        let narrow = ProfileSelector::default().with_bands(120.0, 5400.0);
        assert!(narrow.validate().is_err());

        // Medium band must leave room for the long skip region
        let cramped = ProfileSelector::default().with_bands(1800.0, 2400.0);
        assert!(cramped.validate().is_err());
    }

    #[test]
    fn test_profile_kind_parsing() {
        assert_eq!("Medium".parse::<ProfileKind>().unwrap(), ProfileKind::Medium);
        assert!("huge".parse::<ProfileKind>().is_err());
        assert_eq!(ProfileKind::Long.to_string(), "long");
    }
}
