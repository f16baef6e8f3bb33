//! Candidate confirmation.
//!
//! A candidate is promoted to a [`ConfirmedSpike`] only if the windowed
//! loudness is still above threshold at every confirmation offset after its
//! start. A clap or a laugh rises and subsides; a noisy tail stays up.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::scanner::{Candidate, SpikeScanner};
use crate::window::RollingWindow;

/// Result of checking one confirmation offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum ConfirmCheck {
    Above { offset_secs: f64, level_db: f64 },
    Below { offset_secs: f64, level_db: f64 },
    /// No sample at or after `start + offset`.
    OutOfRange { offset_secs: f64 },
}

impl ConfirmCheck {
    pub fn is_above(&self) -> bool {
        matches!(self, ConfirmCheck::Above { .. })
    }
}

impl fmt::Display for ConfirmCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfirmCheck::Above {
                offset_secs,
                level_db,
            } => write!(f, "[✓] +{}s: {:.2}", offset_secs, level_db),
            ConfirmCheck::Below {
                offset_secs,
                level_db,
            } => write!(f, "[✗] +{}s: {:.2}", offset_secs, level_db),
            ConfirmCheck::OutOfRange { offset_secs } => {
                write!(f, "[✗] +{}s: past end of trace", offset_secs)
            }
        }
    }
}

/// Outcome of confirming one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    pub candidate: Candidate,
    /// Checks in offset order; stops at the first failure.
    pub checks: Vec<ConfirmCheck>,
}

impl Confirmation {
    pub fn is_confirmed(&self) -> bool {
        !self.checks.is_empty() && self.checks.iter().all(ConfirmCheck::is_above)
    }
}

/// A candidate that held above threshold at every confirmation offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedSpike {
    pub start_secs: f64,
    pub windowed_level_db: f64,
}

/// Checks candidates against the profile's confirmation offsets.
#[derive(Debug)]
pub struct ConfirmationEngine<'w, 'a> {
    window: &'w RollingWindow<'a>,
    threshold_db: f64,
    offsets_secs: &'w [f64],
}

impl<'w, 'a> ConfirmationEngine<'w, 'a> {
    pub fn new(window: &'w RollingWindow<'a>, threshold_db: f64, offsets_secs: &'w [f64]) -> Self {
        Self {
            window,
            threshold_db,
            offsets_secs,
        }
    }

    /// Check a single offset after `start_secs`.
    pub fn check(&self, start_secs: f64, offset_secs: f64) -> ConfirmCheck {
        let position = self.window.trace().index_at_or_after(start_secs + offset_secs);

        match position.and_then(|idx| self.window.mean_at(idx)) {
            Some(level_db) if level_db > self.threshold_db => ConfirmCheck::Above {
                offset_secs,
                level_db,
            },
            Some(level_db) => ConfirmCheck::Below {
                offset_secs,
                level_db,
            },
            None => ConfirmCheck::OutOfRange { offset_secs },
        }
    }

    /// Check every offset in order, stopping at the first failure.
    pub fn confirm(&self, candidate: Candidate) -> Confirmation {
        let mut checks = Vec::with_capacity(self.offsets_secs.len());

        for &offset in self.offsets_secs {
            let check = self.check(candidate.start_secs, offset);
            let passed = check.is_above();
            checks.push(check);
            if !passed {
                break;
            }
        }

        Confirmation { candidate, checks }
    }
}

/// Outcome of scanning a trace for the earliest confirmed spike.
#[derive(Debug, Clone, PartialEq)]
pub struct SpikeSearch {
    pub spike: Option<ConfirmedSpike>,
    pub candidates_examined: usize,
    pub candidates_rejected: usize,
}

/// Pull candidates until one is confirmed or the scanner is exhausted.
pub fn find_confirmed_spike(
    scanner: SpikeScanner<'_, '_>,
    engine: &ConfirmationEngine<'_, '_>,
) -> SpikeSearch {
    let mut examined = 0;

    for candidate in scanner {
        examined += 1;
        let confirmation = engine.confirm(candidate);

        trace!(
            start_secs = candidate.start_secs,
            windowed_level_db = candidate.windowed_level_db,
            checks = %confirmation
                .checks
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            "Candidate checked"
        );

        if confirmation.is_confirmed() {
            debug!(
                start_secs = candidate.start_secs,
                candidates_examined = examined,
                "Spike confirmed"
            );
            return SpikeSearch {
                spike: Some(ConfirmedSpike {
                    start_secs: candidate.start_secs,
                    windowed_level_db: candidate.windowed_level_db,
                }),
                candidates_examined: examined,
                candidates_rejected: examined - 1,
            };
        }
    }

    debug!(candidates_examined = examined, "No candidate confirmed");
    SpikeSearch {
        spike: None,
        candidates_examined: examined,
        candidates_rejected: examined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tailtrim_models::LoudnessTrace;

    fn trace(levels: &[f64]) -> LoudnessTrace {
        LoudnessTrace::from_pairs(levels.iter().enumerate().map(|(i, l)| (i as f64, *l))).unwrap()
    }

    fn candidate(start: usize) -> Candidate {
        Candidate {
            start_secs: start as f64,
            windowed_level_db: 0.0,
            trigger_index: start,
            start_index: start,
        }
    }

    #[test]
    fn test_all_offsets_must_pass() {
        let mut levels = vec![-30.0; 10];
        levels.extend(vec![0.0; 3]);
        levels.extend(vec![-30.0; 10]);
        let trace = trace(&levels);
        let window = RollingWindow::new(&trace, 1.0);
        let offsets = [2.0, 5.0];
        let engine = ConfirmationEngine::new(&window, -20.0, &offsets);

        let confirmation = engine.confirm(candidate(10));
        assert!(!confirmation.is_confirmed());
        assert_eq!(confirmation.checks.len(), 2);
        assert!(confirmation.checks[0].is_above());
        assert!(matches!(confirmation.checks[1], ConfirmCheck::Below { .. }));
    }

    #[test]
    fn test_offset_past_end_is_not_confirmed() {
        let levels = vec![0.0; 5];
        let trace = trace(&levels);
        let window = RollingWindow::new(&trace, 1.0);
        let offsets = [1.0, 10.0];
        let engine = ConfirmationEngine::new(&window, -20.0, &offsets);

        let confirmation = engine.confirm(candidate(0));
        assert!(!confirmation.is_confirmed());
        assert_eq!(
            confirmation.checks.last(),
            Some(&ConfirmCheck::OutOfRange { offset_secs: 10.0 })
        );
    }

    #[test]
    fn test_rejection_resumes_scanning() {
        // Transient at 5, sustained tail from 20
        let mut levels = vec![-30.0; 5];
        levels.push(0.0);
        levels.extend(vec![-30.0; 14]);
        levels.extend(vec![0.0; 20]);
        let trace = trace(&levels);
        let window = RollingWindow::new(&trace, 1.0);
        let offsets = [3.0, 6.0];
        let engine = ConfirmationEngine::new(&window, -20.0, &offsets);
        let scanner = SpikeScanner::new(&window, -20.0, 0.0);

        let search = find_confirmed_spike(scanner, &engine);
        assert_eq!(search.spike.map(|s| s.start_secs), Some(20.0));
        assert_eq!(search.candidates_examined, 2);
        assert_eq!(search.candidates_rejected, 1);
    }

    #[test]
    fn test_check_display() {
        let above = ConfirmCheck::Above {
            offset_secs: 5.0,
            level_db: -12.3,
        };
        assert_eq!(above.to_string(), "[✓] +5s: -12.30");
        assert_eq!(
            ConfirmCheck::OutOfRange { offset_secs: 25.0 }.to_string(),
            "[✗] +25s: past end of trace"
        );
    }
}
