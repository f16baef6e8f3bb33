//! Rising-edge spike scanner.
//!
//! The scanner walks window positions strictly after the skip region and
//! yields a [`Candidate`] only where the windowed mean crosses the
//! threshold from below:
//!
//! ```text
//!   level
//!     │              ┌──────────┐        ┌────────────
//!  thr├ ─ ─ ─ ─ ─ ─ ─│─ ─ ─ ─ ─ ─│─ ─ ─ ─ │─ ─ ─ ─ ─ ─
//!     │──────────────┘          └────────┘
//!     └──────────────▲───────────────────▲──────────► t
//!                candidate            candidate
//! ```
//!
//! One sustained event produces one candidate, not one per loud sample.
//! The scanner is a cursor: it never rewinds, and after a candidate is
//! rejected the caller simply keeps pulling from the same iterator.

use std::iter::FusedIterator;

use serde::{Deserialize, Serialize};

use crate::window::RollingWindow;

/// A rising edge of the windowed loudness above threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Offset of the first sample inside the triggering window that is
    /// itself above threshold.
    pub start_secs: f64,
    /// Windowed mean at the triggering position.
    pub windowed_level_db: f64,
    /// Sample index at which the windowed mean crossed the threshold.
    pub trigger_index: usize,
    /// Sample index of `start_secs`.
    pub start_index: usize,
}

/// Lazy iterator over [`Candidate`]s in increasing offset order.
#[derive(Debug)]
pub struct SpikeScanner<'w, 'a> {
    window: &'w RollingWindow<'a>,
    threshold_db: f64,
    cursor: usize,
    previous_above: bool,
}

impl<'w, 'a> SpikeScanner<'w, 'a> {
    /// Scan positions whose offset is strictly greater than `skip_start_secs`.
    pub fn new(window: &'w RollingWindow<'a>, threshold_db: f64, skip_start_secs: f64) -> Self {
        let cursor = window
            .trace()
            .index_after(skip_start_secs)
            .unwrap_or(window.len());

        Self {
            window,
            threshold_db,
            cursor,
            previous_above: false,
        }
    }

    /// Index of the next position to be examined.
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn threshold_db(&self) -> f64 {
        self.threshold_db
    }

    fn candidate_at(&self, trigger_index: usize, windowed_level_db: f64) -> Candidate {
        let samples = self.window.trace().samples();
        let end = self.window.window_end(trigger_index);

        let start_index = samples[trigger_index..end]
            .iter()
            .position(|s| s.level_db > self.threshold_db)
            .map_or(trigger_index, |p| trigger_index + p);

        Candidate {
            start_secs: samples[start_index].offset_secs,
            windowed_level_db,
            trigger_index,
            start_index,
        }
    }
}

impl Iterator for SpikeScanner<'_, '_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        while let Some(mean) = self.window.mean_at(self.cursor) {
            let index = self.cursor;
            self.cursor += 1;

            let above = mean > self.threshold_db;
            let rising = above && !self.previous_above;
            self.previous_above = above;

            if rising {
                return Some(self.candidate_at(index, mean));
            }
        }
        None
    }
}

impl FusedIterator for SpikeScanner<'_, '_> {}
