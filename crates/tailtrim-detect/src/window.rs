//! Forward sliding-window loudness averages.
//!
//! The window at sample `i` covers every sample with offset in
//! `[t_i, t_i + window)`. It always contains sample `i` itself, so windows
//! near the end of the trace simply average fewer samples.

use tailtrim_models::LoudnessTrace;

/// Windowed means over a trace, answered in `O(log n)` from prefix sums.
#[derive(Debug)]
pub struct RollingWindow<'a> {
    trace: &'a LoudnessTrace,
    window_secs: f64,
    /// `prefix[k]` is the sum of the first `k` levels.
    prefix: Vec<f64>,
}

impl<'a> RollingWindow<'a> {
    pub fn new(trace: &'a LoudnessTrace, window_secs: f64) -> Self {
        let mut prefix = Vec::with_capacity(trace.len() + 1);
        prefix.push(0.0);

        let mut running = 0.0;
        for sample in trace.samples() {
            running += sample.level_db;
            prefix.push(running);
        }

        Self {
            trace,
            window_secs,
            prefix,
        }
    }

    pub fn trace(&self) -> &'a LoudnessTrace {
        self.trace
    }

    pub fn window_secs(&self) -> f64 {
        self.window_secs
    }

    pub fn len(&self) -> usize {
        self.trace.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trace.is_empty()
    }

    /// Exclusive end index of the window starting at sample `index`.
    pub fn window_end(&self, index: usize) -> usize {
        let samples = self.trace.samples();
        let limit = samples[index].offset_secs + self.window_secs;
        let end = index + samples[index..].partition_point(|s| s.offset_secs < limit);
        // A window always holds its own sample, even for degenerate widths
        end.max(index + 1)
    }

    /// Mean level of the window starting at sample `index`.
    ///
    /// Returns `None` when `index` is out of bounds.
    pub fn mean_at(&self, index: usize) -> Option<f64> {
        if index >= self.trace.len() {
            return None;
        }
        let end = self.window_end(index);
        let sum = self.prefix[end] - self.prefix[index];
        Some(sum / (end - index) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_window_mean() {
        let trace =
            LoudnessTrace::from_pairs([(0.0, -30.0), (1.0, -20.0), (2.0, -10.0), (3.0, 0.0)]).unwrap();
        let window = RollingWindow::new(&trace, 2.0);

        // [0, 2) holds samples 0 and 1
        assert_eq!(window.window_end(0), 2);
        assert_eq!(window.mean_at(0), Some(-25.0));
        assert_eq!(window.mean_at(1), Some(-15.0));
        assert_eq!(window.mean_at(2), Some(-5.0));
    }

    #[test]
    fn test_partial_window_at_end() {
        let trace = LoudnessTrace::from_pairs([(0.0, -30.0), (1.0, -20.0)]).unwrap();
        let window = RollingWindow::new(&trace, 10.0);

        assert_eq!(window.mean_at(1), Some(-20.0));
        assert_eq!(window.mean_at(2), None);
    }
}
