/// How a temperature stage ended. Both are valid terminal outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// A stopping rule fired before the sweep budget ran out.
    Converged,
    /// The sweep budget was exhausted first.
    Unstabilized,
}

/// Per-stage stopping rules, maintained only by the coordinating worker.
///
/// Two independent conditions, either sufficient:
/// - the relative energy change `|dE| / |E_prev|` stays below `tolerance`
///   for `window` consecutive sweeps;
/// - a sweep accepts zero moves, for `window` consecutive sweeps.
///
/// A zero energy baseline makes the relative change 0 instead of dividing
/// by zero, so a flat-at-zero energy trace counts as stable.
pub struct StabilityTracker {
    tolerance: f64,
    window: usize,
    prev_energy: Option<f64>,
    stable_sweeps: usize,
    zero_move_sweeps: usize,
}

impl StabilityTracker {
    pub fn new(tolerance: f64, window: usize) -> Self {
        Self {
            tolerance,
            window,
            prev_energy: None,
            stable_sweeps: 0,
            zero_move_sweeps: 0,
        }
    }

    /// Record one finished sweep; returns `true` when the stage should stop.
    pub fn observe(&mut self, energy: f64, accepted_moves: usize) -> bool {
        if let Some(prev) = self.prev_energy {
            let relative = if prev == 0.0 {
                0.0
            } else {
                (energy - prev).abs() / prev.abs()
            };
            if relative < self.tolerance {
                self.stable_sweeps += 1;
            } else {
                self.stable_sweeps = 0;
            }
        }
        self.prev_energy = Some(energy);

        if accepted_moves == 0 {
            self.zero_move_sweeps += 1;
        } else {
            self.zero_move_sweeps = 0;
        }

        self.stable_sweeps >= self.window || self.zero_move_sweeps >= self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_stabilization() {
        let mut tracker = StabilityTracker::new(1e-10, 3);
        // first sweep has no baseline yet
        assert!(!tracker.observe(1.0, 5));
        assert!(!tracker.observe(1.0, 5));
        assert!(!tracker.observe(1.0, 5));
        assert!(tracker.observe(1.0, 5));
    }

    #[test]
    fn test_energy_change_resets_counter() {
        let mut tracker = StabilityTracker::new(1e-10, 2);
        assert!(!tracker.observe(1.0, 5));
        assert!(!tracker.observe(1.0, 5));
        // a real change resets the streak
        assert!(!tracker.observe(0.5, 5));
        assert!(!tracker.observe(0.5, 5));
        assert!(tracker.observe(0.5, 5));
    }

    #[test]
    fn test_acceptance_stagnation() {
        let mut tracker = StabilityTracker::new(1e-10, 3);
        assert!(!tracker.observe(1.0, 0));
        assert!(!tracker.observe(0.9, 0));
        assert!(tracker.observe(0.8, 0));

        let mut tracker = StabilityTracker::new(1e-10, 3);
        assert!(!tracker.observe(1.0, 0));
        assert!(!tracker.observe(0.9, 1)); // reset
        assert!(!tracker.observe(0.8, 0));
        assert!(!tracker.observe(0.7, 0));
        assert!(tracker.observe(0.6, 0));
    }

    #[test]
    fn test_zero_baseline_counts_as_stable() {
        let mut tracker = StabilityTracker::new(1e-10, 2);
        assert!(!tracker.observe(0.0, 5));
        assert!(!tracker.observe(0.0, 5));
        assert!(tracker.observe(0.0, 5));
    }
}
