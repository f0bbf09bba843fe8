//! Progress accounting over the task matrix.

/// Completed/total counters with integer-percent reporting.
///
/// Both counters are fixed at run start and owned by the worker thread;
/// percent values are floored, so the emitted sequence is non-decreasing and
/// reaches exactly 100 when every task is accounted for.
#[derive(Debug)]
pub struct ProgressTracker {
    completed: usize,
    total: usize,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        debug_assert!(total > 0, "a run always has at least one task");
        Self {
            completed: 0,
            total,
        }
    }

    /// Account for one task outcome (including skips and failures).
    pub fn advance(&mut self) -> u8 {
        self.advance_by(1)
    }

    /// Account for `n` tasks in one step; used by the symbol-not-found fast
    /// path to advance a whole timeframe group at once.
    pub fn advance_by(&mut self, n: usize) -> u8 {
        self.completed += n;
        self.percent()
    }

    /// Floored integer percentage, clamped to 100.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        (self.completed.min(self.total) * 100 / self.total) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn percent_floors() {
        let mut p = ProgressTracker::new(3);
        assert_eq!(p.advance(), 33);
        assert_eq!(p.advance(), 66);
        assert_eq!(p.advance(), 100);
    }

    #[test]
    fn group_step_matches_single_steps() {
        let mut singles = ProgressTracker::new(9);
        let mut grouped = ProgressTracker::new(9);
        for _ in 0..3 {
            singles.advance();
        }
        assert_eq!(grouped.advance_by(3), singles.percent());
    }

    #[test]
    fn overshoot_is_clamped() {
        let mut p = ProgressTracker::new(2);
        p.advance_by(5);
        assert_eq!(p.percent(), 100);
    }

    proptest! {
        #[test]
        fn sequence_is_monotonic_and_ends_at_100(
            steps in proptest::collection::vec(1usize..4, 1..30),
        ) {
            let total: usize = steps.iter().sum();
            let mut tracker = ProgressTracker::new(total);
            let mut last = 0u8;
            for step in steps {
                let pct = tracker.advance_by(step);
                prop_assert!(pct >= last);
                last = pct;
            }
            prop_assert_eq!(last, 100);
        }
    }
}
