//! Cycle scheduling for periodic work driven from a single loop thread.
//!
//! `CycleSchedule` rearms from the moment a cycle finishes, not from when it
//! was due. A cycle that runs longer than its interval therefore delays the
//! next one instead of stacking overlapping runs.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct CycleSchedule {
    interval: Duration,
    next_due: Instant,
}

impl CycleSchedule {
    /// A schedule that is due immediately.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: Instant::now(),
        }
    }

    pub fn starting_at(interval: Duration, first_due: Instant) -> Self {
        Self {
            interval,
            next_due: first_due,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next_due
    }

    /// Rearm after a cycle completed at `now`.
    pub fn completed(&mut self, now: Instant) {
        self.next_due = now + self.interval;
    }

    /// How long until the next cycle, zero if already due.
    pub fn time_until_due(&self, now: Instant) -> Duration {
        self.next_due.saturating_duration_since(now)
    }
}
