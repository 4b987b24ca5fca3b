// src/task/progress.rs

//! Heuristic progress estimate.
//!
//! The toolkit reports no real progress, so the estimate is a function of the
//! number of liveness polls so far: a linear ramp to 50% over the first
//! `ramp_polls` polls, then the remaining 50% spread linearly over the polls
//! left until `ceiling_polls`. Most operations finish within the ramp; the
//! slow tail keeps long rasterizations visibly alive.

/// Progress share reached at the end of the ramp.
pub const RAMP_PERCENT: f32 = 50.0;

/// Upper bound while a task is still running; 100 is reserved for success.
pub const RUNNING_CAP: f32 = 99.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressCurve {
    ramp_polls: u64,
    ceiling_polls: u64,
}

impl ProgressCurve {
    pub fn new(ramp_polls: u64, ceiling_polls: u64) -> Self {
        let ramp_polls = ramp_polls.max(2);
        Self {
            ramp_polls,
            ceiling_polls: ceiling_polls.max(ramp_polls),
        }
    }

    pub fn ramp_polls(&self) -> u64 {
        self.ramp_polls
    }

    pub fn ceiling_polls(&self) -> u64 {
        self.ceiling_polls
    }

    /// Estimated progress in percent after `poll` completed polls.
    ///
    /// Non-decreasing in `poll` and never above [`RUNNING_CAP`].
    pub fn at(&self, poll: u64) -> f32 {
        // Poll 0 is 0%, poll `ramp_polls - 1` is the last poll of the ramp.
        let ramp_end = self.ramp_polls - 1;
        let percent = if poll <= ramp_end {
            f64::from(RAMP_PERCENT) * poll as f64 / ramp_end as f64
        } else {
            let tail = self.ceiling_polls.saturating_sub(ramp_end).max(1);
            let past = (poll - ramp_end).min(tail);
            f64::from(RAMP_PERCENT) + f64::from(100.0 - RAMP_PERCENT) * past as f64 / tail as f64
        };
        (percent as f32).min(RUNNING_CAP)
    }
}

impl Default for ProgressCurve {
    fn default() -> Self {
        Self::new(51, 3600)
    }
}
