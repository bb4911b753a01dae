//! Per-line motion metadata the planner attaches to each block: the feed
//! word, spindle speed, and the handful of flags that change how a block is
//! planned but aren't part of the position itself.

/// Everything `plan_line` (spec component C4) needs from the line beyond the
/// target position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineData {
    /// Commanded feed, mm/min, or the G93 inverse-time value (minutes) when
    /// `inverse_time` is set.
    pub feed_rate: f64,
    /// G93 inverse-time mode: `feed_rate` is the time in minutes to
    /// complete the move, not a rate.
    pub inverse_time: bool,
    /// Spindle speed in effect for this block, for report/coordination
    /// purposes; the planner itself doesn't act on it beyond carrying it.
    pub spindle_speed: f64,
    /// Set on a hidden compensation block the backlash pre-filter (C5)
    /// inserts ahead of a direction reversal. Such a block is never
    /// reported to the operator as a queued line.
    pub is_backlash: bool,
    /// System motions (homing, probing) bypass the job-stack / parameter
    /// bookkeeping a line from the program buffer would otherwise get.
    pub is_system_motion: bool,
}

impl Default for LineData {
    fn default() -> Self {
        Self {
            feed_rate: 0.0,
            inverse_time: false,
            spindle_speed: 0.0,
            is_backlash: false,
            is_system_motion: false,
        }
    }
}

impl LineData {
    pub fn new(feed_rate: f64) -> Self {
        Self {
            feed_rate,
            ..Self::default()
        }
    }

    pub fn with_spindle(mut self, speed: f64) -> Self {
        self.spindle_speed = speed;
        self
    }

    pub fn inverse_time(mut self) -> Self {
        self.inverse_time = true;
        self
    }

    pub fn system_motion(mut self) -> Self {
        self.is_system_motion = true;
        self
    }

    pub(crate) fn backlash(mut self) -> Self {
        self.is_backlash = true;
        self
    }
}
