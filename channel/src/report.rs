//! Status and modal reports (§4.9, §6): `<...>`-framed periodic status,
//! `$G`-style modal dumps, throttled to `report_interval_ms` (minimum
//! 50 ms) and only emitted while something worth reporting has changed.

use fluidnc_common::modal::{Coolant, Distance, FeedRateMode, ModalState, MotionMode, Plane, SpindleState, Units};

/// Everything one status report line needs, gathered by the caller from
/// the state machine, planner, and parameter store.
pub struct StatusSnapshot<'a> {
    pub state_name: &'a str,
    pub mpos: &'a [f64],
    /// Work-coordinate offset, included only when it changed since the
    /// last report (§4.9).
    pub wco: Option<&'a [f64]>,
    pub feed: f64,
    pub spindle_speed: f64,
    /// Pre-rendered active-pin letters, e.g. `"PDHRS"` for probe/door/hold/reset/cyclestart.
    pub pins: &'a str,
    pub feed_override: i32,
    pub rapid_override: i32,
    pub spindle_override: i32,
    pub planner_blocks: usize,
}

fn format_axes(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{v:.3}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Render one `<...>`-framed status report.
pub fn format_status(s: &StatusSnapshot) -> String {
    let mut out = format!("<{}|MPos:{}", s.state_name, format_axes(s.mpos));
    if let Some(wco) = s.wco {
        out.push_str(&format!("|WCO:{}", format_axes(wco)));
    }
    out.push_str(&format!("|FS:{:.0},{:.0}", s.feed, s.spindle_speed));
    if !s.pins.is_empty() {
        out.push_str(&format!("|Pn:{}", s.pins));
    }
    out.push_str(&format!(
        "|Ov:{},{},{}",
        s.feed_override, s.rapid_override, s.spindle_override
    ));
    out.push_str(&format!("|Bf:{}", s.planner_blocks));
    out.push('>');
    out
}

/// Render the `$G`-style modal report (§6: "`$G` modal reports").
pub fn format_modal_report(modal: &ModalState) -> String {
    let motion = match modal.motion {
        MotionMode::Seek => "G0",
        MotionMode::Linear => "G1",
        MotionMode::CwArc => "G2",
        MotionMode::CcwArc => "G3",
        MotionMode::ProbeToward => "G38.2",
        MotionMode::ProbeTowardNoError => "G38.3",
        MotionMode::ProbeAway => "G38.4",
        MotionMode::ProbeAwayNoError => "G38.5",
        MotionMode::None => "G80",
    };
    let plane = match modal.plane {
        Plane::Xy => "G17",
        Plane::Zx => "G18",
        Plane::Yz => "G19",
    };
    let distance = match modal.distance {
        Distance::Absolute => "G90",
        Distance::Incremental => "G91",
    };
    let feed_mode = match modal.feed_rate_mode {
        FeedRateMode::UnitsPerMinute => "G94",
        FeedRateMode::InverseTime => "G93",
    };
    let units = match modal.units {
        Units::Millimeters => "G21",
        Units::Inches => "G20",
    };
    let coord = match modal.coord_select.wcs_number() {
        Some(1) => "G54",
        Some(2) => "G55",
        Some(3) => "G56",
        Some(4) => "G57",
        Some(5) => "G58",
        Some(6) => "G59",
        Some(7) => "G59.1",
        Some(8) => "G59.2",
        Some(9) => "G59.3",
        _ => "G54",
    };
    let spindle = match modal.spindle {
        SpindleState::Disable => "M5",
        SpindleState::Cw => "M3",
        SpindleState::Ccw => "M4",
    };
    let coolant = if modal.coolant.is_empty() {
        "M9".to_string()
    } else {
        let mut parts = Vec::new();
        if modal.coolant.contains(Coolant::FLOOD) {
            parts.push("M8");
        }
        if modal.coolant.contains(Coolant::MIST) {
            parts.push("M7");
        }
        parts.join(" ")
    };
    format!("[GC:{motion} {coord} {plane} {distance} {feed_mode} {units} {spindle} {coolant}]")
}

/// Throttles how often a channel emits a periodic status report.
pub struct ReportScheduler {
    interval_ms: u32,
    last_emit_ms: u64,
    dirty: bool,
}

/// Minimum throttle, even if configured lower (§4.9: "minimum 50 ms").
pub const MIN_REPORT_INTERVAL_MS: u32 = 50;

impl ReportScheduler {
    pub fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms: if interval_ms == 0 { 0 } else { interval_ms.max(MIN_REPORT_INTERVAL_MS) },
            last_emit_ms: 0,
            dirty: true,
        }
    }

    /// Something worth reporting changed (probe, state, pins, WCO).
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Decide whether to emit now, given the caller's monotonic clock and
    /// whether motion is currently active (motion alone is reportable even
    /// without an explicit dirty mark).
    pub fn should_emit(&mut self, now_ms: u64, motion_active: bool) -> bool {
        if self.interval_ms == 0 {
            return false;
        }
        if !motion_active && !self.dirty {
            return false;
        }
        if now_ms.saturating_sub(self.last_emit_ms) < self.interval_ms as u64 {
            return false;
        }
        self.last_emit_ms = now_ms;
        self.dirty = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_report_is_angle_bracket_framed() {
        let snap = StatusSnapshot {
            state_name: "Idle",
            mpos: &[0.0, 0.0, 0.0],
            wco: None,
            feed: 0.0,
            spindle_speed: 0.0,
            pins: "",
            feed_override: 100,
            rapid_override: 100,
            spindle_override: 100,
            planner_blocks: 0,
        };
        let line = format_status(&snap);
        assert!(line.starts_with('<') && line.ends_with('>'));
        assert!(line.contains("MPos:0.000,0.000,0.000"));
    }

    #[test]
    fn scheduler_throttles_below_interval() {
        let mut sched = ReportScheduler::new(100);
        assert!(sched.should_emit(0, true));
        assert!(!sched.should_emit(50, true));
        assert!(sched.should_emit(100, true));
    }

    #[test]
    fn scheduler_suppresses_idle_reports_without_a_dirty_mark() {
        let mut sched = ReportScheduler::new(50);
        assert!(sched.should_emit(0, false));
        assert!(!sched.should_emit(1000, false));
        sched.mark_dirty();
        assert!(sched.should_emit(1000, false));
    }

    #[test]
    fn interval_below_minimum_is_clamped() {
        let sched = ReportScheduler::new(10);
        assert_eq!(sched.interval_ms, MIN_REPORT_INTERVAL_MS);
    }

    #[test]
    fn zero_interval_disables_reporting() {
        let mut sched = ReportScheduler::new(0);
        assert!(!sched.should_emit(0, true));
    }
}
