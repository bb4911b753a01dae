//! Spindle/VFD capability (§4.12, §9: "macro/inheritance-heavy spindle/VFD
//! hierarchy ... replaced by a single `Spindle` capability trait").

use fluidnc_common::error::Error;
use fluidnc_common::modal::SpindleState;

/// A piecewise-linear map from a requested speed (RPM, or percent for a
/// laser) to a device-specific numeric output (PWM duty, DAC counts, VFD
/// register value). Points must be sorted ascending by `input`; evaluation
/// clamps to the map's endpoints rather than extrapolating.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedMap {
    points: Vec<(f64, f64)>,
}

impl SpeedMap {
    /// `points` is `(requested_speed, device_output)`, ascending by the
    /// first element. A single point behaves as a constant map.
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        debug_assert!(
            points.windows(2).all(|w| w[0].0 <= w[1].0),
            "speed map points must be sorted by input"
        );
        Self { points }
    }

    /// Linear speed (RPM) straight through to device units, 1:1.
    pub fn identity(max: f64) -> Self {
        Self::new(vec![(0.0, 0.0), (max, max)])
    }

    pub fn evaluate(&self, requested: f64) -> f64 {
        let Some(&(lo_in, lo_out)) = self.points.first() else {
            return 0.0;
        };
        let Some(&(hi_in, hi_out)) = self.points.last() else {
            return 0.0;
        };
        if requested <= lo_in {
            return lo_out;
        }
        if requested >= hi_in {
            return hi_out;
        }
        for pair in self.points.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            if requested >= x0 && requested <= x1 {
                if (x1 - x0).abs() < f64::EPSILON {
                    return y0;
                }
                let t = (requested - x0) / (x1 - x0);
                return y0 + t * (y1 - y0);
            }
        }
        hi_out
    }
}

/// A turning device driven by `M3`/`M4`/`M5` and a speed word. Default
/// methods cover devices with no tool-change hook and no laser-style rate
/// adjustment, so a minimal relay-driven spindle needs only `set_state`,
/// `get_state`, and `speed_map`.
pub trait Spindle: Send {
    fn set_state(&mut self, state: SpindleState, speed: f64) -> Result<(), Error>;
    fn get_state(&self) -> (SpindleState, f64);
    fn speed_map(&self) -> &SpeedMap;

    /// Lasers report true: PWM duty tracks feed rate, not just the speed word.
    fn is_rate_adjusted(&self) -> bool {
        false
    }

    /// Spindle-specific tool-change hook (§9's M6 ATC→macro→hook order;
    /// this is the "hook" leg). `pre_select` is true for an M6 T<n> that
    /// only stages the next tool without swapping it in yet.
    fn tool_change(&mut self, _new_tool: u32, _pre_select: bool) -> Result<(), Error> {
        Ok(())
    }

    /// Milliseconds the planner must hold in `SysSuspend` after spin-up
    /// before motion may resume.
    fn spin_up_delay_ms(&self) -> u32 {
        0
    }

    fn spin_down_delay_ms(&self) -> u32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_map_passes_through() {
        let map = SpeedMap::identity(1000.0);
        assert_eq!(map.evaluate(500.0), 500.0);
        assert_eq!(map.evaluate(2000.0), 1000.0);
        assert_eq!(map.evaluate(-10.0), 0.0);
    }

    #[test]
    fn interpolates_between_points() {
        let map = SpeedMap::new(vec![(0.0, 0.0), (1000.0, 255.0), (24000.0, 255.0)]);
        assert!((map.evaluate(500.0) - 127.5).abs() < 1e-9);
        assert_eq!(map.evaluate(24000.0), 255.0);
    }
}
