//! Backlash pre-filter (spec component C5): inserts a hidden compensation
//! move ahead of a direction reversal so mechanical lost-motion doesn't show
//! up as a dimensional error. One instance tracks per-axis direction state
//! across every call to `plan_line`.

use fluidnc_common::axis::MachineConfig;

use crate::line_data::LineData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Neutral,
    Positive,
    Negative,
}

#[derive(Debug, Clone, Copy)]
struct AxisBacklash {
    prev_target: f64,
    prev_direction: Direction,
    enabled: bool,
}

impl Default for AxisBacklash {
    fn default() -> Self {
        Self {
            prev_target: 0.0,
            prev_direction: Direction::Neutral,
            enabled: true,
        }
    }
}

/// Per-axis reversal tracker. A fresh filter assumes the machine starts at
/// the origin with no established direction, matching `backlash_ini`.
pub struct BacklashFilter {
    axes: Vec<AxisBacklash>,
}

/// What the caller should enqueue, in order, to apply backlash compensation
/// for this move: an optional hidden correction block first, then the move
/// the caller already intended to make.
pub struct BacklashPlan {
    /// Target for a hidden compensation block, if a reversal needs one.
    pub correction_target: Option<Vec<f64>>,
}

impl BacklashFilter {
    pub fn new(axis_count: usize) -> Self {
        Self {
            axes: vec![AxisBacklash::default(); axis_count],
        }
    }

    /// Mirrors `backlash_Compensate_befor_target`: for each axis, detect
    /// whether this move reverses the previous direction, and if the axis
    /// has nonzero configured backlash, compute the hidden correction
    /// target that takes up the lost motion before the real move starts.
    pub fn compensate_before_target(
        &mut self,
        target: &[f64],
        machine: &MachineConfig,
    ) -> BacklashPlan {
        let mut needed = false;
        let mut correction = vec![0.0; target.len()];

        for (i, axis_state) in self.axes.iter_mut().enumerate().take(target.len()) {
            let backlash_mm = machine.axes.get(i).map(|a| a.backlash_mm()).unwrap_or(0.0);

            if target[i] > axis_state.prev_target {
                if axis_state.prev_direction == Direction::Negative {
                    axis_state.enabled = true;
                    if backlash_mm > 0.0 {
                        needed = true;
                    }
                } else {
                    axis_state.enabled = false;
                }
                axis_state.prev_direction = Direction::Positive;
            } else if target[i] < axis_state.prev_target {
                if axis_state.prev_direction == Direction::Positive {
                    axis_state.enabled = true;
                    if backlash_mm > 0.0 {
                        needed = true;
                    }
                } else {
                    axis_state.enabled = false;
                }
                axis_state.prev_direction = Direction::Negative;
            } else {
                axis_state.enabled = false;
            }

            correction[i] = if axis_state.enabled {
                match axis_state.prev_direction {
                    Direction::Positive => axis_state.prev_target + backlash_mm,
                    _ => axis_state.prev_target - backlash_mm,
                }
            } else {
                axis_state.prev_target
            };

            axis_state.prev_target = target[i];
        }

        BacklashPlan {
            correction_target: if needed { Some(correction) } else { None },
        }
    }

    /// `backlash_Reset_after_probe`: re-seed `prev_target` from the
    /// position the probe actually stopped at, without touching direction.
    pub fn reset_after_probe(&mut self, mpos: &[f64]) {
        for (state, &pos) in self.axes.iter_mut().zip(mpos) {
            state.prev_target = pos;
        }
    }

    /// `backlash_Reset_for_homing`: seed direction/position from the
    /// approach or pulloff leg of a homing cycle, for each axis
    /// participating in `homing_mask`.
    pub fn reset_for_homing(
        &mut self,
        approach: bool,
        homing_mask: &[bool],
        machine: &MachineConfig,
        mpos: &[f64],
    ) {
        for (i, state) in self.axes.iter_mut().enumerate() {
            let Some(axis) = machine.axes.get(i) else {
                continue;
            };
            let Some(homing) = axis.homing else { continue };
            if !homing_mask.get(i).copied().unwrap_or(false) {
                continue;
            }
            let t_pos = mpos.get(i).copied().unwrap_or(state.prev_target);
            if t_pos != state.prev_target {
                state.prev_direction = match (approach, homing.positive_direction) {
                    (true, true) => Direction::Positive,
                    (true, false) => Direction::Negative,
                    (false, true) => Direction::Negative,
                    (false, false) => Direction::Positive,
                };
                state.prev_target = t_pos;
            }
        }
    }
}

/// A hidden backlash block carries the caller's line data verbatim except
/// that it's flagged so the interpreter never surfaces it as a queued line.
pub fn backlash_line_data(pl_data: LineData) -> LineData {
    pl_data.backlash()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluidnc_common::axis::{AxisConfig, AxisId, BacklashConfig, KinematicsKind};

    fn machine_with_backlash(distance_mm: f64) -> MachineConfig {
        let axis = |id| AxisConfig {
            id,
            steps_per_mm: [80.0, 0.0],
            motor_count: 1,
            max_rate_mm_per_min: 5000.0,
            acceleration_mm_per_min2: 200.0,
            max_travel_mm: 300.0,
            homing: None,
            backlash: Some(BacklashConfig { distance_mm }),
        };
        MachineConfig {
            name: "t".into(),
            axes: vec![axis(AxisId::X), axis(AxisId::Y)],
            kinematics: KinematicsKind::Cartesian,
            junction_deviation_mm: 0.01,
            arc_tolerance_mm: 0.002,
            report_interval_ms: 200,
            planner_buffer_capacity: 32,
        }
    }

    #[test]
    fn first_move_needs_no_correction() {
        let machine = machine_with_backlash(0.1);
        let mut filter = BacklashFilter::new(2);
        let plan = filter.compensate_before_target(&[10.0, 0.0], &machine);
        assert!(plan.correction_target.is_none());
    }

    #[test]
    fn reversal_with_backlash_inserts_correction() {
        let machine = machine_with_backlash(0.1);
        let mut filter = BacklashFilter::new(2);
        filter.compensate_before_target(&[10.0, 0.0], &machine);
        let plan = filter.compensate_before_target(&[5.0, 0.0], &machine);
        let correction = plan.correction_target.expect("reversal on X needs a correction");
        // prev_target (10.0) - backlash (0.1), since direction just flipped negative.
        assert!((correction[0] - 9.9).abs() < 1e-9);
    }

    #[test]
    fn reversal_without_configured_backlash_is_silent() {
        let machine = machine_with_backlash(0.0);
        let mut filter = BacklashFilter::new(2);
        filter.compensate_before_target(&[10.0, 0.0], &machine);
        let plan = filter.compensate_before_target(&[5.0, 0.0], &machine);
        assert!(plan.correction_target.is_none());
    }

    #[test]
    fn continuing_same_direction_needs_no_correction() {
        let machine = machine_with_backlash(0.1);
        let mut filter = BacklashFilter::new(2);
        filter.compensate_before_target(&[10.0, 0.0], &machine);
        let plan = filter.compensate_before_target(&[20.0, 0.0], &machine);
        assert!(plan.correction_target.is_none());
    }

    #[test]
    fn reset_after_probe_reseeds_without_changing_direction() {
        let machine = machine_with_backlash(0.1);
        let mut filter = BacklashFilter::new(2);
        filter.compensate_before_target(&[10.0, 0.0], &machine);
        filter.reset_after_probe(&[7.5, 0.0]);
        assert_eq!(filter.axes[0].prev_target, 7.5);
        assert_eq!(filter.axes[0].prev_direction, Direction::Positive);
    }
}
