//! Soft-limit box check and jog clamping shared by every [`crate::Kinematics`]
//! variant (spec §4.3: `constrain_jog`, `limits_check`).
//!
//! Convention: an axis's travel box is `[-max_travel_mm, 0.0]`, machine
//! position zero at the home switch and travel running negative — the
//! FluidNC convention for a homed axis (see DESIGN.md's open-question log).

use fluidnc_common::axis::MachineConfig;
use fluidnc_common::error::Error;

/// `(min, max)` machine-position bound for `axis_index`, or `None` if the
/// machine has fewer axes than `axis_index`.
pub fn travel_box(machine: &MachineConfig, axis_index: usize) -> Option<(f64, f64)> {
    machine
        .axes
        .get(axis_index)
        .map(|a| (-a.max_travel_mm, 0.0))
}

/// Clamp every axis of `target` into its travel box in place (§4.3
/// `constrain_jog`: "clips jog target to soft-limit box per axis"). `feed`
/// and `current` are accepted for interface symmetry with the spec and
/// future rate-aware clamping but aren't needed by a pure box clip.
pub fn constrain_jog(machine: &MachineConfig, target: &mut [f64], _feed: f64, _current: &[f64]) {
    for (i, v) in target.iter_mut().enumerate() {
        if let Some((min, max)) = travel_box(machine, i) {
            *v = v.clamp(min, max);
        }
    }
}

/// Check whether the straight line from `current` to `target` (in machine
/// position space) stays within every axis's travel box for the whole
/// segment — not just its endpoints, since a line between two in-box points
/// never crosses a box face, so checking endpoints alone suffices for an
/// axis-aligned box.
pub fn limits_check(machine: &MachineConfig, current: &[f64], target: &[f64]) -> Result<(), Error> {
    for i in 0..target.len().min(current.len()) {
        let Some((min, max)) = travel_box(machine, i) else {
            continue;
        };
        let (lo, hi) = (current[i].min(target[i]), current[i].max(target[i]));
        if hi > max + 1e-9 || lo < min - 1e-9 {
            return Err(Error::SoftLimitError);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluidnc_common::axis::{AxisConfig, AxisId, KinematicsKind};

    fn machine() -> MachineConfig {
        MachineConfig {
            name: "t".into(),
            axes: vec![AxisConfig {
                id: AxisId::X,
                steps_per_mm: [80.0, 0.0],
                motor_count: 1,
                max_rate_mm_per_min: 5000.0,
                acceleration_mm_per_min2: 200.0,
                max_travel_mm: 300.0,
                homing: None,
                backlash: None,
            }],
            kinematics: KinematicsKind::Cartesian,
            junction_deviation_mm: 0.01,
            arc_tolerance_mm: 0.002,
            report_interval_ms: 200,
            planner_buffer_capacity: 32,
        }
    }

    #[test]
    fn clips_target_into_box() {
        let m = machine();
        let mut target = [-500.0];
        constrain_jog(&m, &mut target, 1000.0, &[0.0]);
        assert_eq!(target[0], -300.0);
    }

    #[test]
    fn rejects_target_outside_box() {
        let m = machine();
        assert!(limits_check(&m, &[0.0], &[-301.0]).is_err());
        assert!(limits_check(&m, &[0.0], &[-299.0]).is_ok());
    }
}
