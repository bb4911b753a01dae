//! Cartesian (identity) kinematics: motor space is cartesian space.

use fluidnc_common::axis::MachineConfig;
use fluidnc_common::error::Error;

use crate::{soft_limit, Kinematics};

pub struct Identity {
    machine: MachineConfig,
}

impl Identity {
    pub fn new(machine: MachineConfig) -> Self {
        Self { machine }
    }
}

impl Kinematics for Identity {
    fn cartesian_to_motors(&self, target_mpos: &[f64]) -> Vec<f64> {
        target_mpos.to_vec()
    }

    fn motors_to_cartesian(&self, motor_mpos: &[f64]) -> Vec<f64> {
        motor_mpos.to_vec()
    }

    fn constrain_jog(&self, target: &mut [f64], feed: f64, current: &[f64]) {
        soft_limit::constrain_jog(&self.machine, target, feed, current);
    }

    fn limits_check(&self, current: &[f64], target_mpos: &[f64]) -> Result<(), Error> {
        soft_limit::limits_check(&self.machine, current, target_mpos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluidnc_common::axis::{AxisConfig, AxisId, KinematicsKind};

    fn machine() -> MachineConfig {
        MachineConfig {
            name: "t".into(),
            axes: vec![
                AxisConfig {
                    id: AxisId::X,
                    steps_per_mm: [80.0, 0.0],
                    motor_count: 1,
                    max_rate_mm_per_min: 5000.0,
                    acceleration_mm_per_min2: 200.0,
                    max_travel_mm: 300.0,
                    homing: None,
                    backlash: None,
                },
                AxisConfig {
                    id: AxisId::Y,
                    steps_per_mm: [80.0, 0.0],
                    motor_count: 1,
                    max_rate_mm_per_min: 5000.0,
                    acceleration_mm_per_min2: 200.0,
                    max_travel_mm: 300.0,
                    homing: None,
                    backlash: None,
                },
            ],
            kinematics: KinematicsKind::Cartesian,
            junction_deviation_mm: 0.01,
            arc_tolerance_mm: 0.002,
            report_interval_ms: 200,
            planner_buffer_capacity: 32,
        }
    }

    #[test]
    fn round_trips_exactly() {
        let k = Identity::new(machine());
        let target = [-10.0, -20.0];
        let motors = k.cartesian_to_motors(&target);
        assert_eq!(motors, target);
        assert_eq!(k.motors_to_cartesian(&motors), target);
    }

    #[test]
    fn distance_is_euclidean_norm() {
        let k = Identity::new(machine());
        assert!((k.distance(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-9);
    }
}
