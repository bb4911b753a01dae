//! CoreXY kinematics: belts couple the X/Y motors so each one drives a
//! linear combination of the two axes (`A = X + Y`, `B = X − Y`). Axes
//! beyond the first two (Z, A, B, ...) pass through unchanged.

use fluidnc_common::axis::MachineConfig;
use fluidnc_common::error::Error;

use crate::{soft_limit, Kinematics};

pub struct CoreXy {
    machine: MachineConfig,
}

impl CoreXy {
    pub fn new(machine: MachineConfig) -> Self {
        Self { machine }
    }
}

impl Kinematics for CoreXy {
    fn cartesian_to_motors(&self, target_mpos: &[f64]) -> Vec<f64> {
        let mut motors = target_mpos.to_vec();
        if motors.len() >= 2 {
            let (x, y) = (target_mpos[0], target_mpos[1]);
            motors[0] = x + y;
            motors[1] = x - y;
        }
        motors
    }

    fn motors_to_cartesian(&self, motor_mpos: &[f64]) -> Vec<f64> {
        let mut cart = motor_mpos.to_vec();
        if cart.len() >= 2 {
            let (a, b) = (motor_mpos[0], motor_mpos[1]);
            cart[0] = (a + b) / 2.0;
            cart[1] = (a - b) / 2.0;
        }
        cart
    }

    fn constrain_jog(&self, target: &mut [f64], feed: f64, current: &[f64]) {
        // The soft-limit box lives in cartesian space regardless of belt routing.
        soft_limit::constrain_jog(&self.machine, target, feed, current);
    }

    fn limits_check(&self, current: &[f64], target_mpos: &[f64]) -> Result<(), Error> {
        soft_limit::limits_check(&self.machine, current, target_mpos)
    }

    fn distance(&self, from: &[f64], to: &[f64]) -> f64 {
        // Belt travel, not cartesian travel, is what the motors' accel
        // limits constrain.
        let motor_from = self.cartesian_to_motors(from);
        let motor_to = self.cartesian_to_motors(to);
        motor_from
            .iter()
            .zip(&motor_to)
            .map(|(a, b)| (b - a).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluidnc_common::axis::{AxisConfig, AxisId, KinematicsKind};

    fn machine() -> MachineConfig {
        let axis = |id| AxisConfig {
            id,
            steps_per_mm: [80.0, 0.0],
            motor_count: 1,
            max_rate_mm_per_min: 5000.0,
            acceleration_mm_per_min2: 200.0,
            max_travel_mm: 300.0,
            homing: None,
            backlash: None,
        };
        MachineConfig {
            name: "t".into(),
            axes: vec![axis(AxisId::X), axis(AxisId::Y)],
            kinematics: KinematicsKind::CoreXy,
            junction_deviation_mm: 0.01,
            arc_tolerance_mm: 0.002,
            report_interval_ms: 200,
            planner_buffer_capacity: 32,
        }
    }

    #[test]
    fn round_trips_through_motor_space() {
        let k = CoreXy::new(machine());
        let target = [-30.0, -10.0];
        let motors = k.cartesian_to_motors(&target);
        assert_eq!(motors, vec![-40.0, -20.0]);
        let back = k.motors_to_cartesian(&motors);
        assert!((back[0] - target[0]).abs() < 1e-9);
        assert!((back[1] - target[1]).abs() < 1e-9);
    }

    #[test]
    fn pure_x_move_drives_both_belts_equally() {
        let k = CoreXy::new(machine());
        let motors = k.cartesian_to_motors(&[-10.0, 0.0]);
        assert_eq!(motors, vec![-10.0, -10.0]);
    }
}
