//! Maslow (4-belt) kinematics: a sled hangs from four corner-anchored
//! belts; X/Y are driven entirely by belt length, so unlike every other
//! variant here the motor count (4 belts) does not match the cartesian
//! axis count (2 sled axes + whatever else the machine declares — Z is
//! typically a router-plunge axis with its own motor, unrelated to the
//! belts, and passes straight through).
//!
//! Belt length is the straight-line anchor-to-sled-point distance, minus a
//! fixed arm offset standing in for the real machine's sprocket-arm and
//! belt-end geometry (the exact correction is tuned per machine at
//! calibration time, see §9's calibration collaborator note — this is the
//! constant-offset approximation, not the full iterative arc correction).

use fluidnc_common::axis::MachineConfig;
use fluidnc_common::error::Error;

use crate::{soft_limit, Kinematics};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaslowGeometry {
    /// Horizontal distance between the left and right top/bottom anchors.
    pub width_mm: f64,
    /// Vertical distance between the top and bottom anchors.
    pub height_mm: f64,
    /// Fixed sprocket-arm / belt-end offset subtracted from the raw
    /// anchor-to-sled distance.
    pub arm_length_mm: f64,
}

impl Default for MaslowGeometry {
    fn default() -> Self {
        Self {
            width_mm: 2438.4, // 8 ft sheet
            height_mm: 1219.2, // 4 ft sheet
            arm_length_mm: 139.0,
        }
    }
}

impl MaslowGeometry {
    /// The four anchors, in `TopLeft, TopRight, BottomLeft, BottomRight`
    /// order, relative to the sheet's center (machine-position origin).
    fn anchors(&self) -> [(f64, f64); 4] {
        let (hw, hh) = (self.width_mm / 2.0, self.height_mm / 2.0);
        [(-hw, hh), (hw, hh), (-hw, -hh), (hw, -hh)]
    }

    fn belt_length(&self, anchor: (f64, f64), sled: (f64, f64)) -> f64 {
        let d = ((anchor.0 - sled.0).powi(2) + (anchor.1 - sled.1).powi(2)).sqrt();
        (d - self.arm_length_mm).max(0.0)
    }
}

pub struct Maslow {
    machine: MachineConfig,
    geometry: MaslowGeometry,
}

impl Maslow {
    pub fn new(machine: MachineConfig, geometry: MaslowGeometry) -> Self {
        Self { machine, geometry }
    }

    fn belt_mismatch(&self, anchor_index: usize, x: f64, y: f64, belts: [f64; 4]) -> f64 {
        let anchors = self.geometry.anchors();
        let d0 = self.geometry.belt_length(anchors[0], (x, y));
        let di = self.geometry.belt_length(anchors[anchor_index], (x, y));
        (di - belts[anchor_index]) - (d0 - belts[0])
    }

    /// Recover the sled's (x, y) from all four belt lengths via the same
    /// numeric-Jacobian Newton approach used for the parallel-delta
    /// forward transform, using belts 1 and 2 as the two residual
    /// equations against the reference belt 0.
    fn solve_xy(&self, belts: [f64; 4]) -> Option<(f64, f64)> {
        let mut x = 0.0_f64;
        let mut y = 0.0_f64;
        const H: f64 = 1e-4;
        const MAX_ITERS: usize = 50;

        for _ in 0..MAX_ITERS {
            let f1 = self.belt_mismatch(1, x, y, belts);
            let f2 = self.belt_mismatch(2, x, y, belts);
            if f1.abs() < 1e-9 && f2.abs() < 1e-9 {
                break;
            }
            let f1x = (self.belt_mismatch(1, x + H, y, belts) - f1) / H;
            let f1y = (self.belt_mismatch(1, x, y + H, belts) - f1) / H;
            let f2x = (self.belt_mismatch(2, x + H, y, belts) - f2) / H;
            let f2y = (self.belt_mismatch(2, x, y + H, belts) - f2) / H;

            let det = f1x * f2y - f1y * f2x;
            if det.abs() < 1e-12 {
                return None;
            }
            let dx = (f2y * f1 - f1y * f2) / det;
            let dy = (f1x * f2 - f2x * f1) / det;
            x -= dx;
            y -= dy;
        }
        Some((x, y))
    }
}

impl Kinematics for Maslow {
    fn cartesian_to_motors(&self, target_mpos: &[f64]) -> Vec<f64> {
        let sled = (
            target_mpos.first().copied().unwrap_or(0.0),
            target_mpos.get(1).copied().unwrap_or(0.0),
        );
        let mut motors: Vec<f64> = self
            .geometry
            .anchors()
            .iter()
            .map(|a| self.geometry.belt_length(*a, sled))
            .collect();
        if target_mpos.len() > 2 {
            motors.extend_from_slice(&target_mpos[2..]);
        }
        motors
    }

    fn motors_to_cartesian(&self, motor_mpos: &[f64]) -> Vec<f64> {
        if motor_mpos.len() < 4 {
            return motor_mpos.to_vec();
        }
        let belts = [motor_mpos[0], motor_mpos[1], motor_mpos[2], motor_mpos[3]];
        let (x, y) = self.solve_xy(belts).unwrap_or((0.0, 0.0));
        let mut cart = vec![x, y];
        cart.extend_from_slice(&motor_mpos[4..]);
        cart
    }

    fn constrain_jog(&self, target: &mut [f64], feed: f64, current: &[f64]) {
        soft_limit::constrain_jog(&self.machine, target, feed, current);
    }

    fn limits_check(&self, current: &[f64], target_mpos: &[f64]) -> Result<(), Error> {
        soft_limit::limits_check(&self.machine, current, target_mpos)
    }

    fn distance(&self, from: &[f64], to: &[f64]) -> f64 {
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
        let axis = |id, travel| AxisConfig {
            id,
            steps_per_mm: [80.0, 0.0],
            motor_count: 1,
            max_rate_mm_per_min: 5000.0,
            acceleration_mm_per_min2: 200.0,
            max_travel_mm: travel,
            homing: None,
            backlash: None,
        };
        MachineConfig {
            name: "t".into(),
            axes: vec![
                axis(AxisId::X, 2400.0),
                axis(AxisId::Y, 1200.0),
                axis(AxisId::Z, 80.0),
            ],
            kinematics: KinematicsKind::Maslow,
            junction_deviation_mm: 0.01,
            arc_tolerance_mm: 0.002,
            report_interval_ms: 200,
            planner_buffer_capacity: 32,
        }
    }

    #[test]
    fn center_sled_gives_symmetric_belts() {
        let k = Maslow::new(machine(), MaslowGeometry::default());
        let motors = k.cartesian_to_motors(&[0.0, 0.0, -5.0]);
        assert_eq!(motors.len(), 5);
        assert!((motors[0] - motors[1]).abs() < 1e-6);
        assert!((motors[2] - motors[3]).abs() < 1e-6);
        assert!((motors[4] - (-5.0)).abs() < 1e-9);
    }

    #[test]
    fn z_axis_passes_through_untouched() {
        let k = Maslow::new(machine(), MaslowGeometry::default());
        let motors = k.cartesian_to_motors(&[100.0, -50.0, -12.5]);
        assert_eq!(motors[4], -12.5);
    }

    #[test]
    fn forward_inverts_inverse_off_center() {
        let k = Maslow::new(machine(), MaslowGeometry::default());
        let target = [200.0, -80.0, -3.0];
        let motors = k.cartesian_to_motors(&target);
        let back = k.motors_to_cartesian(&motors);
        assert!((back[0] - target[0]).abs() < 1e-2);
        assert!((back[1] - target[1]).abs() < 1e-2);
    }
}
