//! Parallel-delta (3-arm) kinematics: three vertical towers, each carriage
//! connected to the effector by a fixed-length diagonal rod. The first
//! three axes are the tower carriages; axes beyond that pass through.
//!
//! Inverse kinematics (cartesian → tower height) has a direct closed form.
//! Forward kinematics (tower heights → cartesian) has no equally simple
//! closed form once arbitrary geometry is allowed, so it's solved with a
//! small Newton-Raphson iteration instead — the classic numerical approach
//! for parallel-robot forward kinematics when a closed-form trilateration
//! isn't worth the algebra.

use fluidnc_common::axis::MachineConfig;
use fluidnc_common::error::Error;

use crate::{soft_limit, Kinematics};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeltaGeometry {
    /// Horizontal distance from the machine center to each tower's rail.
    pub tower_radius_mm: f64,
    /// Length of the fixed diagonal rod connecting a carriage to the effector.
    pub rod_length_mm: f64,
}

impl Default for DeltaGeometry {
    fn default() -> Self {
        Self {
            tower_radius_mm: 150.0,
            rod_length_mm: 300.0,
        }
    }
}

impl DeltaGeometry {
    /// Tower positions at 0°, 120°, 240°, matching the conventional
    /// Kossel-style layout (tower 0 on the +Y axis).
    fn towers(&self) -> [(f64, f64); 3] {
        let r = self.tower_radius_mm;
        [0.0, 120.0, 240.0].map(|deg| {
            let rad = deg_to_rad(deg);
            (r * rad.sin(), r * rad.cos())
        })
    }
}

fn deg_to_rad(deg: f64) -> f64 {
    deg * std::f64::consts::PI / 180.0
}

pub struct ParallelDelta {
    machine: MachineConfig,
    geometry: DeltaGeometry,
}

impl ParallelDelta {
    pub fn new(machine: MachineConfig, geometry: DeltaGeometry) -> Self {
        Self { machine, geometry }
    }

    /// Tower carriage height for a single tower given the effector's
    /// cartesian position: `h = z + sqrt(rod^2 - horizontal_dist^2)`.
    fn tower_height(&self, tower_xy: (f64, f64), effector: (f64, f64, f64)) -> Option<f64> {
        let (tx, ty) = tower_xy;
        let (x, y, z) = effector;
        let horiz_sq = (tx - x).powi(2) + (ty - y).powi(2);
        let under_sqrt = self.geometry.rod_length_mm.powi(2) - horiz_sq;
        if under_sqrt < 0.0 {
            return None;
        }
        Some(z + under_sqrt.sqrt())
    }

    /// Residual `z_i(x,y) - z_0(x,y)` for tower `i`, zero at the true (x, y).
    fn height_mismatch(&self, i: usize, x: f64, y: f64, heights: [f64; 3]) -> Option<f64> {
        let towers = self.geometry.towers();
        let z0 = heights[0] - self.horizontal_offset(towers[0], x, y)?;
        let zi = heights[i] - self.horizontal_offset(towers[i], x, y)?;
        Some(zi - z0)
    }

    fn horizontal_offset(&self, tower_xy: (f64, f64), x: f64, y: f64) -> Option<f64> {
        let horiz_sq = (tower_xy.0 - x).powi(2) + (tower_xy.1 - y).powi(2);
        let under_sqrt = self.geometry.rod_length_mm.powi(2) - horiz_sq;
        if under_sqrt < 0.0 {
            return None;
        }
        Some(under_sqrt.sqrt())
    }

    /// Solve for the effector's (x, y) by driving the two height-mismatch
    /// residuals to zero with a numeric-Jacobian Newton iteration, then
    /// recover z from tower 0's equation.
    fn forward_xyz(&self, heights: [f64; 3]) -> Option<(f64, f64, f64)> {
        let mut x = 0.0_f64;
        let mut y = 0.0_f64;
        const H: f64 = 1e-4;
        const MAX_ITERS: usize = 50;

        for _ in 0..MAX_ITERS {
            let f1 = self.height_mismatch(1, x, y, heights)?;
            let f2 = self.height_mismatch(2, x, y, heights)?;
            if f1.abs() < 1e-9 && f2.abs() < 1e-9 {
                break;
            }
            let f1x = (self.height_mismatch(1, x + H, y, heights)? - f1) / H;
            let f1y = (self.height_mismatch(1, x, y + H, heights)? - f1) / H;
            let f2x = (self.height_mismatch(2, x + H, y, heights)? - f2) / H;
            let f2y = (self.height_mismatch(2, x, y + H, heights)? - f2) / H;

            let det = f1x * f2y - f1y * f2x;
            if det.abs() < 1e-12 {
                return None;
            }
            let dx = (f2y * f1 - f1y * f2) / det;
            let dy = (f1x * f2 - f2x * f1) / det;
            x -= dx;
            y -= dy;
        }

        let towers = self.geometry.towers();
        let offset = self.horizontal_offset(towers[0], x, y)?;
        let z = heights[0] - offset;
        Some((x, y, z))
    }
}

impl Kinematics for ParallelDelta {
    fn cartesian_to_motors(&self, target_mpos: &[f64]) -> Vec<f64> {
        let mut motors = target_mpos.to_vec();
        if target_mpos.len() >= 3 {
            let effector = (target_mpos[0], target_mpos[1], target_mpos[2]);
            for (i, tower) in self.geometry.towers().iter().enumerate() {
                if let Some(h) = self.tower_height(*tower, effector) {
                    motors[i] = h;
                }
            }
        }
        motors
    }

    fn motors_to_cartesian(&self, motor_mpos: &[f64]) -> Vec<f64> {
        let mut cart = motor_mpos.to_vec();
        if motor_mpos.len() >= 3 {
            let heights = [motor_mpos[0], motor_mpos[1], motor_mpos[2]];
            if let Some((x, y, z)) = self.forward_xyz(heights) {
                cart[0] = x;
                cart[1] = y;
                cart[2] = z;
            }
        }
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
        let axis = |id| AxisConfig {
            id,
            steps_per_mm: [80.0, 0.0],
            motor_count: 1,
            max_rate_mm_per_min: 5000.0,
            acceleration_mm_per_min2: 200.0,
            max_travel_mm: 600.0,
            homing: None,
            backlash: None,
        };
        MachineConfig {
            name: "t".into(),
            axes: vec![axis(AxisId::X), axis(AxisId::Y), axis(AxisId::Z)],
            kinematics: KinematicsKind::ParallelDelta,
            junction_deviation_mm: 0.01,
            arc_tolerance_mm: 0.002,
            report_interval_ms: 200,
            planner_buffer_capacity: 32,
        }
    }

    #[test]
    fn center_column_gives_equal_tower_heights() {
        let k = ParallelDelta::new(machine(), DeltaGeometry::default());
        let motors = k.cartesian_to_motors(&[0.0, 0.0, -200.0]);
        assert!((motors[0] - motors[1]).abs() < 1e-6);
        assert!((motors[1] - motors[2]).abs() < 1e-6);
    }

    #[test]
    fn forward_inverts_inverse_near_center() {
        let k = ParallelDelta::new(machine(), DeltaGeometry::default());
        let target = [10.0, -5.0, -220.0];
        let motors = k.cartesian_to_motors(&target);
        let back = k.motors_to_cartesian(&motors);
        assert!((back[0] - target[0]).abs() < 1e-3, "x: {} vs {}", back[0], target[0]);
        assert!((back[1] - target[1]).abs() < 1e-3, "y: {} vs {}", back[1], target[1]);
        assert!((back[2] - target[2]).abs() < 1e-3, "z: {} vs {}", back[2], target[2]);
    }
}
