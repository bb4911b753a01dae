//! A single planned move: the target, its kinematic unit vector, and the
//! entry/exit speeds the look-ahead passes (C4 steps 7-9) adjust in place.

use crate::line_data::LineData;

/// One block of the planner ring. `motor_unit_vec` and `distance_mm` are
/// fixed at enqueue time (step 1-3); `acceleration_mm_per_min2` and
/// `nominal_speed_mm_per_min` are fixed once the move's per-axis limits are
/// applied (step 3-4); `entry_speed_mm_per_min`/`exit_speed_mm_per_min` are
/// the only fields the reverse/forward passes revisit.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Cartesian machine-position this block moves to.
    pub target_mpos: Vec<f64>,
    /// Per-motor unit vector of the move (driven-space, not cartesian).
    pub motor_unit_vec: Vec<f64>,
    /// Driven-space distance travelled by this block, mm.
    pub distance_mm: f64,
    /// Most restrictive per-axis acceleration for this move's direction.
    pub acceleration_mm_per_min2: f64,
    /// Most restrictive per-axis rate for this move's direction, after the
    /// feed word (and G93 inverse-time conversion) is applied.
    pub nominal_speed_mm_per_min: f64,
    /// Speed this block is planned to enter at.
    pub entry_speed_mm_per_min: f64,
    /// Speed this block is planned to exit at (feeds the next block's
    /// junction, or zero for the last block in the ring).
    pub exit_speed_mm_per_min: f64,
    pub line_data: LineData,
}

impl Block {
    /// Distance (mm) needed to go from `from` to `to` at `acceleration`,
    /// the standard `v^2 = v0^2 + 2*a*d` relation solved for `d`.
    pub(crate) fn max_speed_after(&self, entry_speed: f64) -> f64 {
        (entry_speed * entry_speed + 2.0 * self.acceleration_mm_per_min2 * self.distance_mm)
            .sqrt()
    }
}
