//! Axis/machine configuration (data model §3), immutable after config load.
//!
//! Mirrors the teacher's `AxisConfig`/`MachineConfig` split
//! (`evo_common::hal::config`) but generalized to the up-to-9-axis,
//! up-to-2-motor-per-axis FluidNC layout instead of a single servo axis.

use serde::{Deserialize, Serialize};
use static_assertions::const_assert;

/// The maximum number of axes a machine may declare (X Y Z A B C U V W).
pub const MAX_AXES: usize = 9;

/// The maximum number of motors ganged onto a single axis.
pub const MAX_MOTORS_PER_AXIS: usize = 2;

// `AxisId` packs its index into a `u8`; catch it at compile time if `MAX_AXES`
// ever grows past what that representation can hold.
const_assert!(MAX_AXES <= u8::MAX as usize);

/// A typed index into per-axis arrays, replacing raw `int` indexing
/// (DESIGN NOTES §9: "typed `AxisId` index").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AxisId(u8);

impl AxisId {
    pub const X: AxisId = AxisId(0);
    pub const Y: AxisId = AxisId(1);
    pub const Z: AxisId = AxisId(2);
    pub const A: AxisId = AxisId(3);
    pub const B: AxisId = AxisId(4);
    pub const C: AxisId = AxisId(5);
    pub const U: AxisId = AxisId(6);
    pub const V: AxisId = AxisId(7);
    pub const W: AxisId = AxisId(8);

    /// Build an `AxisId` from a small index, clamped to `MAX_AXES`.
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < MAX_AXES {
            Some(AxisId(index))
        } else {
            None
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Single-letter axis name (`X`..`W`), for reports and error messages.
    pub const fn letter(self) -> char {
        const LETTERS: [char; MAX_AXES] = ['X', 'Y', 'Z', 'A', 'B', 'C', 'U', 'V', 'W'];
        LETTERS[self.0 as usize]
    }
}

/// Approach/pulloff/feed parameters for one axis's homing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HomingConfig {
    /// Rapid approach rate toward the switch, mm/min.
    pub seek_rate: f64,
    /// Slow re-approach rate after pulloff, mm/min.
    pub feed_rate: f64,
    /// Distance to back off the switch between passes, mm.
    pub pulloff_mm: f64,
    /// Machine position assigned to this axis once homing completes.
    pub mpos: f64,
    /// True if the switch is approached from the positive direction.
    pub positive_direction: bool,
    /// Which homing cycle (§4.11) this axis participates in; axes sharing
    /// a cycle index home together.
    pub cycle: u8,
}

/// Per-axis mechanical backlash, if the axis has measurable lost motion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacklashConfig {
    /// Distance to travel in the new direction before resuming motion, mm.
    pub distance_mm: f64,
}

/// Immutable per-axis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    pub id: AxisId,
    /// Steps-per-millimeter, per motor (an axis may gang up to 2 motors
    /// with different step resolutions, e.g. a dual-lead-screw gantry).
    pub steps_per_mm: [f64; MAX_MOTORS_PER_AXIS],
    pub motor_count: u8,
    pub max_rate_mm_per_min: f64,
    pub acceleration_mm_per_min2: f64,
    pub max_travel_mm: f64,
    pub homing: Option<HomingConfig>,
    pub backlash: Option<BacklashConfig>,
}

impl AxisConfig {
    /// Convert a motor's step count to millimeters using its configured resolution.
    pub fn steps_to_mm(&self, motor: usize, steps: i64) -> f64 {
        steps as f64 / self.steps_per_mm[motor]
    }

    /// Convert a millimeter target to a motor's step count.
    pub fn mm_to_steps(&self, motor: usize, mm: f64) -> i64 {
        (mm * self.steps_per_mm[motor]).round() as i64
    }

    pub fn backlash_mm(&self) -> f64 {
        self.backlash.map(|b| b.distance_mm).unwrap_or(0.0)
    }
}

/// Which kinematic transform a machine uses (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KinematicsKind {
    Cartesian,
    CoreXy,
    ParallelDelta,
    Maslow,
}

/// Immutable machine-wide configuration: the ordered axis list plus the
/// kinematic transform and look-ahead tuning constants the planner needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    pub name: String,
    pub axes: Vec<AxisConfig>,
    pub kinematics: KinematicsKind,
    /// Cornering-deviation constant used by the junction-speed formula (§4.4 step 5), mm.
    pub junction_deviation_mm: f64,
    /// Maximum chord error tolerated when segmenting an arc, mm.
    pub arc_tolerance_mm: f64,
    /// Minimum period between periodic status reports, ms (0 disables).
    pub report_interval_ms: u32,
    /// Planner ring capacity; spec requires >= 16.
    pub planner_buffer_capacity: usize,
}

impl MachineConfig {
    pub fn axis(&self, id: AxisId) -> Option<&AxisConfig> {
        self.axes.iter().find(|a| a.id == id)
    }

    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }
}
