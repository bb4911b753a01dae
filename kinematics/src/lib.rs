//! Kinematic transforms (spec component C3): the bidirectional map between
//! a cartesian target and per-motor target that the planner (C4) and jog
//! handler need, plus the soft-limit check every variant shares.
//!
//! The core assumes each [`Kinematics`] impl honors exactly the four
//! [`Kinematics`] operations and nothing more — it never reaches past the
//! trait into a variant's internals, so a variant's calibration routine
//! (Maslow's belt-length correction) is free to mutate its own state
//! without the planner being able to observe an inconsistent snapshot.

pub mod corexy;
pub mod delta;
pub mod identity;
pub mod maslow;
pub mod soft_limit;

use fluidnc_common::axis::MachineConfig;
use fluidnc_common::error::Error;

/// Bidirectional cartesian/motor-space transform plus the jog and
/// soft-limit checks that depend on it (non-cartesian systems need their
/// own notion of "distance travelled" for the planner's acceleration math).
pub trait Kinematics: Send {
    /// Map a cartesian machine-position target (mm) to per-motor targets.
    /// Most variants preserve axis count; Maslow does not (two sled axes
    /// drive four belts), so callers must not assume the lengths match.
    fn cartesian_to_motors(&self, target_mpos: &[f64]) -> Vec<f64>;

    /// Inverse of [`Kinematics::cartesian_to_motors`].
    fn motors_to_cartesian(&self, motor_mpos: &[f64]) -> Vec<f64>;

    /// Clip a jog target into the machine's travel box. `feed` and
    /// `current` are supplied for variants that need rate- or
    /// position-aware clamping (e.g. a delta's singularity radius).
    fn constrain_jog(&self, target: &mut [f64], feed: f64, current: &[f64]);

    /// Whether the straight line from `current` to `target_mpos` (in
    /// cartesian machine-position space) would cross a soft-limit plane.
    fn limits_check(&self, current: &[f64], target_mpos: &[f64]) -> Result<(), Error>;

    /// Euclidean distance between two cartesian points in the
    /// driven-motor space, used by the planner so acceleration limits stay
    /// meaningful even when cartesian and motor space aren't proportional
    /// (CoreXY, delta). Cartesian variants just return the cartesian norm.
    fn distance(&self, from: &[f64], to: &[f64]) -> f64 {
        from.iter()
            .zip(to)
            .map(|(a, b)| (b - a).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

/// Build the configured kinematics variant for a machine.
pub fn build(machine: &MachineConfig) -> Box<dyn Kinematics> {
    match machine.kinematics {
        fluidnc_common::axis::KinematicsKind::Cartesian => {
            Box::new(identity::Identity::new(machine.clone()))
        }
        fluidnc_common::axis::KinematicsKind::CoreXy => {
            Box::new(corexy::CoreXy::new(machine.clone()))
        }
        fluidnc_common::axis::KinematicsKind::ParallelDelta => {
            Box::new(delta::ParallelDelta::new(machine.clone(), delta::DeltaGeometry::default()))
        }
        fluidnc_common::axis::KinematicsKind::Maslow => {
            Box::new(maslow::Maslow::new(machine.clone(), maslow::MaslowGeometry::default()))
        }
    }
}
