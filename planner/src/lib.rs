//! Motion planner (spec component C4) and backlash pre-filter (C5).
//!
//! The planner is a FIFO ring of [`block::Block`]s with look-ahead velocity
//! planning across the whole queue: every new block triggers a reverse pass
//! (tighten entry speeds so each block can decelerate into its successor)
//! followed by a forward pass (propagate those tightened entries forward as
//! achievable exit speeds). The backlash filter sits in front of it,
//! inserting a hidden correction block whenever an axis reverses direction.

pub mod backlash;
pub mod block;
pub mod line_data;
pub mod ring;

pub use backlash::{BacklashFilter, BacklashPlan};
pub use block::Block;
pub use line_data::LineData;
pub use ring::PlannerRing;

use fluidnc_common::axis::MachineConfig;
use fluidnc_kinematics::Kinematics;

/// Ties the backlash pre-filter to the planner ring so callers enqueue a
/// line once and get both the hidden correction block (if any) and the real
/// move planned in the right order, matching how `plan_buffer_line` and
/// `backlash_Compensate_befor_target` compose in the source machine: every
/// non-backlash motion passes through the filter first.
pub struct Planner {
    ring: PlannerRing,
    backlash: BacklashFilter,
}

impl Planner {
    pub fn new(machine: &MachineConfig, initial_mpos: Vec<f64>) -> Self {
        Self {
            ring: PlannerRing::new(machine, initial_mpos.clone()),
            backlash: BacklashFilter::new(machine.axis_count()),
        }
    }

    pub fn ring(&self) -> &PlannerRing {
        &self.ring
    }

    pub fn ring_mut(&mut self) -> &mut PlannerRing {
        &mut self.ring
    }

    pub fn backlash_mut(&mut self) -> &mut BacklashFilter {
        &mut self.backlash
    }

    /// Queue `target_mpos`, running it through the backlash filter first.
    /// System motions (homing, probing) bypass the filter entirely: they
    /// drive the reversal tracking state themselves via
    /// [`BacklashFilter::reset_for_homing`] / [`BacklashFilter::reset_after_probe`].
    pub fn plan_line(
        &mut self,
        target_mpos: &[f64],
        line_data: LineData,
        kinematics: &dyn Kinematics,
        machine: &MachineConfig,
        jog_cancelled: bool,
    ) -> bool {
        if !line_data.is_system_motion && !line_data.is_backlash {
            let plan = self.backlash.compensate_before_target(target_mpos, machine);
            if let Some(correction) = plan.correction_target {
                self.ring.plan_line(
                    &correction,
                    backlash::backlash_line_data(line_data),
                    kinematics,
                    machine,
                    false,
                );
            }
        }
        self.ring
            .plan_line(target_mpos, line_data, kinematics, machine, jog_cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluidnc_common::axis::{AxisConfig, AxisId, BacklashConfig, KinematicsKind};
    use fluidnc_kinematics::identity::Identity;

    fn machine() -> MachineConfig {
        let axis = |id| AxisConfig {
            id,
            steps_per_mm: [80.0, 0.0],
            motor_count: 1,
            max_rate_mm_per_min: 3000.0,
            acceleration_mm_per_min2: 600.0,
            max_travel_mm: 500.0,
            homing: None,
            backlash: Some(BacklashConfig { distance_mm: 0.2 }),
        };
        MachineConfig {
            name: "t".into(),
            axes: vec![axis(AxisId::X), axis(AxisId::Y)],
            kinematics: KinematicsKind::Cartesian,
            junction_deviation_mm: 0.01,
            arc_tolerance_mm: 0.002,
            report_interval_ms: 200,
            planner_buffer_capacity: 16,
        }
    }

    #[test]
    fn reversal_queues_a_hidden_block_ahead_of_the_real_move() {
        let m = machine();
        let k = Identity::new(m.clone());
        let mut planner = Planner::new(&m, vec![0.0, 0.0]);
        planner.plan_line(&[100.0, 0.0], LineData::new(1000.0), &k, &m, false);
        assert_eq!(planner.ring().len(), 1);

        planner.plan_line(&[0.0, 0.0], LineData::new(1000.0), &k, &m, false);
        // One hidden correction block plus the real reversal move.
        assert_eq!(planner.ring().len(), 3);
    }

    #[test]
    fn system_motion_bypasses_the_backlash_filter() {
        let m = machine();
        let k = Identity::new(m.clone());
        let mut planner = Planner::new(&m, vec![0.0, 0.0]);
        planner.plan_line(&[100.0, 0.0], LineData::new(1000.0), &k, &m, false);
        planner.plan_line(
            &[0.0, 0.0],
            LineData::new(1000.0).system_motion(),
            &k,
            &m,
            false,
        );
        assert_eq!(planner.ring().len(), 2);
    }
}
