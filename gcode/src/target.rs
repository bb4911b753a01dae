//! Folding a line's axis words into an absolute machine-position target
//! (§4.6 step 6): apply distance mode, units, the active work-coordinate
//! offset, the G92 offset, and TLO.

use fluidnc_common::axis::{AxisId, MachineConfig};
use fluidnc_common::modal::{CoordIndex, Distance, ModalState};

use crate::ops::CoordinateStore;
use crate::parser_block::ParserBlock;

/// Per-axis work-coordinate offset in effect right now: the active WCS
/// origin, plus the G92 offset, plus TLO on the tool-length axis (Z).
pub fn work_offset(machine: &MachineConfig, modal: &ModalState, coords: &dyn CoordinateStore) -> Vec<f64> {
    let wcs = coords.offset(modal.coord_select);
    let g92 = coords.offset(CoordIndex::G92);
    let tlo_axis = AxisId::Z.index();
    (0..machine.axis_count())
        .map(|i| wcs[i] + g92[i] + if i == tlo_axis { coords.tlo() } else { 0.0 })
        .collect()
}

/// Fold this line's axis words into an absolute cartesian target, given the
/// current machine position. `g53` bypasses the work offset entirely
/// (§4.6: "G53 only allowed with G0 and G1").
pub fn fold_target(
    machine: &MachineConfig,
    modal: &ModalState,
    coords: &dyn CoordinateStore,
    current_mpos: &[f64],
    block: &ParserBlock,
    g53: bool,
) -> Vec<f64> {
    let units = modal.units.to_mm_factor();
    let wco = work_offset(machine, modal, coords);
    (0..machine.axis_count())
        .map(|i| {
            let Some(raw) = block.axis_words.get(i).copied().flatten() else {
                return current_mpos.get(i).copied().unwrap_or(0.0);
            };
            let mm = raw * units;
            if g53 {
                return mm;
            }
            match modal.distance {
                Distance::Absolute => mm + wco[i],
                Distance::Incremental => current_mpos.get(i).copied().unwrap_or(0.0) + mm,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluidnc_common::axis::{AxisConfig, KinematicsKind};

    struct StubCoords {
        offsets: [[f64; 9]; 13],
        active: CoordIndex,
        tlo: f64,
    }
    impl CoordinateStore for StubCoords {
        fn offset(&self, index: CoordIndex) -> [f64; 9] {
            self.offsets[CoordIndex::ALL.iter().position(|c| *c == index).unwrap()]
        }
        fn set_offset(&mut self, index: CoordIndex, values: [f64; 9]) {
            self.offsets[CoordIndex::ALL.iter().position(|c| *c == index).unwrap()] = values;
        }
        fn active(&self) -> CoordIndex {
            self.active
        }
        fn set_active(&mut self, index: CoordIndex) {
            self.active = index;
        }
        fn tlo(&self) -> f64 {
            self.tlo
        }
        fn set_tlo(&mut self, v: f64) {
            self.tlo = v;
        }
    }

    fn machine() -> MachineConfig {
        let axis = |id| AxisConfig {
            id,
            steps_per_mm: [80.0, 0.0],
            motor_count: 1,
            max_rate_mm_per_min: 3000.0,
            acceleration_mm_per_min2: 500.0,
            max_travel_mm: 300.0,
            homing: None,
            backlash: None,
        };
        MachineConfig {
            name: "t".into(),
            axes: vec![axis(AxisId::X), axis(AxisId::Y), axis(AxisId::Z)],
            kinematics: KinematicsKind::Cartesian,
            junction_deviation_mm: 0.01,
            arc_tolerance_mm: 0.002,
            report_interval_ms: 200,
            planner_buffer_capacity: 32,
        }
    }

    #[test]
    fn absolute_mode_adds_work_offset() {
        let machine = machine();
        let modal = ModalState::default();
        let coords = StubCoords {
            offsets: [[0.0; 9]; 13],
            active: CoordIndex::G54,
            tlo: 0.0,
        };
        let mut block = ParserBlock::default();
        block.set_axis(0, 10.0).unwrap();
        let target = fold_target(&machine, &modal, &coords, &[0.0, 0.0, 0.0], &block, false);
        assert_eq!(target[0], 10.0);
    }

    #[test]
    fn incremental_mode_adds_to_current_position() {
        let machine = machine();
        let mut modal = ModalState::default();
        modal.distance = Distance::Incremental;
        let coords = StubCoords {
            offsets: [[0.0; 9]; 13],
            active: CoordIndex::G54,
            tlo: 0.0,
        };
        let mut block = ParserBlock::default();
        block.set_axis(0, 5.0).unwrap();
        let target = fold_target(&machine, &modal, &coords, &[100.0, 0.0, 0.0], &block, false);
        assert_eq!(target[0], 105.0);
    }

    #[test]
    fn missing_axis_words_hold_current_position() {
        let machine = machine();
        let modal = ModalState::default();
        let coords = StubCoords {
            offsets: [[0.0; 9]; 13],
            active: CoordIndex::G54,
            tlo: 0.0,
        };
        let block = ParserBlock::default();
        let target = fold_target(&machine, &modal, &coords, &[1.0, 2.0, 3.0], &block, false);
        assert_eq!(target, vec![1.0, 2.0, 3.0]);
    }
}
