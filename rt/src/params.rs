//! Parameter store (§4.13, §6, C13): numbered-parameter address space plus
//! the nine work-coordinate systems, `G28`/`G30`, `G92`, and TLO. Wraps a
//! [`SettingsStore`] (the persistent external collaborator) so coordinate
//! systems survive a restart; `G92` is deliberately excluded from
//! persistence (§4.13: "not persisted across reset by default").

use fluidnc_common::axis::MAX_AXES;
use fluidnc_common::error::Error;
use fluidnc_common::modal::CoordIndex;
use fluidnc_common::parameters::{
    classify_numbered, NumberedParamKind, NumberedParams, ACTIVE_WCS_PARAM, PROBE_OK_PARAM,
    PROBE_PARAM_BASE, TOOL_PARAM, WPOS_PARAM_BASE,
};
use fluidnc_gcode::ops::CoordinateStore;
use fluidnc_hal::SettingsStore;
use std::collections::HashMap;

const AXIS_LETTERS: [char; MAX_AXES] = ['x', 'y', 'z', 'a', 'b', 'c', 'u', 'v', 'w'];

fn slot(index: CoordIndex) -> usize {
    CoordIndex::ALL.iter().position(|c| *c == index).expect("CoordIndex::ALL is exhaustive")
}

fn key(index: CoordIndex, axis: usize) -> String {
    format!("coord/{}/{}", coord_name(index), AXIS_LETTERS[axis])
}

fn coord_name(index: CoordIndex) -> &'static str {
    match index {
        CoordIndex::G54 => "g54",
        CoordIndex::G55 => "g55",
        CoordIndex::G56 => "g56",
        CoordIndex::G57 => "g57",
        CoordIndex::G58 => "g58",
        CoordIndex::G59 => "g59",
        CoordIndex::G59_1 => "g59_1",
        CoordIndex::G59_2 => "g59_2",
        CoordIndex::G59_3 => "g59_3",
        CoordIndex::G28 => "g28",
        CoordIndex::G30 => "g30",
        CoordIndex::G92 => "g92",
        CoordIndex::Tlo => "tlo",
    }
}

/// Owns every parameter-addressable piece of machine state the interpreter
/// can read or write through `#`-numbers, plus the `CoordinateStore`
/// surface `fluidnc_gcode` needs directly.
pub struct ParameterStore<S: SettingsStore> {
    store: S,
    offsets: [[f64; MAX_AXES]; 13],
    active: CoordIndex,
    tlo: f64,
    user_params: HashMap<u32, f64>,
    probe_position: [f64; MAX_AXES],
    probe_ok: bool,
    work_position: [f64; MAX_AXES],
    tool: u32,
}

impl<S: SettingsStore> ParameterStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            offsets: [[0.0; MAX_AXES]; 13],
            active: CoordIndex::G54,
            tlo: 0.0,
            user_params: HashMap::new(),
            probe_position: [0.0; MAX_AXES],
            probe_ok: false,
            work_position: [0.0; MAX_AXES],
            tool: 0,
        }
    }

    /// Populate coordinate offsets from the backing store (startup). `G92`
    /// is never read back; it always starts cleared (§4.13).
    pub fn load(&mut self, axis_count: usize) {
        for index in CoordIndex::ALL {
            if index == CoordIndex::G92 {
                continue;
            }
            let slot = slot(index);
            for axis in 0..axis_count.min(MAX_AXES) {
                if let Some(v) = self.store.get(&key(index, axis)) {
                    self.offsets[slot][axis] = v;
                }
            }
        }
    }

    /// Write every persisted coordinate system back to the store and flush.
    pub fn persist(&mut self) -> Result<(), Error> {
        for index in CoordIndex::ALL {
            if index == CoordIndex::G92 {
                continue;
            }
            let slot = slot(index);
            for axis in 0..MAX_AXES {
                self.store.set(&key(index, axis), self.offsets[slot][axis]);
            }
        }
        self.store.commit()
    }

    pub fn set_work_position(&mut self, wpos: [f64; MAX_AXES]) {
        self.work_position = wpos;
    }

    pub fn set_probe_result(&mut self, contacted: bool, position: [f64; MAX_AXES]) {
        self.probe_ok = contacted;
        self.probe_position = position;
    }

    pub fn set_tool(&mut self, tool: u32) {
        self.tool = tool;
    }

    pub fn tool(&self) -> u32 {
        self.tool
    }
}

impl<S: SettingsStore> NumberedParams for ParameterStore<S> {
    fn get_numbered(&self, id: u32) -> f64 {
        match classify_numbered(id) {
            NumberedParamKind::User => self.user_params.get(&id).copied().unwrap_or(0.0),
            NumberedParamKind::Probe => {
                if id == PROBE_OK_PARAM {
                    if self.probe_ok { 1.0 } else { 0.0 }
                } else {
                    let axis = (id - PROBE_PARAM_BASE) as usize;
                    self.probe_position.get(axis).copied().unwrap_or(0.0)
                }
            }
            NumberedParamKind::ActiveWcs => self.active.wcs_number().unwrap_or(1) as f64,
            NumberedParamKind::Tool => self.tool as f64,
            NumberedParamKind::WorkPosition => {
                let axis = (id - WPOS_PARAM_BASE) as usize;
                self.work_position.get(axis).copied().unwrap_or(0.0)
            }
            NumberedParamKind::CoordSystem(index) => {
                let axis = id.checked_sub(index.numbered_param_base().unwrap_or(id)).unwrap_or(0) as usize;
                self.offsets[slot(index)].get(axis).copied().unwrap_or(0.0)
            }
            NumberedParamKind::Unknown => {
                tracing::debug!(id, "numbered parameter not found, read as 0");
                0.0
            }
        }
    }

    fn set_numbered(&mut self, id: u32, value: f64) {
        match classify_numbered(id) {
            NumberedParamKind::User => {
                self.user_params.insert(id, value);
            }
            NumberedParamKind::CoordSystem(index) => {
                let base = index.numbered_param_base().unwrap_or(id);
                let axis = id.saturating_sub(base) as usize;
                if axis < MAX_AXES {
                    self.offsets[slot(index)][axis] = value;
                }
            }
            NumberedParamKind::Probe => {
                // The interpreter writes these directly after every probe
                // move (§4.11: "expose probe coordinates via parameters
                // 5061+"); a `#5070=1` from G-code goes through the same
                // call, which is harmless since a program can't act on it
                // without also having triggered a real probe.
                if id == PROBE_OK_PARAM {
                    self.probe_ok = value != 0.0;
                } else {
                    let axis = (id - PROBE_PARAM_BASE) as usize;
                    if axis < MAX_AXES {
                        self.probe_position[axis] = value;
                    }
                }
            }
            NumberedParamKind::ActiveWcs | NumberedParamKind::Tool | NumberedParamKind::WorkPosition => {
                tracing::debug!(id, "write to read-only numbered parameter ignored");
            }
            NumberedParamKind::Unknown => {
                tracing::debug!(id, value, "write to unknown numbered parameter ignored");
            }
        }
    }
}

impl<S: SettingsStore> CoordinateStore for ParameterStore<S> {
    fn offset(&self, index: CoordIndex) -> [f64; MAX_AXES] {
        self.offsets[slot(index)]
    }

    fn set_offset(&mut self, index: CoordIndex, values: [f64; MAX_AXES]) {
        self.offsets[slot(index)] = values;
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

    fn set_tlo(&mut self, value: f64) {
        self.tlo = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluidnc_hal::MemorySettingsStore;

    #[test]
    fn user_parameters_default_to_zero_and_round_trip() {
        let mut p = ParameterStore::new(MemorySettingsStore::new());
        assert_eq!(p.get_numbered(100), 0.0);
        p.set_numbered(100, 42.0);
        assert_eq!(p.get_numbered(100), 42.0);
    }

    #[test]
    fn g92_does_not_survive_a_reload() {
        let mut p = ParameterStore::new(MemorySettingsStore::new());
        p.set_offset(CoordIndex::G92, [1.0; MAX_AXES]);
        p.persist().unwrap();
        let mut reloaded = ParameterStore::new(p.store);
        reloaded.load(9);
        assert_eq!(reloaded.offset(CoordIndex::G92), [0.0; MAX_AXES]);
    }

    #[test]
    fn g54_offset_survives_persist_and_load() {
        let mut p = ParameterStore::new(MemorySettingsStore::new());
        let mut values = [0.0; MAX_AXES];
        values[0] = 12.5;
        p.set_offset(CoordIndex::G54, values);
        p.persist().unwrap();
        let mut reloaded = ParameterStore::new(p.store);
        reloaded.load(9);
        assert_eq!(reloaded.offset(CoordIndex::G54)[0], 12.5);
    }

    #[test]
    fn probe_result_is_exposed_and_settable_through_numbered_params() {
        let mut p = ParameterStore::new(MemorySettingsStore::new());
        p.set_probe_result(true, [1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(p.get_numbered(PROBE_OK_PARAM), 1.0);
        assert_eq!(p.get_numbered(PROBE_PARAM_BASE), 1.0);
        assert_eq!(p.get_numbered(PROBE_PARAM_BASE + 1), 2.0);
        // The interpreter writes these through the same `set_numbered` call
        // every probe move uses (§4.11), so the write path is functional,
        // not ignored.
        p.set_numbered(PROBE_OK_PARAM, 0.0);
        assert_eq!(p.get_numbered(PROBE_OK_PARAM), 0.0);
    }

    #[test]
    fn active_wcs_reports_one_based_index_and_rejects_direct_writes() {
        let mut p = ParameterStore::new(MemorySettingsStore::new());
        p.set_active(CoordIndex::G55);
        assert_eq!(p.get_numbered(ACTIVE_WCS_PARAM), 2.0);
        p.set_numbered(ACTIVE_WCS_PARAM, 9.0);
        assert_eq!(p.get_numbered(ACTIVE_WCS_PARAM), 2.0, "only set_active changes the selected WCS");
    }

    #[test]
    fn unknown_numbered_parameter_reads_as_zero() {
        let p = ParameterStore::new(MemorySettingsStore::new());
        assert_eq!(p.get_numbered(9_999_999), 0.0);
    }
}
