//! The capability contract C6 needs from the rest of the runtime: spindle,
//! coolant, tool change, dwell, probing, and the coordinate-system store.
//! Concrete implementations live in the realtime crate; the interpreter
//! only ever sees these traits (§9: macro/inheritance-heavy hierarchies in
//! the source become a single small capability trait here).

use fluidnc_common::axis::MAX_AXES;
use fluidnc_common::error::Error;
use fluidnc_common::modal::{Coolant, CoordIndex, SpindleState};

/// Result of a `G38.x` probing move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeOutcome {
    pub contacted: bool,
    pub stopped_at: [f64; MAX_AXES],
}

pub trait MachineOps {
    fn set_spindle(&mut self, state: SpindleState, speed: f64) -> Result<(), Error>;
    fn set_coolant(&mut self, mask: Coolant);
    fn select_tool(&mut self, tool: u32);
    fn tool_change(&mut self, new_tool: u32) -> Result<(), Error>;
    /// Pauses the main loop while still servicing the realtime queue (§5).
    fn dwell_ms(&mut self, ms: u32);
    /// Drive toward `target_mpos`; returns whether the probe switch
    /// asserted before the programmed distance was covered.
    fn probe(&mut self, target_mpos: &[f64], feed_rate: f64) -> Result<ProbeOutcome, Error>;
    fn program_stop(&mut self, optional: bool);
    fn program_end(&mut self, rewind: bool);
}

/// Coordinate-system store (C13): `G54..G59.3`, `G28`/`G30` stored
/// positions, the `G92` offset, and TLO.
pub trait CoordinateStore {
    fn offset(&self, index: CoordIndex) -> [f64; MAX_AXES];
    fn set_offset(&mut self, index: CoordIndex, values: [f64; MAX_AXES]);
    fn active(&self) -> CoordIndex;
    fn set_active(&mut self, index: CoordIndex);
    fn tlo(&self) -> f64;
    fn set_tlo(&mut self, value: f64);
}
