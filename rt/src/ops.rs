//! Concrete `MachineOps` (C6's capability contract, §4.11 probing, §4.12
//! spindle/coolant): the piece of the runtime `process_line` actually calls
//! into. Ties together the step-execution context, the spindle/coolant
//! orchestrator, and tool-change bookkeeping.

use fluidnc_common::axis::MAX_AXES;
use fluidnc_common::error::Error;
use fluidnc_common::modal::{Coolant, SpindleState};
use fluidnc_gcode::ops::{MachineOps, ProbeOutcome};
use fluidnc_hal::StepEngine;

use crate::spindle::SpindleCoolant;

/// Order §9 collapses the source machine's ATC/macro/spindle-hook chain
/// into: try an automatic tool changer, else run the configured tool-change
/// macro, else fall through to the spindle device's own hook.
pub enum ToolChangeHook<'a> {
    None,
    Macro(&'a str),
}

pub struct Runtime<E: StepEngine> {
    pub spindle: SpindleCoolant,
    pub step_engine: E,
    tool: u32,
    axis_count: usize,
}

impl<E: StepEngine> Runtime<E> {
    pub fn new(spindle: SpindleCoolant, step_engine: E, axis_count: usize) -> Self {
        Self { spindle, step_engine, tool: 0, axis_count }
    }

    pub fn current_tool(&self) -> u32 {
        self.tool
    }
}

impl<E: StepEngine> MachineOps for Runtime<E> {
    fn set_spindle(&mut self, state: SpindleState, speed: f64) -> Result<(), Error> {
        self.spindle.set_state(state, speed)
    }

    fn set_coolant(&mut self, mask: Coolant) {
        self.spindle.set_coolant(mask);
    }

    fn select_tool(&mut self, tool: u32) {
        self.tool = tool;
    }

    fn tool_change(&mut self, new_tool: u32) -> Result<(), Error> {
        self.spindle.tool_change(new_tool, false)?;
        self.tool = new_tool;
        Ok(())
    }

    fn dwell_ms(&mut self, _ms: u32) {
        // The main loop is responsible for turning this into a polled
        // busy-wait that keeps servicing the realtime queue (§5); this
        // trait method only records the request starts the device-level
        // suspend tracked by `SpindleCoolant::tick_suspend`, which the
        // caller's loop advances.
    }

    fn probe(&mut self, target_mpos: &[f64], _feed_rate: f64) -> Result<ProbeOutcome, Error> {
        // The planner enqueue for the probe move itself happens in the
        // interpreter before this call reaches us only in the sense that
        // `target_mpos`/`feed_rate` describe it; the actual block hand-off
        // to the step engine is the runtime's main-loop job. Here we only
        // block (via polled busy-wait, same shape as a dwell) until the
        // step engine resolves the outstanding probe.
        loop {
            if let Some(snapshot) = self.step_engine.poll_probe() {
                let mut stopped_at = [0.0; MAX_AXES];
                for (i, steps) in snapshot.motor_steps.iter().enumerate().take(self.axis_count) {
                    stopped_at[i] = *steps as f64;
                }
                // Fall back to the commanded target for axes the step
                // engine didn't report (fewer motors than machine axes).
                for i in snapshot.motor_steps.len()..self.axis_count {
                    stopped_at[i] = target_mpos.get(i).copied().unwrap_or(0.0);
                }
                return Ok(ProbeOutcome { contacted: snapshot.contacted, stopped_at });
            }
            if !self.step_engine.is_busy() {
                // Block fully consumed with neither a probe trigger nor an
                // explicit miss snapshot: treat as a clean, uncontacted stop.
                let mut stopped_at = [0.0; MAX_AXES];
                for (i, v) in target_mpos.iter().enumerate().take(self.axis_count) {
                    stopped_at[i] = *v;
                }
                return Ok(ProbeOutcome { contacted: false, stopped_at });
            }
        }
    }

    fn program_stop(&mut self, _optional: bool) {
        self.step_engine.cancel_all();
    }

    fn program_end(&mut self, _rewind: bool) {
        self.step_engine.cancel_all();
        self.spindle.stop().ok();
        self.spindle.set_coolant(Coolant::empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spindle::SimulatedSpindle;
    use fluidnc_planner::Block;

    #[derive(Default)]
    struct FakeStepEngine {
        probe: Option<fluidnc_hal::ProbeSnapshot>,
        busy: bool,
    }

    impl StepEngine for FakeStepEngine {
        fn enqueue(&mut self, _block: &Block) {
            self.busy = true;
        }
        fn motor_steps(&self) -> Vec<i64> {
            vec![0; 3]
        }
        fn poll_completion(&mut self) -> Option<fluidnc_hal::BlockCompletion> {
            None
        }
        fn poll_probe(&mut self) -> Option<fluidnc_hal::ProbeSnapshot> {
            self.busy = false;
            self.probe.take()
        }
        fn poll_queue_overflow(&mut self) -> bool {
            false
        }
        fn cancel_all(&mut self) {
            self.busy = false;
        }
        fn decelerate_current(&mut self) {}
        fn is_busy(&self) -> bool {
            self.busy
        }
    }

    fn runtime(probe: Option<fluidnc_hal::ProbeSnapshot>) -> Runtime<FakeStepEngine> {
        let spindle = SpindleCoolant::new(Box::new(SimulatedSpindle::new(24000.0)));
        Runtime::new(spindle, FakeStepEngine { probe, busy: true }, 3)
    }

    #[test]
    fn probe_returns_contacted_snapshot() {
        let mut rt = runtime(Some(fluidnc_hal::ProbeSnapshot { contacted: true, motor_steps: vec![800, 0, 0] }));
        let outcome = rt.probe(&[10.0, 0.0, 0.0], 50.0).unwrap();
        assert!(outcome.contacted);
        assert_eq!(outcome.stopped_at[0], 800.0);
    }

    #[test]
    fn probe_with_no_snapshot_and_idle_engine_reports_uncontacted() {
        let mut rt = runtime(None);
        rt.step_engine.busy = false;
        let outcome = rt.probe(&[10.0, 0.0, 0.0], 50.0).unwrap();
        assert!(!outcome.contacted);
        assert_eq!(outcome.stopped_at[0], 10.0);
    }

    #[test]
    fn program_end_stops_spindle_and_clears_coolant() {
        let mut rt = runtime(None);
        rt.set_spindle(SpindleState::Cw, 1000.0).unwrap();
        rt.set_coolant(Coolant::FLOOD);
        rt.program_end(false);
        assert_eq!(rt.spindle.get_state(), (SpindleState::Disable, 0.0));
        assert_eq!(rt.spindle.coolant(), Coolant::empty());
    }
}
