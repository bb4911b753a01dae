//! A `StepEngine` stand-in for the binary's simulation mode: no real ISR
//! or motor driver, just enough state to let the pipeline run end to end
//! without hardware. Every enqueued block completes instantly.

use fluidnc_hal::{BlockCompletion, ProbeSnapshot, StepEngine};
use fluidnc_planner::Block;

pub struct SimulatedStepEngine {
    motor_steps: Vec<i64>,
    steps_per_mm: Vec<f64>,
    blocks_consumed: u64,
    pending_completion: bool,
    pending_probe: Option<ProbeSnapshot>,
}

impl SimulatedStepEngine {
    pub fn new(steps_per_mm: Vec<f64>) -> Self {
        let motor_steps = vec![0; steps_per_mm.len()];
        Self {
            motor_steps,
            steps_per_mm,
            blocks_consumed: 0,
            pending_completion: false,
            pending_probe: None,
        }
    }

    /// Force the next probe poll to report contact at the block's target —
    /// the simulation's substitute for a real probe switch asserting.
    pub fn simulate_probe_contact(&mut self) {
        self.pending_probe = Some(ProbeSnapshot { contacted: true, motor_steps: self.motor_steps.clone() });
    }
}

impl StepEngine for SimulatedStepEngine {
    fn enqueue(&mut self, block: &Block) {
        for (i, mm) in block.target_mpos.iter().enumerate() {
            if let Some(rate) = self.steps_per_mm.get(i) {
                self.motor_steps[i] = (mm * rate).round() as i64;
            }
        }
        self.blocks_consumed += 1;
        self.pending_completion = true;
    }

    fn motor_steps(&self) -> Vec<i64> {
        self.motor_steps.clone()
    }

    fn poll_completion(&mut self) -> Option<BlockCompletion> {
        if self.pending_completion {
            self.pending_completion = false;
            Some(BlockCompletion { blocks_consumed: self.blocks_consumed })
        } else {
            None
        }
    }

    fn poll_probe(&mut self) -> Option<ProbeSnapshot> {
        self.pending_probe.take()
    }

    fn poll_queue_overflow(&mut self) -> bool {
        // Every enqueued block completes instantly, so the simulation can
        // never actually fall behind.
        false
    }

    fn cancel_all(&mut self) {
        self.pending_completion = false;
        self.pending_probe = None;
    }

    fn decelerate_current(&mut self) {
        self.pending_completion = false;
    }

    fn is_busy(&self) -> bool {
        false
    }
}
