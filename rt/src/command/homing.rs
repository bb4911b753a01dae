//! Homing cycle supervisor (§4.11, C11).
//!
//! Drives one configured homing cycle (a group of axes sharing a `cycle`
//! index) through approach/pulloff/feed/final-pulloff. This module only
//! supervises — it decides when a phase is complete and what the next
//! target offset is — the actual step generation is the step engine's job
//! (`fluidnc_hal::StepEngine`), driven by the runtime from the targets this
//! coordinator produces.

use fluidnc_common::axis::{AxisId, HomingConfig, MachineConfig};
use fluidnc_common::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Approach,
    Pulloff,
    Feed,
    FinalPulloff,
    Done,
}

/// Per-axis bookkeeping within the cycle currently running.
#[derive(Debug, Clone)]
struct AxisHomer {
    axis: AxisId,
    config: HomingConfig,
    max_travel_mm: f64,
    phase: Phase,
    /// True once this axis's current phase has seen its switch assert (or,
    /// for pulloff phases, has cleared the distance target).
    phase_done: bool,
}

impl AxisHomer {
    fn new(axis: AxisId, config: HomingConfig, max_travel_mm: f64) -> Self {
        Self { axis, config, max_travel_mm, phase: Phase::Approach, phase_done: false }
    }

    /// Rate for the axis's current phase, mm/min.
    fn rate(&self) -> f64 {
        match self.phase {
            Phase::Approach | Phase::Pulloff | Phase::FinalPulloff => self.config.seek_rate,
            Phase::Feed => self.config.feed_rate,
            Phase::Done => 0.0,
        }
    }

    /// Signed target distance for the axis's current phase, mm. Approach
    /// and feed move toward the switch (capped at 1.5x travel, §4.11 step
    /// 1); pulloff phases move away by `pulloff_mm`.
    fn target_delta(&self) -> f64 {
        let sign = if self.config.positive_direction { 1.0 } else { -1.0 };
        match self.phase {
            Phase::Approach | Phase::Feed => sign * 1.5 * self.max_travel_mm,
            Phase::Pulloff | Phase::FinalPulloff => -sign * self.config.pulloff_mm,
            Phase::Done => 0.0,
        }
    }

    fn is_approach_like(&self) -> bool {
        matches!(self.phase, Phase::Approach | Phase::Feed)
    }

    /// Advance one tick. `switch_asserted` only matters during
    /// approach/feed; pulloff phases complete once `traveled_mm` (signed,
    /// relative to the start of the current phase) reaches the phase's
    /// target distance.
    fn tick(&mut self, switch_asserted: bool, traveled_mm: f64) {
        if self.phase == Phase::Done {
            return;
        }
        let reached = if self.is_approach_like() {
            switch_asserted
        } else {
            traveled_mm.abs() >= self.config.pulloff_mm - f64::EPSILON
        };
        if reached {
            self.phase_done = true;
        }
    }

    fn advance_phase(&mut self) {
        self.phase = match self.phase {
            Phase::Approach => Phase::Pulloff,
            Phase::Pulloff => Phase::Feed,
            Phase::Feed => Phase::FinalPulloff,
            Phase::FinalPulloff => Phase::Done,
            Phase::Done => Phase::Done,
        };
        self.phase_done = false;
    }
}

/// Outcome of one coordinator tick.
#[derive(Debug, Clone, PartialEq)]
pub enum HomingOutcome {
    /// Still moving; `targets` gives `(axis, rate_mm_per_min, delta_mm)` for
    /// every axis still active in the current phase.
    InProgress { targets: Vec<(AxisId, f64, f64)> },
    /// The whole homing sequence completed; results give each axis's
    /// configured origin to assign as its new `mpos`.
    Complete { origins: Vec<(AxisId, f64)> },
    Failed(Error),
}

/// Supervises every configured homing cycle in order (§4.11).
pub struct HomingCoordinator {
    /// Axes grouped by `cycle` index, ascending.
    cycles: Vec<Vec<AxisHomer>>,
    current_cycle: usize,
    /// True only for the very first tick of a cycle's approach phase, used
    /// to detect simultaneously-asserting opposing switches.
    cycle_first_tick: bool,
}

impl HomingCoordinator {
    /// Build the coordinator from the machine's configured axes. Axes with
    /// no `homing` config never participate.
    pub fn new(machine: &MachineConfig) -> Self {
        let mut by_cycle: std::collections::BTreeMap<u8, Vec<AxisHomer>> = Default::default();
        for axis in &machine.axes {
            if let Some(homing) = axis.homing {
                by_cycle
                    .entry(homing.cycle)
                    .or_default()
                    .push(AxisHomer::new(axis.id, homing, axis.max_travel_mm));
            }
        }
        Self {
            cycles: by_cycle.into_values().collect(),
            current_cycle: 0,
            cycle_first_tick: true,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.current_cycle >= self.cycles.len()
    }

    /// Advance every axis in the currently-running cycle by one tick.
    /// `switches` and `traveled` are indexed the same way as the targets
    /// returned from the previous tick (same axis order).
    pub fn tick(&mut self, switches: &[(AxisId, bool)], traveled: &[(AxisId, f64)]) -> HomingOutcome {
        if self.is_complete() {
            return HomingOutcome::Complete { origins: Vec::new() };
        }

        let cycle = &mut self.cycles[self.current_cycle];

        if self.cycle_first_tick {
            let asserted: Vec<AxisId> = switches
                .iter()
                .filter(|(_, asserted)| *asserted)
                .map(|(axis, _)| *axis)
                .collect();
            if asserted.len() > 1 {
                return HomingOutcome::Failed(Error::HomingAmbiguousSwitch);
            }
            self.cycle_first_tick = false;
        }

        for homer in cycle.iter_mut() {
            if homer.phase == Phase::Done {
                continue;
            }
            let asserted = switches.iter().any(|(a, v)| *a == homer.axis && *v);
            let moved = traveled.iter().find(|(a, _)| *a == homer.axis).map(|(_, d)| *d).unwrap_or(0.0);
            homer.tick(asserted, moved);
            if homer.phase_done {
                homer.advance_phase();
            }
        }

        if cycle.iter().all(|h| h.phase == Phase::Done) {
            let origins: Vec<(AxisId, f64)> = cycle.iter().map(|h| (h.axis, h.config.mpos)).collect();
            self.current_cycle += 1;
            self.cycle_first_tick = true;
            return HomingOutcome::Complete { origins };
        }

        let targets = cycle
            .iter()
            .filter(|h| h.phase != Phase::Done)
            .map(|h| (h.axis, h.rate(), h.target_delta()))
            .collect();
        HomingOutcome::InProgress { targets }
    }

    /// Abort the in-progress cycle (door opened, reset, or timeout); the
    /// caller decides which `Error` variant applies.
    pub fn abort(&mut self) {
        self.current_cycle = self.cycles.len();
    }
}

/// `$H` failure classification the caller raises when a configured timeout
/// elapses without the expected switch transition.
pub fn timeout_error(phase_is_approach: bool) -> Error {
    if phase_is_approach {
        Error::HomingFailApproach
    } else {
        Error::HomingFailPulloff
    }
}
