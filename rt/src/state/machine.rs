//! Top-level realtime state machine (§4.10, C10).
//!
//! Generalizes the teacher's `MachineStateMachine`/`TransitionResult`/
//! `handle_event` idiom from the five-state servo lifecycle to the ten CNC
//! run states. This module only tracks *which* state the machine is in and
//! whether a transition is legal; it owns no planner, job-stack, or channel
//! state — those are mutated by the caller as a side effect of a successful
//! transition (mirrors the original split between state ownership and
//! execution).

use fluidnc_common::error::Error;

/// One of the ten run states (§4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Cycle,
    Hold,
    Jog,
    Homing,
    Alarm,
    ConfigAlarm,
    SafetyDoor,
    CheckMode,
    Sleep,
}

/// Result of a transition attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionResult {
    Ok(RunState),
    Rejected(&'static str),
}

/// Event posted by a channel, the ISR layer, or the step engine (§4.10,
/// §5). Override events, `Macro`, and `PinEvent` never change `RunState` by
/// themselves; they are dispatched here purely so the caller has one event
/// type to route, and `handle_event` echoes the current state back.
#[derive(Debug, Clone, PartialEq)]
pub enum MachineEvent {
    /// Ctrl-X. `motion_in_progress` is true if a block was mid-stroke, which
    /// routes the machine to `Alarm` instead of `Idle`.
    Reset { motion_in_progress: bool },
    StatusReport,
    /// `queued_blocks` is true if the planner holds unstarted blocks.
    CycleStart { queued_blocks: bool },
    FeedHold,
    SafetyDoorOpened,
    SafetyDoorClosed,
    JogCancel,
    JogRequested,
    /// `allowed` reflects whether configuration permits homing from `Alarm`.
    HomingRequested { allowed: bool },
    HomingComplete,
    HomingFailed(Error),
    BlockCompleted { planner_empty: bool },
    AlarmRaised(Error),
    /// `$X`.
    Unlock,
    ConfigReloaded,
    CheckModeToggle,
    SleepRequested,
    FeedOverride,
    RapidOverride,
    SpindleOverride,
    Macro(u8),
    PinEvent { pin: u8, active: bool },
}

/// Owns the current run state plus the small amount of context needed to
/// resolve `Reset`/`SafetyDoor` correctly.
#[derive(Debug, Clone)]
pub struct RealtimeStateMachine {
    state: RunState,
    door_open: bool,
    alarm_cause: Option<Error>,
}

impl RealtimeStateMachine {
    pub const fn new() -> Self {
        Self {
            state: RunState::Idle,
            door_open: false,
            alarm_cause: None,
        }
    }

    #[inline]
    pub const fn state(&self) -> RunState {
        self.state
    }

    #[inline]
    pub const fn door_open(&self) -> bool {
        self.door_open
    }

    pub fn alarm_cause(&self) -> Option<&Error> {
        self.alarm_cause.as_ref()
    }

    /// Whether the machine currently accepts new motion blocks.
    #[inline]
    pub const fn accepts_motion(&self) -> bool {
        matches!(self.state, RunState::Idle | RunState::Cycle | RunState::Jog)
    }

    pub fn handle_event(&mut self, event: MachineEvent) -> TransitionResult {
        use MachineEvent::*;
        use RunState::*;

        // Events that never change RunState are dispatched up front so the
        // transition table below stays a pure state x event map.
        match &event {
            StatusReport | FeedOverride | RapidOverride | SpindleOverride | Macro(_)
            | PinEvent { .. } => return TransitionResult::Ok(self.state),
            _ => {}
        }

        if let Reset { motion_in_progress } = event {
            return self.handle_reset(motion_in_progress);
        }

        let next = match (self.state, event) {
            (Idle, CycleStart { queued_blocks: true }) => Cycle,
            (Idle, CheckModeToggle) => CheckMode,
            (CheckMode, CheckModeToggle) => Idle,
            (Idle, SleepRequested) => Sleep,

            (Hold, CycleStart { .. }) => Cycle,
            (Cycle, FeedHold) => Hold,

            (Idle, JogRequested) => Jog,
            (Jog, JogCancel) => Idle,

            (SafetyDoor, SafetyDoorClosed) => {
                self.door_open = false;
                return TransitionResult::Ok(SafetyDoor);
            }
            (SafetyDoor, CycleStart { .. }) if !self.door_open => Cycle,
            (SafetyDoor, CycleStart { .. }) => {
                return TransitionResult::Rejected("safety door still open");
            }

            (Idle, HomingRequested { .. }) => Homing,
            (Alarm, HomingRequested { allowed: true }) => Homing,
            (Alarm, HomingRequested { allowed: false }) => {
                return TransitionResult::Rejected("homing not allowed while alarmed");
            }
            (Homing, HomingComplete) => Idle,
            (Homing, HomingFailed(cause)) => {
                self.alarm_cause = Some(cause);
                Alarm
            }

            (Cycle, BlockCompleted { planner_empty: true }) => Idle,
            (s, BlockCompleted { planner_empty: false }) => return TransitionResult::Ok(s),

            (ConfigAlarm, ConfigReloaded) => Idle,

            (Alarm, Unlock) => {
                self.alarm_cause = None;
                Idle
            }

            (s, SafetyDoorOpened) if !matches!(s, Alarm | ConfigAlarm) => {
                self.door_open = true;
                SafetyDoor
            }

            (s, AlarmRaised(cause)) if s != ConfigAlarm => {
                self.alarm_cause = Some(cause);
                Alarm
            }

            (s, event) => {
                return TransitionResult::Rejected(invalid_transition_reason(s, &event));
            }
        };

        self.state = next;
        TransitionResult::Ok(next)
    }

    fn handle_reset(&mut self, motion_in_progress: bool) -> TransitionResult {
        use RunState::*;
        if self.state == ConfigAlarm {
            return TransitionResult::Rejected("config alarm clears only via config reload");
        }
        self.door_open = false;
        if motion_in_progress {
            self.alarm_cause = Some(Error::Reset);
            self.state = Alarm;
        } else {
            self.state = Idle;
        }
        TransitionResult::Ok(self.state)
    }

    /// Force `ConfigAlarm`, bypassing the transition table (config errors
    /// are detected before the machine has a well-defined prior state).
    pub fn force_config_alarm(&mut self) {
        self.state = RunState::ConfigAlarm;
    }
}

impl Default for RealtimeStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid_transition_reason(state: RunState, event: &MachineEvent) -> &'static str {
    match (state, event) {
        (RunState::ConfigAlarm, _) => "config alarm clears only via config reload",
        (RunState::Alarm, _) => "alarm requires reset or unlock",
        _ => "event not valid in current state",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_start_from_idle_requires_queued_blocks() {
        let mut m = RealtimeStateMachine::new();
        assert_eq!(
            m.handle_event(MachineEvent::CycleStart { queued_blocks: false }),
            TransitionResult::Rejected("event not valid in current state")
        );
        assert_eq!(
            m.handle_event(MachineEvent::CycleStart { queued_blocks: true }),
            TransitionResult::Ok(RunState::Cycle)
        );
    }

    #[test]
    fn feed_hold_then_cycle_start_resumes() {
        let mut m = RealtimeStateMachine::new();
        m.handle_event(MachineEvent::CycleStart { queued_blocks: true });
        assert_eq!(m.handle_event(MachineEvent::FeedHold), TransitionResult::Ok(RunState::Hold));
        assert_eq!(
            m.handle_event(MachineEvent::CycleStart { queued_blocks: false }),
            TransitionResult::Ok(RunState::Cycle)
        );
    }

    #[test]
    fn reset_mid_stroke_alarms_instead_of_idling() {
        let mut m = RealtimeStateMachine::new();
        m.handle_event(MachineEvent::CycleStart { queued_blocks: true });
        let result = m.handle_event(MachineEvent::Reset { motion_in_progress: true });
        assert_eq!(result, TransitionResult::Ok(RunState::Alarm));
        assert!(m.alarm_cause().is_some());
    }

    #[test]
    fn reset_idle_returns_to_idle() {
        let mut m = RealtimeStateMachine::new();
        m.handle_event(MachineEvent::CycleStart { queued_blocks: true });
        let result = m.handle_event(MachineEvent::Reset { motion_in_progress: false });
        assert_eq!(result, TransitionResult::Ok(RunState::Idle));
    }

    #[test]
    fn door_must_close_before_cycle_start_resumes() {
        let mut m = RealtimeStateMachine::new();
        m.handle_event(MachineEvent::CycleStart { queued_blocks: true });
        m.handle_event(MachineEvent::SafetyDoorOpened);
        assert_eq!(m.state(), RunState::SafetyDoor);
        assert!(matches!(
            m.handle_event(MachineEvent::CycleStart { queued_blocks: false }),
            TransitionResult::Rejected(_)
        ));
        m.handle_event(MachineEvent::SafetyDoorClosed);
        assert_eq!(
            m.handle_event(MachineEvent::CycleStart { queued_blocks: false }),
            TransitionResult::Ok(RunState::Cycle)
        );
    }

    #[test]
    fn alarm_raised_forces_alarm_from_any_non_config_state() {
        let mut m = RealtimeStateMachine::new();
        m.handle_event(MachineEvent::CycleStart { queued_blocks: true });
        let result = m.handle_event(MachineEvent::AlarmRaised(Error::HomingFailApproach));
        assert_eq!(result, TransitionResult::Ok(RunState::Alarm));
        assert_eq!(m.alarm_cause(), Some(&Error::HomingFailApproach));
    }

    #[test]
    fn config_alarm_only_clears_via_config_reload() {
        let mut m = RealtimeStateMachine::new();
        m.force_config_alarm();
        assert!(matches!(
            m.handle_event(MachineEvent::Reset { motion_in_progress: false }),
            TransitionResult::Rejected(_)
        ));
        assert!(matches!(
            m.handle_event(MachineEvent::Unlock),
            TransitionResult::Rejected(_)
        ));
        assert_eq!(
            m.handle_event(MachineEvent::ConfigReloaded),
            TransitionResult::Ok(RunState::Idle)
        );
    }

    #[test]
    fn homing_from_alarm_requires_configuration_to_allow_it() {
        let mut m = RealtimeStateMachine::new();
        m.handle_event(MachineEvent::AlarmRaised(Error::HomingFailApproach));
        assert!(matches!(
            m.handle_event(MachineEvent::HomingRequested { allowed: false }),
            TransitionResult::Rejected(_)
        ));
        assert_eq!(
            m.handle_event(MachineEvent::HomingRequested { allowed: true }),
            TransitionResult::Ok(RunState::Homing)
        );
    }

    #[test]
    fn jog_cancel_returns_to_idle() {
        let mut m = RealtimeStateMachine::new();
        m.handle_event(MachineEvent::JogRequested);
        assert_eq!(m.state(), RunState::Jog);
        assert_eq!(m.handle_event(MachineEvent::JogCancel), TransitionResult::Ok(RunState::Idle));
    }
}
