//! Realtime state machine (C10), homing/probing coordinator (C11),
//! spindle/coolant orchestration (C12), parameter store (C13), and the
//! `MachineOps`/`ExprEnv` glue that ties them to the step-execution context
//! and the G-code interpreter.
//!
//! This crate is what actually runs on a machine: `fluidnc_gcode` decides
//! what a line of G-code means, `fluidnc_planner`/`fluidnc_kinematics`
//! decide how to move, and this crate is the part in between that tracks
//! *where the machine currently is in its own lifecycle* and carries out
//! the non-motion side effects (spindle, coolant, tool, parameters) that
//! interpretation produces.

pub mod command;
pub mod ops;
pub mod params;
pub mod session;
pub mod spindle;
pub mod state;

pub use command::homing::{HomingCoordinator, HomingOutcome};
pub use ops::Runtime;
pub use params::ParameterStore;
pub use session::Session;
pub use spindle::{SimulatedSpindle, SpindleCoolant, SysSuspend};
pub use state::machine::{MachineEvent, RealtimeStateMachine, RunState, TransitionResult};
