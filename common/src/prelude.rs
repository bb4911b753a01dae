//! Convenience re-exports for downstream crates (`use fluidnc_common::prelude::*;`).

pub use crate::axis::{AxisConfig, AxisId, KinematicsKind, MachineConfig, MAX_AXES, MAX_MOTORS_PER_AXIS};
pub use crate::config::{ConfigError, LoadedConfig};
pub use crate::error::Error;
pub use crate::modal::{CoordIndex, ModalGroup, ModalState, MotionMode, Plane, Units};
pub use crate::parameters::{NamedParams, NumberedParams};
pub use crate::realtime::{Alarm, RealtimeCmd};
