//! Contracts toward the parts of the system this pipeline never owns: the
//! step-execution context, the spindle/VFD device, a channel's byte
//! transport, and the persistent settings store. The core crates
//! (`fluidnc_gcode`, `fluidnc_rt`) only ever see these traits; concrete
//! drivers live in a deployment's own crate or the `fluidnc` binary's
//! simulation fallback (§5, §9: "macro/inheritance-heavy ... hierarchy is
//! replaced by a single capability trait").

pub mod settings;
pub mod spindle;
pub mod step_engine;
pub mod transport;

pub use settings::{MemorySettingsStore, SettingsStore};
pub use spindle::{Spindle, SpeedMap};
pub use step_engine::{BlockCompletion, ProbeSnapshot, StepEngine};
pub use transport::ChannelTransport;
