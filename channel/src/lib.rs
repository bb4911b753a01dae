//! Channel multiplexer and line editor (spec component C9): turns raw
//! transport bytes into complete G-code lines and realtime events, and
//! periodic status/modal reports into outbound bytes. Never touches
//! modal state or the planner directly — those are the interpreter's
//! (`fluidnc_gcode`) and runtime's (`fluidnc_rt`) job.

pub mod line_editor;
pub mod mux;
pub mod realtime;
pub mod report;

pub use line_editor::{LineEditor, LineEvent, DEFAULT_MAX_LINE};
pub use mux::{Channel, ChannelMux, Intake};
pub use realtime::{Decoded, OverrideStep, PinEvent, RapidLevel, RealtimeDecoder, RealtimeEvent};
pub use report::{format_modal_report, format_status, ReportScheduler, StatusSnapshot};
