//! Realtime command bytes, alarm codes, and override limits.
//!
//! Realtime commands are single bytes "picked off" of the input stream by
//! the channel multiplexer (C9) before line assembly and posted as events to
//! the realtime state machine (C10); they are never buffered into a line.
//! Values above 0x80 are in the extended-ASCII range, chosen so that they
//! can never appear in a streamed G-code program.

use crate::error::Error;

/// A realtime command byte decoded out-of-band from a channel's input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RealtimeCmd {
    Reset = 0x18,
    StatusReport = b'?',
    CycleStart = b'~',
    FeedHold = b'!',
    SafetyDoor = 0x84,
    JogCancel = 0x85,
    DebugReport = 0x86,
    Macro0 = 0x87,
    Macro1 = 0x88,
    Macro2 = 0x89,
    Macro3 = 0x8a,
    FeedOvrReset = 0x90,
    FeedOvrCoarsePlus = 0x91,
    FeedOvrCoarseMinus = 0x92,
    FeedOvrFinePlus = 0x93,
    FeedOvrFineMinus = 0x94,
    RapidOvrReset = 0x95,
    RapidOvrMedium = 0x96,
    RapidOvrLow = 0x97,
    RapidOvrExtraLow = 0x98,
    SpindleOvrReset = 0x99,
    SpindleOvrCoarsePlus = 0x9A,
    SpindleOvrCoarseMinus = 0x9B,
    SpindleOvrFinePlus = 0x9C,
    SpindleOvrFineMinus = 0x9D,
    SpindleOvrStop = 0x9E,
    CoolantFloodOvrToggle = 0xA0,
    CoolantMistOvrToggle = 0xA1,
}

impl RealtimeCmd {
    /// Decode a raw byte into a realtime command, if it is one.
    pub const fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            0x18 => Self::Reset,
            b'?' => Self::StatusReport,
            b'~' => Self::CycleStart,
            b'!' => Self::FeedHold,
            0x84 => Self::SafetyDoor,
            0x85 => Self::JogCancel,
            0x86 => Self::DebugReport,
            0x87 => Self::Macro0,
            0x88 => Self::Macro1,
            0x89 => Self::Macro2,
            0x8a => Self::Macro3,
            0x90 => Self::FeedOvrReset,
            0x91 => Self::FeedOvrCoarsePlus,
            0x92 => Self::FeedOvrCoarseMinus,
            0x93 => Self::FeedOvrFinePlus,
            0x94 => Self::FeedOvrFineMinus,
            0x95 => Self::RapidOvrReset,
            0x96 => Self::RapidOvrMedium,
            0x97 => Self::RapidOvrLow,
            0x98 => Self::RapidOvrExtraLow,
            0x99 => Self::SpindleOvrReset,
            0x9A => Self::SpindleOvrCoarsePlus,
            0x9B => Self::SpindleOvrCoarseMinus,
            0x9C => Self::SpindleOvrFinePlus,
            0x9D => Self::SpindleOvrFineMinus,
            0x9E => Self::SpindleOvrStop,
            0xA0 => Self::CoolantFloodOvrToggle,
            0xA1 => Self::CoolantMistOvrToggle,
            _ => return None,
        })
    }

    /// Remote-pin realtime prefixes (0xC4/0xC5) are handled separately by
    /// the channel's pin-event decoder; this reports whether `b` is one.
    pub const fn is_pin_event_prefix(b: u8) -> bool {
        b == 0xC4 || b == 0xC5
    }
}

/// Alarm codes raised by [`RealtimeCmd`]-adjacent faults. Distinct from
/// [`crate::error::Error`]: alarms are sticky state, not a per-line ack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Alarm {
    HardLimit = 1,
    SoftLimit = 2,
    AbortCycle = 3,
    ProbeFailInitial = 4,
    ProbeFailContact = 5,
    HomingFailReset = 6,
    HomingFailDoor = 7,
    HomingFailPulloff = 8,
    HomingFailApproach = 9,
    SpindleControl = 10,
    ControlPin = 11,
    HomingAmbiguousSwitch = 12,
}

impl Alarm {
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Classify an [`Error`] as an alarm, if it is alarm-worthy (§7: "C11
    /// failures raise alarms, not errors"). `Error::code()` keeps its own
    /// legacy numbering for the `error:<n>` ack; this mapping is the
    /// separate `ALARM:<n>` stream and uses grbl's alarm numbers instead.
    pub const fn from_error(err: Error) -> Option<Self> {
        match err {
            Error::SoftLimitError => Some(Self::SoftLimit),
            Error::Reset | Error::RealtimeQueueOverflow => Some(Self::AbortCycle),
            Error::ProbeFailInitial => Some(Self::ProbeFailInitial),
            Error::ProbeFailContact => Some(Self::ProbeFailContact),
            Error::HomingFailReset => Some(Self::HomingFailReset),
            Error::HomingFailDoor => Some(Self::HomingFailDoor),
            Error::HomingFailPulloff => Some(Self::HomingFailPulloff),
            Error::HomingFailApproach => Some(Self::HomingFailApproach),
            Error::HomingAmbiguousSwitch => Some(Self::HomingAmbiguousSwitch),
            Error::SpindleControl => Some(Self::SpindleControl),
            Error::ControlPin => Some(Self::ControlPin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Alarm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::HardLimit => "Hard limit triggered",
            Self::SoftLimit => "Soft limit exceeded",
            Self::AbortCycle => "Cycle aborted",
            Self::ProbeFailInitial => "Probe already triggered before move",
            Self::ProbeFailContact => "Probe did not contact workpiece",
            Self::HomingFailReset => "Homing fail: reset",
            Self::HomingFailDoor => "Homing fail: door open",
            Self::HomingFailPulloff => "Homing fail: pulloff",
            Self::HomingFailApproach => "Homing fail: approach",
            Self::SpindleControl => "Spindle control fault",
            Self::ControlPin => "Control pin fault",
            Self::HomingAmbiguousSwitch => "Homing: ambiguous switch state",
        };
        f.write_str(s)
    }
}

/// Feed override bounds and step sizes (percent), matching the legacy table.
pub mod feed_override {
    pub const MIN: u16 = 10;
    pub const MAX: u16 = 200;
    pub const DEFAULT: u16 = 100;
    pub const COARSE_STEP: u16 = 10;
    pub const FINE_STEP: u16 = 1;
}

/// Rapid override is a fixed set of percentages, not a continuous range.
pub mod rapid_override {
    pub const FULL: u16 = 100;
    pub const MEDIUM: u16 = 50;
    pub const LOW: u16 = 25;
    /// Extra-low is configuration-defined and not supported by every build.
    pub const EXTRA_LOW_DEFAULT: u16 = 10;
}

/// Spindle override bounds and step sizes (percent).
pub mod spindle_override {
    pub const MIN: u16 = 10;
    pub const MAX: u16 = 200;
    pub const DEFAULT: u16 = 100;
    pub const COARSE_STEP: u16 = 10;
    pub const FINE_STEP: u16 = 1;
}
