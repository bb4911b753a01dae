//! RS-274 modal groups and the parser's modal state record (data model §3).
//!
//! A modal group is a set of G/M words of which at most one may be active
//! at a time. [`ModalState`] holds exactly one member of every group;
//! [`ModalGroup::of`] classifies an incoming word so the interpreter (C6)
//! can detect two words of the same group landing on one line
//! (`Error::GcodeModalGroupViolation`).

use serde::{Deserialize, Serialize};

/// Which of the fourteen modal groups a G/M word belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModalGroup {
    /// G4, G10, G28, G28.1, G30, G30.1, G53, G92, G92.1 — non-modal, one-shot.
    NonModal,
    /// G0, G1, G2, G3, G38.2..G38.5, G80 — motion mode.
    Motion,
    /// G17, G18, G19 — plane selection.
    Plane,
    /// G90, G91 — distance mode.
    Distance,
    /// G90.1, G91.1 — arc IJK distance mode.
    ArcDistance,
    /// G93, G94 — feed rate mode.
    FeedRateMode,
    /// G20, G21 — units.
    Units,
    /// G40 — cutter radius compensation (G41/G42 unsupported).
    CutterCompensation,
    /// G43.1, G49 — tool length offset.
    ToolLengthOffset,
    /// G54..G59 — coordinate system selection.
    CoordSystem,
    /// G61 — control (path) mode.
    ControlMode,
    /// M0, M1, M2, M30 — program flow / stopping.
    ProgramFlow,
    /// M62..M68 — digital/analog I/O.
    UserIo,
    /// M6 — tool change.
    ToolChange,
    /// M3, M4, M5 — spindle turning.
    Spindle,
    /// M7, M8, M9 — coolant (bits, not mutually exclusive in state but
    /// mutually exclusive as words within one block's coolant word).
    Coolant,
    /// M56 — override control.
    OverrideControl,
}

/// Motion mode (modal group `Motion`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MotionMode {
    #[default]
    Seek,
    Linear,
    CwArc,
    CcwArc,
    ProbeToward,
    ProbeTowardNoError,
    ProbeAway,
    ProbeAwayNoError,
    None,
}

/// Plane selection (modal group `Plane`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Plane {
    #[default]
    Xy,
    Zx,
    Yz,
}

impl Plane {
    /// Axis indices `(horizontal, vertical, normal)` for this plane, in the
    /// machine's canonical X=0,Y=1,Z=2 ordering.
    pub const fn axes(self) -> (usize, usize, usize) {
        match self {
            Plane::Xy => (0, 1, 2),
            Plane::Zx => (2, 0, 1),
            Plane::Yz => (1, 2, 0),
        }
    }
}

/// Distance mode (modal group `Distance`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Distance {
    #[default]
    Absolute,
    Incremental,
}

/// Arc IJK distance mode (modal group `ArcDistance`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArcDistance {
    Incremental,
    Absolute,
}

impl Default for ArcDistance {
    /// G91.1 (incremental IJK) is the RS-274 default.
    fn default() -> Self {
        ArcDistance::Incremental
    }
}

/// Feed rate mode (modal group `FeedRateMode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeedRateMode {
    #[default]
    UnitsPerMinute,
    InverseTime,
}

/// Units (modal group `Units`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Units {
    Millimeters,
    Inches,
}

impl Default for Units {
    fn default() -> Self {
        Units::Millimeters
    }
}

impl Units {
    /// Factor to multiply a value in this unit system by to get millimeters.
    pub const fn to_mm_factor(self) -> f64 {
        match self {
            Units::Millimeters => 1.0,
            Units::Inches => 25.4,
        }
    }
}

/// Tool length offset mode (modal group `ToolLengthOffset`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ToolLengthOffsetMode {
    #[default]
    Cancel,
    EnableDynamic,
}

/// Program flow (modal group `ProgramFlow`), set by M0/M1/M2/M30.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProgramFlow {
    #[default]
    Running,
    Paused,
    OptionalStop,
    CompletedM2,
    CompletedM30,
}

/// Spindle turning state (modal group `Spindle`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpindleState {
    #[default]
    Disable,
    Cw,
    Ccw,
}

bitflags::bitflags! {
    /// Coolant mask; M7/M8 set bits, M9 clears both. Unlike most modal
    /// groups this is a bitmask, not a mutually-exclusive enum, because
    /// mist and flood can both be active at once.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct Coolant: u8 {
        const MIST  = 0x01;
        const FLOOD = 0x02;
    }
}

/// Coordinate-system / offset index (data model §3).
///
/// Ordered so that `G54..=G59_3` are contiguous and iterable; `G28`, `G30`,
/// `G92`, and `Tlo` are fixed slots beyond the numbered work systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CoordIndex {
    G54,
    G55,
    G56,
    G57,
    G58,
    G59,
    G59_1,
    G59_2,
    G59_3,
    G28,
    G30,
    G92,
    Tlo,
}

impl CoordIndex {
    /// The nine numbered work coordinate systems, in selection order.
    pub const WORK_SYSTEMS: [CoordIndex; 9] = [
        CoordIndex::G54,
        CoordIndex::G55,
        CoordIndex::G56,
        CoordIndex::G57,
        CoordIndex::G58,
        CoordIndex::G59,
        CoordIndex::G59_1,
        CoordIndex::G59_2,
        CoordIndex::G59_3,
    ];

    /// All thirteen slots, for iterating a full coordinate-system store.
    pub const ALL: [CoordIndex; 13] = [
        CoordIndex::G54,
        CoordIndex::G55,
        CoordIndex::G56,
        CoordIndex::G57,
        CoordIndex::G58,
        CoordIndex::G59,
        CoordIndex::G59_1,
        CoordIndex::G59_2,
        CoordIndex::G59_3,
        CoordIndex::G28,
        CoordIndex::G30,
        CoordIndex::G92,
        CoordIndex::Tlo,
    ];

    /// Only `G92` is cleared on reset and not persisted across boots by
    /// default (see DESIGN.md's open question on G92 persistence).
    pub const fn persists_across_reset(self) -> bool {
        !matches!(self, CoordIndex::G92)
    }
}

/// The currently-active modal state: exactly one member of each modal
/// group (data model §3 invariant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalState {
    pub motion: MotionMode,
    pub plane: Plane,
    pub distance: Distance,
    pub arc_distance: ArcDistance,
    pub feed_rate_mode: FeedRateMode,
    pub units: Units,
    pub cutter_comp_enabled: bool,
    pub tool_length_offset: ToolLengthOffsetMode,
    pub coord_select: CoordIndex,
    pub program_flow: ProgramFlow,
    pub coolant: Coolant,
    pub spindle: SpindleState,
    /// Whether feed/speed overrides are allowed to apply (M48/M49, `Override` group).
    pub overrides_enabled: bool,
}

impl Default for ModalState {
    fn default() -> Self {
        Self {
            motion: MotionMode::default(),
            plane: Plane::default(),
            distance: Distance::default(),
            arc_distance: ArcDistance::default(),
            feed_rate_mode: FeedRateMode::default(),
            units: Units::default(),
            cutter_comp_enabled: false,
            tool_length_offset: ToolLengthOffsetMode::default(),
            coord_select: CoordIndex::G54,
            program_flow: ProgramFlow::default(),
            coolant: Coolant::empty(),
            spindle: SpindleState::default(),
            overrides_enabled: true,
        }
    }
}
