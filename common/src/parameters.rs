//! Parameter address space (data model §3, spec §6 summary table).
//!
//! Three scopes exist: **numbered** (`#31`..`#5000` user, plus fixed slots
//! for probe/G28/G30/G92/WCS/tool/wpos results), **local named**
//! (`#<foo>`, scoped to the current job frame), and **global named**
//! (`#<_foo>`, survive job unnest). Numbered-parameter storage is owned by
//! the parameter store (C13, `fluidnc_rt`); named storage is owned by the
//! job stack (C8, `fluidnc_gcode`). This crate only fixes the address
//! layout and the access contract ([`NumberedParams`]) so the expression
//! evaluator (C2, `fluidnc_expr`) can be written against a trait instead of
//! a concrete store.

use crate::modal::CoordIndex;

/// Inclusive range of freely assignable user parameters.
pub const USER_PARAM_MIN: u32 = 31;
pub const USER_PARAM_MAX: u32 = 5000;

/// `#5061..#5069`: probe position per axis. `#5070`: 1 if the last probe
/// contacted, else 0.
pub const PROBE_PARAM_BASE: u32 = 5061;
pub const PROBE_OK_PARAM: u32 = 5070;

/// `#5220`: active work coordinate system index (1-based: 1=G54..9=G59.3).
pub const ACTIVE_WCS_PARAM: u32 = 5220;

/// `#5400`: active tool number.
pub const TOOL_PARAM: u32 = 5400;

/// `#5420..`: current work position, one slot per axis.
pub const WPOS_PARAM_BASE: u32 = 5420;

impl CoordIndex {
    /// Base numbered-parameter address for this coordinate slot's axis 0
    /// value (axis `i`'s value lives at `base + i`), or `None` for slots
    /// with no numbered-parameter mapping (`G59.1..G59.3`, `Tlo`).
    pub const fn numbered_param_base(self) -> Option<u32> {
        match self {
            CoordIndex::G54 => Some(5221),
            CoordIndex::G55 => Some(5241),
            CoordIndex::G56 => Some(5261),
            CoordIndex::G57 => Some(5281),
            CoordIndex::G58 => Some(5301),
            CoordIndex::G59 => Some(5321),
            CoordIndex::G28 => Some(5161),
            CoordIndex::G30 => Some(5181),
            CoordIndex::G92 => Some(5211),
            CoordIndex::G59_1 | CoordIndex::G59_2 | CoordIndex::G59_3 | CoordIndex::Tlo => None,
        }
    }

    /// 1-based WCS index as reported in `#5220`, for the nine numbered
    /// work systems; `None` for the non-WCS slots.
    pub const fn wcs_number(self) -> Option<u32> {
        match self {
            CoordIndex::G54 => Some(1),
            CoordIndex::G55 => Some(2),
            CoordIndex::G56 => Some(3),
            CoordIndex::G57 => Some(4),
            CoordIndex::G58 => Some(5),
            CoordIndex::G59 => Some(6),
            CoordIndex::G59_1 => Some(7),
            CoordIndex::G59_2 => Some(8),
            CoordIndex::G59_3 => Some(9),
            _ => None,
        }
    }
}

/// Classification of a numbered-parameter id, used by the interpreter and
/// the `$#` report to decide how to format it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberedParamKind {
    User,
    Probe,
    CoordSystem(CoordIndex),
    ActiveWcs,
    Tool,
    WorkPosition,
    Unknown,
}

/// Classify a numbered-parameter address (spec §6: "all others result in a
/// 'not found' log and read as 0").
pub fn classify_numbered(id: u32) -> NumberedParamKind {
    use NumberedParamKind::*;
    if (USER_PARAM_MIN..=USER_PARAM_MAX).contains(&id) {
        return User;
    }
    if id == PROBE_OK_PARAM || (PROBE_PARAM_BASE..PROBE_PARAM_BASE + 9).contains(&id) {
        return Probe;
    }
    if id == ACTIVE_WCS_PARAM {
        return ActiveWcs;
    }
    if id == TOOL_PARAM {
        return Tool;
    }
    if (WPOS_PARAM_BASE..WPOS_PARAM_BASE + 9).contains(&id) {
        return WorkPosition;
    }
    for coord in CoordIndex::ALL {
        if let Some(base) = coord.numbered_param_base() {
            if (base..base + 9).contains(&id) {
                return CoordSystem(coord);
            }
        }
    }
    Unknown
}

/// Read/write access to the numbered-parameter namespace (C13's contract
/// toward the expression evaluator and the interpreter).
///
/// Reads of unassigned user parameters return `0.0`, never fail. Writes to
/// read-only slots (probe results, wpos, active-WCS index) are silently
/// ignored, not an error (§4.2).
pub trait NumberedParams {
    fn get_numbered(&self, id: u32) -> f64;
    fn set_numbered(&mut self, id: u32, value: f64);
}

/// Read/write access to local/global named parameters (`#<name>`), owned
/// by the job stack so scope follows frame lifetime.
pub trait NamedParams {
    fn get_named(&self, name: &str) -> Option<f64>;
    fn set_named(&mut self, name: &str, value: f64);
    fn named_exists(&self, name: &str) -> bool {
        self.get_named(name).is_some()
    }
}

/// Whether a named parameter is global (`_`-prefixed, survives unnest) or
/// local to the current job frame.
pub fn is_global_name(name: &str) -> bool {
    name.starts_with('_')
}
