//! Maps a numeric G/M word to its modal group (data model §3) so the
//! interpreter can reject two words from the same group landing on one
//! line (`GcodeModalGroupViolation`) and route each word to its handler.

use fluidnc_common::modal::ModalGroup;

/// A decoded `G<code>` word, identified by its (possibly fractional) value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GWord {
    G0,
    G1,
    G2,
    G3,
    G4,
    G10,
    G17,
    G18,
    G19,
    G20,
    G21,
    G28,
    G28_1,
    G30,
    G30_1,
    G38_2,
    G38_3,
    G38_4,
    G38_5,
    G40,
    G43_1,
    G49,
    G53,
    G54,
    G55,
    G56,
    G57,
    G58,
    G59,
    G59_1,
    G59_2,
    G59_3,
    G61,
    G80,
    G90,
    G90_1,
    G91,
    G91_1,
    G92,
    G92_1,
    G93,
    G94,
}

impl GWord {
    pub fn from_value(value: f64) -> Option<Self> {
        // Tenths precision covers every fractional G-code this table uses.
        let scaled = (value * 10.0).round() as i32;
        Some(match scaled {
            0 => GWord::G0,
            10 => GWord::G1,
            20 => GWord::G2,
            30 => GWord::G3,
            40 => GWord::G4,
            100 => GWord::G10,
            170 => GWord::G17,
            180 => GWord::G18,
            190 => GWord::G19,
            200 => GWord::G20,
            210 => GWord::G21,
            280 => GWord::G28,
            281 => GWord::G28_1,
            300 => GWord::G30,
            301 => GWord::G30_1,
            382 => GWord::G38_2,
            383 => GWord::G38_3,
            384 => GWord::G38_4,
            385 => GWord::G38_5,
            400 => GWord::G40,
            431 => GWord::G43_1,
            490 => GWord::G49,
            530 => GWord::G53,
            540 => GWord::G54,
            550 => GWord::G55,
            560 => GWord::G56,
            570 => GWord::G57,
            580 => GWord::G58,
            590 => GWord::G59,
            591 => GWord::G59_1,
            592 => GWord::G59_2,
            593 => GWord::G59_3,
            610 => GWord::G61,
            800 => GWord::G80,
            900 => GWord::G90,
            901 => GWord::G90_1,
            910 => GWord::G91,
            911 => GWord::G91_1,
            920 => GWord::G92,
            921 => GWord::G92_1,
            930 => GWord::G93,
            940 => GWord::G94,
            _ => return None,
        })
    }

    pub fn group(self) -> ModalGroup {
        use GWord::*;
        match self {
            G4 | G10 | G28 | G28_1 | G30 | G30_1 | G53 | G92 | G92_1 => ModalGroup::NonModal,
            G0 | G1 | G2 | G3 | G38_2 | G38_3 | G38_4 | G38_5 | G80 => ModalGroup::Motion,
            G17 | G18 | G19 => ModalGroup::Plane,
            G90 | G91 => ModalGroup::Distance,
            G90_1 | G91_1 => ModalGroup::ArcDistance,
            G93 | G94 => ModalGroup::FeedRateMode,
            G20 | G21 => ModalGroup::Units,
            G40 => ModalGroup::CutterCompensation,
            G43_1 | G49 => ModalGroup::ToolLengthOffset,
            G54 | G55 | G56 | G57 | G58 | G59 | G59_1 | G59_2 | G59_3 => ModalGroup::CoordSystem,
            G61 => ModalGroup::ControlMode,
        }
    }
}

/// A decoded `M<code>` word.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MWord {
    M0,
    M1,
    M2,
    M3,
    M4,
    M5,
    M6,
    M7,
    M8,
    M9,
    M30,
    M48,
    M49,
    M56,
    M62,
    M63,
    M64,
    M65,
    M66,
    M67,
    M68,
}

impl MWord {
    pub fn from_value(value: f64) -> Option<Self> {
        let code = value.round() as i32;
        Some(match code {
            0 => MWord::M0,
            1 => MWord::M1,
            2 => MWord::M2,
            3 => MWord::M3,
            4 => MWord::M4,
            5 => MWord::M5,
            6 => MWord::M6,
            7 => MWord::M7,
            8 => MWord::M8,
            9 => MWord::M9,
            30 => MWord::M30,
            48 => MWord::M48,
            49 => MWord::M49,
            56 => MWord::M56,
            62 => MWord::M62,
            63 => MWord::M63,
            64 => MWord::M64,
            65 => MWord::M65,
            66 => MWord::M66,
            67 => MWord::M67,
            68 => MWord::M68,
            _ => return None,
        })
    }

    pub fn group(self) -> ModalGroup {
        use MWord::*;
        match self {
            M0 | M1 | M2 | M30 => ModalGroup::ProgramFlow,
            M3 | M4 | M5 => ModalGroup::Spindle,
            M6 => ModalGroup::ToolChange,
            M7 | M8 | M9 => ModalGroup::Coolant,
            M48 | M49 | M56 => ModalGroup::OverrideControl,
            M62 | M63 | M64 | M65 | M66 | M67 | M68 => ModalGroup::UserIo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_g_codes_resolve() {
        assert_eq!(GWord::from_value(38.2), Some(GWord::G38_2));
        assert_eq!(GWord::from_value(59.1), Some(GWord::G59_1));
    }

    #[test]
    fn motion_words_share_one_modal_group() {
        assert_eq!(GWord::G0.group(), ModalGroup::Motion);
        assert_eq!(GWord::G1.group(), ModalGroup::Motion);
        assert_eq!(GWord::G38_2.group(), ModalGroup::Motion);
    }

    #[test]
    fn unknown_code_is_none() {
        assert_eq!(GWord::from_value(99.0), None);
    }
}
