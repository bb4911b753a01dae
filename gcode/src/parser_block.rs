//! The per-line working record (data model §3): modal deltas proposed by
//! one line, axis targets, and the non-axis parameter words, plus the
//! duplicate/modal-group bookkeeping C6 needs while collecting words.

use std::collections::HashSet;

use fluidnc_common::axis::MAX_AXES;
use fluidnc_common::error::Error;
use fluidnc_common::modal::ModalGroup;

use crate::classify::{GWord, MWord};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NonAxisWords {
    pub feed: Option<f64>,
    pub spindle_speed: Option<f64>,
    pub tool: Option<f64>,
    pub dwell_p: Option<f64>,
    pub q: Option<f64>,
    pub radius: Option<f64>,
    pub i: Option<f64>,
    pub j: Option<f64>,
    pub k: Option<f64>,
    pub l: Option<f64>,
    pub line_number: Option<f64>,
    pub o_label: Option<f64>,
    pub e: Option<f64>,
}

/// Everything one line proposes, before it's validated and folded into a
/// target / dispatched to its handlers.
#[derive(Debug, Default)]
pub struct ParserBlock {
    pub gwords: Vec<GWord>,
    pub mwords: Vec<MWord>,
    pub axis_words: [Option<f64>; MAX_AXES],
    pub non_axis: NonAxisWords,
    seen_groups: HashSet<ModalGroupKey>,
    seen_letters: HashSet<char>,
}

/// `ModalGroup` doesn't derive `Hash`/`Eq` (only `PartialEq`); wrap it in a
/// small key so two words of one group can be detected with a `HashSet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ModalGroupKey(u8);

fn group_key(group: ModalGroup) -> ModalGroupKey {
    ModalGroupKey(match group {
        ModalGroup::NonModal => 0,
        ModalGroup::Motion => 1,
        ModalGroup::Plane => 2,
        ModalGroup::Distance => 3,
        ModalGroup::ArcDistance => 4,
        ModalGroup::FeedRateMode => 5,
        ModalGroup::Units => 6,
        ModalGroup::CutterCompensation => 7,
        ModalGroup::ToolLengthOffset => 8,
        ModalGroup::CoordSystem => 9,
        ModalGroup::ControlMode => 10,
        ModalGroup::ProgramFlow => 11,
        ModalGroup::UserIo => 12,
        ModalGroup::ToolChange => 13,
        ModalGroup::Spindle => 14,
        ModalGroup::Coolant => 15,
        ModalGroup::OverrideControl => 16,
    })
}

impl ParserBlock {
    pub fn add_gword(&mut self, word: GWord) -> Result<(), Error> {
        // NonModal words (G4, G10, G28, G92, ...) are one-shot and several
        // may coexist on legacy lines in practice, but RS274 still treats
        // each as its own slot; only reject true same-group collisions
        // within the truly-modal groups.
        if word.group() != ModalGroup::NonModal {
            let key = group_key(word.group());
            if !self.seen_groups.insert(key) {
                return Err(Error::GcodeModalGroupViolation);
            }
        }
        self.gwords.push(word);
        Ok(())
    }

    pub fn add_mword(&mut self, word: MWord) -> Result<(), Error> {
        let key = group_key(word.group());
        if word.group() != ModalGroup::Coolant && !self.seen_groups.insert(key) {
            return Err(Error::GcodeModalGroupViolation);
        }
        self.mwords.push(word);
        Ok(())
    }

    pub fn set_axis(&mut self, index: usize, value: f64) -> Result<(), Error> {
        if index >= MAX_AXES {
            return Err(Error::GcodeAxisWordsExist);
        }
        if self.axis_words[index].is_some() {
            return Err(Error::GcodeWordRepeated);
        }
        self.axis_words[index] = Some(value);
        Ok(())
    }

    pub fn has_axis_words(&self) -> bool {
        self.axis_words.iter().any(Option::is_some)
    }

    pub fn mark_letter(&mut self, letter: char) -> Result<(), Error> {
        if !self.seen_letters.insert(letter) {
            return Err(Error::GcodeWordRepeated);
        }
        Ok(())
    }

    pub fn motion(&self) -> Option<GWord> {
        self.gwords.iter().copied().find(|g| g.group() == ModalGroup::Motion)
    }
}
