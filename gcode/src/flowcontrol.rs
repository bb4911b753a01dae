//! Flow-control interpreter (spec component C7): structured `IF/WHILE/DO/
//! REPEAT` driven by an `O<label>` prefix, operating over the active job
//! frame's flow stack. Only meaningful when the active job source is a
//! file — interactive channels reject these words outright.

use fluidnc_expr::ExprEnv;
use fluidnc_common::error::Error;

use crate::jobstack::{JobFrame, JobSource};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlowOp {
    If,
    While,
    Do,
    Repeat,
}

/// One nested flow-control frame (data model §3).
#[derive(Debug, Clone)]
pub struct FlowFrame {
    pub o_label: u32,
    pub op: FlowOp,
    pub rewind_position: u64,
    pub expr_text: String,
    pub repeats_remaining: i64,
    pub skip: bool,
    pub handled: bool,
    pub broke: bool,
}

/// The flow-control keyword a line starts with, after its `O<label>` prefix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Keyword {
    If,
    ElseIf,
    Else,
    EndIf,
    While,
    EndWhile,
    Do,
    Repeat,
    EndRepeat,
    Break,
    Continue,
    Return,
    Alarm,
    ErrorWord,
}

impl Keyword {
    pub fn parse(word: &str) -> Option<Self> {
        Some(match word.to_ascii_uppercase().as_str() {
            "IF" => Keyword::If,
            "ELSEIF" => Keyword::ElseIf,
            "ELSE" => Keyword::Else,
            "ENDIF" => Keyword::EndIf,
            "WHILE" => Keyword::While,
            "ENDWHILE" => Keyword::EndWhile,
            "DO" => Keyword::Do,
            "REPEAT" => Keyword::Repeat,
            "ENDREPEAT" => Keyword::EndRepeat,
            "BREAK" => Keyword::Break,
            "CONTINUE" => Keyword::Continue,
            "RETURN" => Keyword::Return,
            "ALARM" => Keyword::Alarm,
            "ERROR" => Keyword::ErrorWord,
            _ => return None,
        })
    }
}

/// What the interpreter should do with the rest of the current line /
/// source position after a flow-control word runs.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowOutcome {
    /// Nothing more to do with this line; read the next one normally.
    Next,
    /// Rewind the active source to this byte offset and read from there.
    Rewind(u64),
    /// The source's RETURN unwound the frame; caller should unnest the job.
    Returned(f64),
    /// ALARM[expr] raises this code.
    Alarm(i32),
    /// ERROR[expr] fails the current line with this code.
    LineError(i32),
}

fn find_matching(frame: &JobFrame, label: u32, op: FlowOp) -> Option<usize> {
    frame
        .flow
        .iter()
        .rposition(|f| f.o_label == label && f.op == op)
}

/// Whether the current frame is inside a skipped (untaken) branch — every
/// line until the matching terminator should be parsed only far enough to
/// recognize further flow-control words.
pub fn is_skipping(frame: &JobFrame) -> bool {
    frame.flow.iter().any(|f| f.skip)
}

/// Handle one flow-control line: `label` is the `O<n>` prefix value,
/// `keyword` + `expr_text` are the rest of the line (already split by the
/// caller), `eval` evaluates `expr_text` as an RS274 expression or integer.
pub fn handle(
    frame: &mut JobFrame,
    label: u32,
    keyword: Keyword,
    expr_value: Option<f64>,
    env: &mut dyn ExprEnv,
) -> Result<FlowOutcome, Error> {
    let _ = env;
    match keyword {
        Keyword::If => {
            let truthy = expr_value.unwrap_or(0.0) != 0.0;
            frame.flow.push(FlowFrame {
                o_label: label,
                op: FlowOp::If,
                rewind_position: frame.source.position(),
                expr_text: String::new(),
                repeats_remaining: 0,
                skip: !truthy,
                handled: truthy,
                broke: false,
            });
            Ok(FlowOutcome::Next)
        }
        Keyword::ElseIf => {
            let idx = find_matching(frame, label, FlowOp::If).ok_or(Error::FlowControlSyntaxError)?;
            let handled = frame.flow[idx].handled;
            if handled {
                frame.flow[idx].skip = true;
            } else {
                let truthy = expr_value.unwrap_or(0.0) != 0.0;
                frame.flow[idx].skip = !truthy;
                if truthy {
                    frame.flow[idx].handled = true;
                }
            }
            Ok(FlowOutcome::Next)
        }
        Keyword::Else => {
            let idx = find_matching(frame, label, FlowOp::If).ok_or(Error::FlowControlSyntaxError)?;
            frame.flow[idx].skip = frame.flow[idx].handled;
            Ok(FlowOutcome::Next)
        }
        Keyword::EndIf => {
            let idx = find_matching(frame, label, FlowOp::If).ok_or(Error::FlowControlSyntaxError)?;
            frame.flow.remove(idx);
            Ok(FlowOutcome::Next)
        }
        Keyword::While => {
            // A bare WHILE (not the tail of a DO) starts a pretest loop.
            if let Some(idx) = find_matching(frame, label, FlowOp::Do) {
                let truthy = expr_value.unwrap_or(0.0) != 0.0;
                if truthy && !frame.flow[idx].broke {
                    let rewind = frame.flow[idx].rewind_position;
                    return Ok(FlowOutcome::Rewind(rewind));
                }
                frame.flow.remove(idx);
                return Ok(FlowOutcome::Next);
            }
            let truthy = expr_value.unwrap_or(0.0) != 0.0;
            frame.flow.push(FlowFrame {
                o_label: label,
                op: FlowOp::While,
                rewind_position: frame.source.position(),
                expr_text: String::new(),
                repeats_remaining: 0,
                skip: !truthy,
                handled: truthy,
                broke: false,
            });
            Ok(FlowOutcome::Next)
        }
        Keyword::EndWhile => {
            let idx = find_matching(frame, label, FlowOp::While).ok_or(Error::FlowControlSyntaxError)?;
            if frame.flow[idx].broke {
                frame.flow.remove(idx);
                return Ok(FlowOutcome::Next);
            }
            let truthy = expr_value.unwrap_or(0.0) != 0.0;
            if truthy {
                let rewind = frame.flow[idx].rewind_position;
                Ok(FlowOutcome::Rewind(rewind))
            } else {
                frame.flow.remove(idx);
                Ok(FlowOutcome::Next)
            }
        }
        Keyword::Do => {
            frame.flow.push(FlowFrame {
                o_label: label,
                op: FlowOp::Do,
                rewind_position: frame.source.position(),
                expr_text: String::new(),
                repeats_remaining: 0,
                skip: false,
                handled: true,
                broke: false,
            });
            Ok(FlowOutcome::Next)
        }
        Keyword::Repeat => {
            let n = expr_value.unwrap_or(0.0) as i64;
            frame.flow.push(FlowFrame {
                o_label: label,
                op: FlowOp::Repeat,
                rewind_position: frame.source.position(),
                expr_text: String::new(),
                repeats_remaining: n,
                skip: n <= 0,
                handled: n > 0,
                broke: false,
            });
            Ok(FlowOutcome::Next)
        }
        Keyword::EndRepeat => {
            let idx = find_matching(frame, label, FlowOp::Repeat).ok_or(Error::FlowControlSyntaxError)?;
            if frame.flow[idx].broke {
                frame.flow.remove(idx);
                return Ok(FlowOutcome::Next);
            }
            frame.flow[idx].repeats_remaining -= 1;
            if frame.flow[idx].repeats_remaining > 0 {
                let rewind = frame.flow[idx].rewind_position;
                Ok(FlowOutcome::Rewind(rewind))
            } else {
                frame.flow.remove(idx);
                Ok(FlowOutcome::Next)
            }
        }
        Keyword::Break => {
            let idx = frame
                .flow
                .iter()
                .rposition(|f| f.o_label == label)
                .ok_or(Error::FlowControlSyntaxError)?;
            for f in frame.flow[idx + 1..].iter_mut() {
                f.broke = true;
            }
            frame.flow[idx].broke = true;
            frame.flow[idx].skip = true;
            Ok(FlowOutcome::Next)
        }
        Keyword::Continue => {
            let idx = frame
                .flow
                .iter()
                .rposition(|f| f.o_label == label)
                .ok_or(Error::FlowControlSyntaxError)?;
            let rewind = frame.flow[idx].rewind_position;
            Ok(FlowOutcome::Rewind(rewind))
        }
        Keyword::Return => {
            frame.flow.clear();
            Ok(FlowOutcome::Returned(expr_value.unwrap_or(0.0)))
        }
        Keyword::Alarm => Ok(FlowOutcome::Alarm(expr_value.unwrap_or(0.0) as i32)),
        Keyword::ErrorWord => Ok(FlowOutcome::LineError(expr_value.unwrap_or(0.0) as i32)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobstack::JobSource;
    use fluidnc_common::parameters::{NamedParams, NumberedParams};

    struct NullSource(u64);
    impl JobSource for NullSource {
        fn next_line(&mut self) -> Option<String> {
            None
        }
        fn position(&self) -> u64 {
            self.0
        }
        fn seek(&mut self, pos: u64) {
            self.0 = pos;
        }
        fn is_interactive(&self) -> bool {
            false
        }
    }

    struct NullEnv;
    impl NumberedParams for NullEnv {
        fn get_numbered(&self, _id: u32) -> f64 {
            0.0
        }
        fn set_numbered(&mut self, _id: u32, _value: f64) {}
    }
    impl NamedParams for NullEnv {
        fn get_named(&self, _name: &str) -> Option<f64> {
            None
        }
        fn set_named(&mut self, _name: &str, _value: f64) {}
    }
    impl ExprEnv for NullEnv {}

    fn frame() -> JobFrame {
        JobFrame {
            source: Box::new(NullSource(0)),
            leader: 0,
            locals: Default::default(),
            flow: Vec::new(),
        }
    }

    #[test]
    fn if_false_skips_until_endif() {
        let mut f = frame();
        let mut env = NullEnv;
        handle(&mut f, 1, Keyword::If, Some(0.0), &mut env).unwrap();
        assert!(is_skipping(&f));
        handle(&mut f, 1, Keyword::EndIf, None, &mut env).unwrap();
        assert!(!is_skipping(&f));
    }

    #[test]
    fn else_flips_skip_state() {
        let mut f = frame();
        let mut env = NullEnv;
        handle(&mut f, 1, Keyword::If, Some(0.0), &mut env).unwrap();
        handle(&mut f, 1, Keyword::Else, None, &mut env).unwrap();
        assert!(!is_skipping(&f));
    }

    #[test]
    fn while_true_rewinds_at_endwhile() {
        let mut f = frame();
        let mut env = NullEnv;
        handle(&mut f, 2, Keyword::While, Some(1.0), &mut env).unwrap();
        let outcome = handle(&mut f, 2, Keyword::EndWhile, Some(1.0), &mut env).unwrap();
        assert!(matches!(outcome, FlowOutcome::Rewind(0)));
    }

    #[test]
    fn while_false_pops_at_endwhile() {
        let mut f = frame();
        let mut env = NullEnv;
        handle(&mut f, 2, Keyword::While, Some(1.0), &mut env).unwrap();
        let outcome = handle(&mut f, 2, Keyword::EndWhile, Some(0.0), &mut env).unwrap();
        assert_eq!(outcome, FlowOutcome::Next);
        assert!(f.flow.is_empty());
    }

    #[test]
    fn repeat_counts_down() {
        let mut f = frame();
        let mut env = NullEnv;
        handle(&mut f, 3, Keyword::Repeat, Some(2.0), &mut env).unwrap();
        let first = handle(&mut f, 3, Keyword::EndRepeat, None, &mut env).unwrap();
        assert!(matches!(first, FlowOutcome::Rewind(_)));
        let second = handle(&mut f, 3, Keyword::EndRepeat, None, &mut env).unwrap();
        assert_eq!(second, FlowOutcome::Next);
        assert!(f.flow.is_empty());
    }

    #[test]
    fn non_positive_repeat_never_enters_the_loop() {
        let mut f = frame();
        let mut env = NullEnv;
        handle(&mut f, 3, Keyword::Repeat, Some(0.0), &mut env).unwrap();
        assert!(is_skipping(&f));
    }

    #[test]
    fn break_marks_skip_until_terminator_pops_it() {
        let mut f = frame();
        let mut env = NullEnv;
        handle(&mut f, 4, Keyword::While, Some(1.0), &mut env).unwrap();
        handle(&mut f, 4, Keyword::Break, None, &mut env).unwrap();
        assert!(is_skipping(&f));
        let outcome = handle(&mut f, 4, Keyword::EndWhile, Some(1.0), &mut env).unwrap();
        assert_eq!(outcome, FlowOutcome::Next);
        assert!(f.flow.is_empty());
    }

    #[test]
    fn unmatched_endif_is_a_syntax_error() {
        let mut f = frame();
        let mut env = NullEnv;
        assert_eq!(
            handle(&mut f, 9, Keyword::EndIf, None, &mut env).unwrap_err(),
            Error::FlowControlSyntaxError
        );
    }
}
