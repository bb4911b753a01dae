//! Line tokenization: comment stripping and splitting a line into `letter
//! value` words, evaluating any `#param` or `[expr]` value in place.

use fluidnc_common::error::Error;
use fluidnc_expr::{eval::read_number, param, ExprEnv};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Word {
    pub letter: char,
    pub value: f64,
}

/// Strip `;`-to-EOL and inline `(...)` comments. An unmatched `(` is a
/// syntax error (§4.6 step 1).
pub fn strip_comments(line: &str) -> Result<String, Error> {
    let mut out = String::with_capacity(line.len());
    let mut depth = 0usize;
    for c in line.chars() {
        match c {
            ';' if depth == 0 => break,
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    return Err(Error::InvalidStatement);
                }
                depth -= 1;
            }
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    if depth != 0 {
        return Err(Error::InvalidStatement);
    }
    Ok(out)
}

fn skip_whitespace(line: &[u8], pos: &mut usize) {
    while matches!(line.get(*pos), Some(b' ') | Some(b'\t')) {
        *pos += 1;
    }
}

/// One item in a tokenized line: either a normal `letter value` word or a
/// standalone `#ref=value` parameter assignment, queued by the caller.
pub enum LineItem {
    Word(Word),
    Assignment,
}

/// Pull the next item from the line, starting at `*pos`. Returns `None` at
/// end of line. Assignments are applied directly into `queue` by
/// [`fluidnc_expr::parse_assignment`]; the caller doesn't see their value.
pub fn next_item(
    line: &[u8],
    pos: &mut usize,
    env: &mut dyn ExprEnv,
    queue: &mut fluidnc_expr::PendingAssignments,
) -> Result<Option<LineItem>, Error> {
    skip_whitespace(line, pos);
    match line.get(*pos) {
        None => Ok(None),
        Some(b'#') => {
            *pos += 1;
            param::parse_assignment(line, pos, env, queue)?;
            Ok(Some(LineItem::Assignment))
        }
        Some(&c) if c.is_ascii_alphabetic() => {
            *pos += 1;
            skip_whitespace(line, pos);
            let value = read_number(line, pos, env, false)?;
            Ok(Some(LineItem::Word(Word {
                letter: (c as char).to_ascii_uppercase(),
                value,
            })))
        }
        Some(b'%') => {
            *pos += 1;
            Ok(None)
        }
        Some(_) => Err(Error::ExpectedCommandLetter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluidnc_common::parameters::{NamedParams, NumberedParams};
    use std::collections::HashMap;

    #[derive(Default)]
    struct TestEnv {
        numbered: HashMap<u32, f64>,
        named: HashMap<String, f64>,
    }
    impl NumberedParams for TestEnv {
        fn get_numbered(&self, id: u32) -> f64 {
            *self.numbered.get(&id).unwrap_or(&0.0)
        }
        fn set_numbered(&mut self, id: u32, value: f64) {
            self.numbered.insert(id, value);
        }
    }
    impl NamedParams for TestEnv {
        fn get_named(&self, name: &str) -> Option<f64> {
            self.named.get(name).copied()
        }
        fn set_named(&mut self, name: &str, value: f64) {
            self.named.insert(name.to_string(), value);
        }
    }
    impl ExprEnv for TestEnv {}

    #[test]
    fn strips_semicolon_comment() {
        assert_eq!(strip_comments("G1 X1 ; go there").unwrap(), "G1 X1 ");
    }

    #[test]
    fn strips_inline_paren_comment() {
        assert_eq!(strip_comments("G1 (move) X1").unwrap(), "G1 X1");
    }

    #[test]
    fn unmatched_paren_is_an_error() {
        assert_eq!(strip_comments("G1 X1)").unwrap_err(), Error::InvalidStatement);
    }

    #[test]
    fn tokenizes_letter_value_pairs() {
        let mut env = TestEnv::default();
        let mut queue = fluidnc_expr::PendingAssignments::new();
        let line = b"G1 X10 F600";
        let mut pos = 0;
        let mut words = Vec::new();
        while let Some(LineItem::Word(w)) = next_item(line, &mut pos, &mut env, &mut queue).unwrap() {
            words.push(w);
        }
        assert_eq!(words, vec![
            Word { letter: 'G', value: 1.0 },
            Word { letter: 'X', value: 10.0 },
            Word { letter: 'F', value: 600.0 },
        ]);
    }

    #[test]
    fn assignment_is_queued_not_returned_as_a_word() {
        let mut env = TestEnv::default();
        let mut queue = fluidnc_expr::PendingAssignments::new();
        let line = b"#100=[2+3*4]";
        let mut pos = 0;
        let item = next_item(line, &mut pos, &mut env, &mut queue).unwrap();
        assert!(matches!(item, Some(LineItem::Assignment)));
        assert!(next_item(line, &mut pos, &mut env, &mut queue).unwrap().is_none());
        queue.apply(&mut env).unwrap();
        assert_eq!(env.get_numbered(100), 14.0);
    }
}
