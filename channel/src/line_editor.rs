//! Line assembly (§4.9): realtime bytes are picked off before anything else,
//! CR/LF/CR-LF/LF-CR all terminate a line as a single terminator, backspace
//! shrinks the buffer on an interactive channel, and an overlong line is
//! dropped until the next terminator and reported as `LineLengthExceeded`.

use fluidnc_common::error::Error;

use crate::realtime::{Decoded, RealtimeDecoder, RealtimeEvent};

/// Default buffer cap (§4.9: "max_line (≈256)").
pub const DEFAULT_MAX_LINE: usize = 256;

const BACKSPACE: u8 = 0x08;
const DEL: u8 = 0x7F;

/// What pushing one byte through the editor produced.
pub enum LineEvent {
    /// Out-of-band realtime command; never touches the line buffer.
    Realtime(RealtimeEvent),
    /// A full line is ready, CR/LF-stripped.
    Line(String),
    /// The line overflowed `max_line`; bytes up to the next terminator are
    /// being discarded.
    Overflow,
    /// Byte was buffered or otherwise consumed with no line yet ready.
    Pending,
}

/// Per-channel line assembler. One instance per channel, long-lived.
pub struct LineEditor {
    buf: Vec<u8>,
    max_line: usize,
    interactive: bool,
    overflowed: bool,
    /// True immediately after a CR, so a following LF is absorbed instead
    /// of starting an empty second line (and symmetrically for LF-then-CR).
    last_terminator: Option<u8>,
    realtime: RealtimeDecoder,
}

impl LineEditor {
    pub fn new(interactive: bool) -> Self {
        Self {
            buf: Vec::new(),
            max_line: DEFAULT_MAX_LINE,
            interactive,
            overflowed: false,
            last_terminator: None,
            realtime: RealtimeDecoder::new(),
        }
    }

    pub fn with_max_line(mut self, max_line: usize) -> Self {
        self.max_line = max_line;
        self
    }

    /// Push one byte from the transport through the editor.
    pub fn push(&mut self, byte: u8) -> LineEvent {
        match self.realtime.feed(byte) {
            Decoded::Event(event) => return LineEvent::Realtime(event),
            Decoded::Pending => return LineEvent::Pending,
            Decoded::NotRealtime => {}
        }

        if byte == b'\r' || byte == b'\n' {
            // CR immediately followed by LF (or vice versa) is one terminator.
            if self.last_terminator == Some(if byte == b'\r' { b'\n' } else { b'\r' }) {
                self.last_terminator = None;
                return LineEvent::Pending;
            }
            self.last_terminator = Some(byte);
            let was_overflowed = self.overflowed;
            self.overflowed = false;
            if was_overflowed {
                self.buf.clear();
                return LineEvent::Overflow;
            }
            let line = String::from_utf8_lossy(&self.buf).into_owned();
            self.buf.clear();
            return LineEvent::Line(line);
        }
        self.last_terminator = None;

        if (byte == BACKSPACE || byte == DEL) && self.interactive {
            self.buf.pop();
            return LineEvent::Pending;
        }

        if self.overflowed {
            return LineEvent::Pending;
        }
        if self.buf.len() >= self.max_line {
            self.overflowed = true;
            tracing::debug!(max_line = self.max_line, "line buffer overflow");
            return LineEvent::Pending;
        }
        self.buf.push(byte);
        LineEvent::Pending
    }

    /// Convert an overflow marker into the error the channel should ack with.
    pub fn overflow_error() -> Error {
        Error::LineLengthExceeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_line(editor: &mut LineEditor, s: &str) -> Vec<LineEvent> {
        s.bytes().map(|b| editor.push(b)).collect()
    }

    fn only_line(events: Vec<LineEvent>) -> String {
        events
            .into_iter()
            .find_map(|e| match e {
                LineEvent::Line(l) => Some(l),
                _ => None,
            })
            .expect("expected exactly one line")
    }

    #[test]
    fn cr_lf_and_crlf_all_terminate_one_line() {
        for terminator in ["\n", "\r", "\r\n", "\n\r"] {
            let mut editor = LineEditor::new(false);
            let input = format!("G1 X1{terminator}");
            let events = feed_line(&mut editor, &input);
            let lines: Vec<_> = events
                .into_iter()
                .filter(|e| matches!(e, LineEvent::Line(_)))
                .collect();
            assert_eq!(lines.len(), 1, "terminator {terminator:?} produced {} lines", lines.len());
        }
    }

    #[test]
    fn backspace_shrinks_buffer_on_interactive_channel() {
        let mut editor = LineEditor::new(true);
        feed_line(&mut editor, "G1 X1X");
        editor.push(BACKSPACE);
        let line = only_line(vec![editor.push(b'\n')]);
        assert_eq!(line, "G1 X1");
    }

    #[test]
    fn overlong_line_is_reported_as_overflow_not_text() {
        let mut editor = LineEditor::new(false).with_max_line(4);
        let mut events = feed_line(&mut editor, "ABCDEFGH");
        events.push(editor.push(b'\n'));
        assert!(events.iter().any(|e| matches!(e, LineEvent::Overflow)));
        assert!(!events.iter().any(|e| matches!(e, LineEvent::Line(_))));
    }

    #[test]
    fn realtime_byte_never_reaches_the_buffer() {
        let mut editor = LineEditor::new(false);
        feed_line(&mut editor, "G1");
        editor.push(0x18); // Reset mid-line
        let line = only_line(feed_line(&mut editor, " X1\n"));
        assert_eq!(line, "G1 X1");
    }
}
