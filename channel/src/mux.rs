//! One channel's cooperative poll loop (§4.9 steps 1-3) and the
//! multiplexer that owns every configured channel. Ack routing to a line's
//! originating channel — or, for a job's final line, to the job leader —
//! is the caller's job (the runtime owns channel ids and the job stack);
//! this crate only hands back which channel a line/event came from.

use fluidnc_common::error::Error;
use fluidnc_hal::ChannelTransport;

use crate::line_editor::{LineEditor, LineEvent};
use crate::realtime::RealtimeEvent;
use crate::report::ReportScheduler;

/// What one poll of a channel produced, in arrival order.
pub enum Intake {
    Line(String),
    Overflow,
    Realtime(RealtimeEvent),
}

pub struct Channel {
    pub id: usize,
    transport: Box<dyn ChannelTransport>,
    editor: LineEditor,
    pub interactive: bool,
    pub report_scheduler: ReportScheduler,
}

impl Channel {
    pub fn new(id: usize, transport: Box<dyn ChannelTransport>, interactive: bool, report_interval_ms: u32) -> Self {
        Self {
            id,
            transport,
            editor: LineEditor::new(interactive),
            interactive,
            report_scheduler: ReportScheduler::new(report_interval_ms),
        }
    }

    pub fn name(&self) -> &str {
        self.transport.name()
    }

    /// Pull every byte currently available and run it through the line
    /// editor, in order (§4.9 step 1-2).
    pub fn poll(&mut self) -> Vec<Intake> {
        let available = self.transport.available();
        if available == 0 {
            return Vec::new();
        }
        let mut buf = vec![0u8; available];
        let n = self.transport.read(&mut buf);
        let mut out = Vec::new();
        for &byte in &buf[..n] {
            match self.editor.push(byte) {
                LineEvent::Line(line) => out.push(Intake::Line(line)),
                LineEvent::Overflow => out.push(Intake::Overflow),
                LineEvent::Realtime(event) => out.push(Intake::Realtime(event)),
                LineEvent::Pending => {}
            }
        }
        out
    }

    pub fn send(&mut self, text: &str) {
        self.transport.write(text.as_bytes());
    }

    pub fn ack_ok(&mut self) {
        self.send("ok\n");
    }

    pub fn ack_error(&mut self, err: Error) {
        self.send(&format!("error:{}\n", err.code()));
    }

    pub fn ack_overflow(&mut self) {
        self.ack_error(crate::line_editor::LineEditor::overflow_error());
    }
}

/// Owns every configured channel and fans out a poll across all of them.
#[derive(Default)]
pub struct ChannelMux {
    channels: Vec<Channel>,
}

impl ChannelMux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel, returning the id it was assigned.
    pub fn add(&mut self, transport: Box<dyn ChannelTransport>, interactive: bool, report_interval_ms: u32) -> usize {
        let id = self.channels.len();
        self.channels.push(Channel::new(id, transport, interactive, report_interval_ms));
        id
    }

    pub fn channel_mut(&mut self, id: usize) -> Option<&mut Channel> {
        self.channels.get_mut(id)
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut Channel> {
        self.channels.iter_mut()
    }

    /// Poll every channel once, returning `(channel_id, intake)` pairs in
    /// channel order. Acks/ordering *within* a channel are preserved by
    /// the per-channel `Vec`; ordering *across* channels is round-robin by
    /// channel id, which the main loop processes strictly in sequence.
    pub fn poll_all(&mut self) -> Vec<(usize, Intake)> {
        let mut out = Vec::new();
        for channel in &mut self.channels {
            for intake in channel.poll() {
                out.push((channel.id, intake));
            }
        }
        out
    }
}
