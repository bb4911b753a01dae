//! Job stack (spec component C8): the LIFO of input sources feeding lines
//! into the interpreter. Each frame owns its local (macro-scoped) named
//! parameters and its flow-control frame stack (§9: "function-local static
//! recursion in flow control" becomes a field on the job frame, not a
//! process-wide stack).

use std::collections::HashMap;

use fluidnc_common::error::Error;

use crate::flowcontrol::FlowFrame;

/// A source of G-code lines: a live channel or an opened file.
/// `save`/`restore` let a memory-constrained backend close the underlying
/// file handle and reopen it at the recorded byte offset while a deeper
/// frame runs (data model §3).
pub trait JobSource: Send {
    fn next_line(&mut self) -> Option<String>;
    fn position(&self) -> u64;
    fn seek(&mut self, pos: u64);
    fn is_interactive(&self) -> bool;
    fn save(&mut self) {}
    fn restore(&mut self) {}
}

pub struct JobFrame {
    pub source: Box<dyn JobSource>,
    /// The channel id final ok/error routes to for this nesting's top frame.
    pub leader: usize,
    pub locals: HashMap<String, f64>,
    pub flow: Vec<FlowFrame>,
}

#[derive(Default)]
pub struct JobStack {
    frames: Vec<JobFrame>,
}

impl JobStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new source, becoming the active one. The previous top (if
    /// any) is asked to `save()` itself for the duration.
    pub fn nest(&mut self, source: Box<dyn JobSource>, leader: usize) {
        if let Some(top) = self.frames.last_mut() {
            top.source.save();
        }
        self.frames.push(JobFrame {
            source,
            leader,
            locals: HashMap::new(),
            flow: Vec::new(),
        });
    }

    /// Pop the active source, resuming its parent (if any).
    pub fn unnest(&mut self) -> Result<JobFrame, Error> {
        let frame = self.frames.pop().ok_or(Error::FlowControlNotExecutingMacro)?;
        if !frame.flow.is_empty() {
            tracing::debug!(
                unresolved = frame.flow.len(),
                "job frame unnested with unresolved flow-control frames"
            );
        }
        if let Some(top) = self.frames.last_mut() {
            top.source.restore();
        }
        Ok(frame)
    }

    /// Unconditionally drop every frame (`Reset`, §5 cancellation policy).
    pub fn abort(&mut self) {
        self.frames.clear();
    }

    pub fn source_mut(&mut self) -> Option<&mut dyn JobSource> {
        self.frames.last_mut().map(|f| f.source.as_mut())
    }

    pub fn top(&self) -> Option<&JobFrame> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut JobFrame> {
        self.frames.last_mut()
    }

    pub fn leader(&self) -> Option<usize> {
        self.frames.last().map(|f| f.leader)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get_param(&self, name: &str) -> Option<f64> {
        self.frames.last().and_then(|f| f.locals.get(name).copied())
    }

    pub fn set_param(&mut self, name: &str, value: f64) {
        if let Some(f) = self.frames.last_mut() {
            f.locals.insert(name.to_string(), value);
        }
    }

    pub fn param_exists(&self, name: &str) -> bool {
        self.frames
            .last()
            .map(|f| f.locals.contains_key(name))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LineSource {
        lines: Vec<String>,
        pos: usize,
    }
    impl JobSource for LineSource {
        fn next_line(&mut self) -> Option<String> {
            let line = self.lines.get(self.pos).cloned();
            self.pos += 1;
            line
        }
        fn position(&self) -> u64 {
            self.pos as u64
        }
        fn seek(&mut self, pos: u64) {
            self.pos = pos as usize;
        }
        fn is_interactive(&self) -> bool {
            false
        }
    }

    #[test]
    fn locals_are_scoped_to_the_active_frame() {
        let mut stack = JobStack::new();
        stack.nest(
            Box::new(LineSource { lines: vec![], pos: 0 }),
            0,
        );
        stack.set_param("x", 1.0);
        assert_eq!(stack.get_param("x"), Some(1.0));

        stack.nest(
            Box::new(LineSource { lines: vec![], pos: 0 }),
            0,
        );
        assert_eq!(stack.get_param("x"), None, "nested frame shouldn't see the parent's locals");
        stack.unnest().unwrap();
        assert_eq!(stack.get_param("x"), Some(1.0), "unnest restores the parent's scope");
    }

    #[test]
    fn unnest_on_empty_stack_is_an_error() {
        let mut stack = JobStack::new();
        assert!(stack.unnest().is_err());
    }

    #[test]
    fn abort_unwinds_every_frame() {
        let mut stack = JobStack::new();
        stack.nest(Box::new(LineSource { lines: vec![], pos: 0 }), 0);
        stack.nest(Box::new(LineSource { lines: vec![], pos: 0 }), 0);
        stack.abort();
        assert!(stack.is_empty());
    }
}
