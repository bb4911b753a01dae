//! `ExprEnv` adapter (C2/C8 glue).
//!
//! `fluidnc_gcode::interpreter::process_line` takes the expression
//! environment and the coordinate store as two independently borrowed
//! `&mut dyn` parameters, yet a numbered-parameter read of `#5221` (a work
//! offset) and a `CoordinateStore::offset` read of the same G55 table are
//! the same data (§6, §4.13) — they can't be backed by two independently
//! owned copies without the two drifting out of sync. A single struct
//! implementing both traits can't be passed as both parameters in one
//! call (Rust won't allow two live `&mut` borrows of it at once), so the
//! backing [`ParameterStore`] lives behind an `Rc<RefCell<_>>`: `Session`
//! holds one handle for `ExprEnv`, [`CoordsHandle`] is a second handle for
//! `CoordinateStore`, and the runtime passes `&mut session` and `&mut
//! session.coords()` as the two separate parameters the interpreter wants.
//!
//! `Session` also keeps its own stack of local-parameter frames, since it
//! can't hold a live `&mut JobStack` to delegate to the active
//! `JobFrame.locals` either (same two-parameters-one-value problem, against
//! `job` this time) — the runtime pushes/pops this stack in lockstep with
//! `JobStack::nest`/`unnest`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use fluidnc_common::axis::MAX_AXES;
use fluidnc_common::error::Error;
use fluidnc_common::modal::CoordIndex;
use fluidnc_common::parameters::{is_global_name, NamedParams, NumberedParams};
use fluidnc_expr::ExprEnv;
use fluidnc_gcode::ops::CoordinateStore;
use fluidnc_hal::SettingsStore;

use crate::params::ParameterStore;

/// Binds the numbered-parameter store to a job-stack-shaped local-scope
/// stack, giving the interpreter one `ExprEnv` it can evaluate expressions
/// against.
pub struct Session<S: SettingsStore> {
    numbered: Rc<RefCell<ParameterStore<S>>>,
    globals: HashMap<String, f64>,
    /// One entry per currently-nested job frame; `locals[0]` is the
    /// top-level frame, `locals.last()` is the active one.
    locals: Vec<HashMap<String, f64>>,
}

impl<S: SettingsStore> Session<S> {
    pub fn new(numbered: ParameterStore<S>) -> Self {
        Self { numbered: Rc::new(RefCell::new(numbered)), globals: HashMap::new(), locals: vec![HashMap::new()] }
    }

    /// A second, independent handle onto the same backing store, for the
    /// `coords: &mut dyn CoordinateStore` parameter alongside `&mut self`
    /// as `env`.
    pub fn coords(&self) -> CoordsHandle<S> {
        CoordsHandle(Rc::clone(&self.numbered))
    }

    pub fn load(&mut self, axis_count: usize) {
        self.numbered.borrow_mut().load(axis_count);
    }

    pub fn persist(&mut self) -> Result<(), Error> {
        self.numbered.borrow_mut().persist()
    }

    pub fn set_tool(&mut self, tool: u32) {
        self.numbered.borrow_mut().set_tool(tool);
    }

    pub fn set_work_position(&mut self, wpos: [f64; MAX_AXES]) {
        self.numbered.borrow_mut().set_work_position(wpos);
    }

    /// Call exactly when the runtime calls `JobStack::nest`.
    pub fn push_frame(&mut self) {
        self.locals.push(HashMap::new());
    }

    /// Call exactly when the runtime calls `JobStack::unnest`.
    pub fn pop_frame(&mut self) {
        if self.locals.len() > 1 {
            self.locals.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.locals.len()
    }

    fn top(&self) -> &HashMap<String, f64> {
        self.locals.last().expect("Session always has at least the top-level frame")
    }

    fn top_mut(&mut self) -> &mut HashMap<String, f64> {
        self.locals.last_mut().expect("Session always has at least the top-level frame")
    }
}

impl<S: SettingsStore> NumberedParams for Session<S> {
    fn get_numbered(&self, id: u32) -> f64 {
        self.numbered.borrow().get_numbered(id)
    }

    fn set_numbered(&mut self, id: u32, value: f64) {
        self.numbered.borrow_mut().set_numbered(id, value);
    }
}

impl<S: SettingsStore> NamedParams for Session<S> {
    fn get_named(&self, name: &str) -> Option<f64> {
        if is_global_name(name) {
            self.globals.get(name).copied()
        } else {
            self.top().get(name).copied()
        }
    }

    fn set_named(&mut self, name: &str, value: f64) {
        if is_global_name(name) {
            self.globals.insert(name.to_string(), value);
        } else {
            self.top_mut().insert(name.to_string(), value);
        }
    }
}

impl<S: SettingsStore> ExprEnv for Session<S> {}

/// The `CoordinateStore` half of a [`Session`]'s shared backing store —
/// see the module doc for why this is a second handle instead of `Session`
/// implementing `CoordinateStore` directly.
pub struct CoordsHandle<S: SettingsStore>(Rc<RefCell<ParameterStore<S>>>);

impl<S: SettingsStore> CoordinateStore for CoordsHandle<S> {
    fn offset(&self, index: CoordIndex) -> [f64; MAX_AXES] {
        self.0.borrow().offset(index)
    }

    fn set_offset(&mut self, index: CoordIndex, values: [f64; MAX_AXES]) {
        self.0.borrow_mut().set_offset(index, values);
    }

    fn active(&self) -> CoordIndex {
        self.0.borrow().active()
    }

    fn set_active(&mut self, index: CoordIndex) {
        self.0.borrow_mut().set_active(index);
    }

    fn tlo(&self) -> f64 {
        self.0.borrow().tlo()
    }

    fn set_tlo(&mut self, value: f64) {
        self.0.borrow_mut().set_tlo(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluidnc_hal::MemorySettingsStore;

    fn session() -> Session<MemorySettingsStore> {
        Session::new(ParameterStore::new(MemorySettingsStore::new()))
    }

    #[test]
    fn locals_do_not_cross_a_pushed_frame() {
        let mut s = session();
        s.set_named("foo", 1.0);
        s.push_frame();
        assert_eq!(s.get_named("foo"), None, "nested frame shouldn't see the parent's locals");
        s.set_named("foo", 2.0);
        s.pop_frame();
        assert_eq!(s.get_named("foo"), Some(1.0), "parent frame's locals survive the nested call");
    }

    #[test]
    fn globals_survive_frame_pop() {
        let mut s = session();
        s.set_named("_bar", 5.0);
        s.push_frame();
        assert_eq!(s.get_named("_bar"), Some(5.0));
        s.set_named("_bar", 6.0);
        s.pop_frame();
        assert_eq!(s.get_named("_bar"), Some(6.0));
    }

    #[test]
    fn popping_the_top_level_frame_is_a_no_op() {
        let mut s = session();
        s.set_named("x", 1.0);
        s.pop_frame();
        assert_eq!(s.get_named("x"), Some(1.0));
    }
}
