//! Parameter references (`#nnn`, `#<name>`, `##<...>` indirection) and the
//! environment contract the evaluator reads/writes them through.
//!
//! Grounded in `Parameters.cpp`'s `get_param_ref`/`get_param`/`set_param`:
//! a `#` is followed by either another `#` (indirection through a
//! computed id), `<name>` (named parameter), `[expr]` (computed id), or a
//! bare numeral (literal id).

use fluidnc_common::error::Error;
use fluidnc_common::parameters::{is_global_name, NamedParams, NumberedParams};

use crate::eval::evaluate_expression;
use crate::number::read_float;

#[derive(Debug, Clone, PartialEq)]
pub enum ParamRef {
    Numbered(u32),
    Named(String),
}

/// Everything the evaluator needs from the surrounding interpreter: the two
/// parameter scopes plus the two LinuxCNC-ism escape hatches (`_system`
/// read-only state and `/config/item` settings access), which the gcode
/// crate's job context actually implements. Default stubs let `fluidnc_expr`
/// be tested standalone.
pub trait ExprEnv: NumberedParams + NamedParams {
    /// Read-only derived state exposed as `#_name` (e.g. `#_absolute`,
    /// `#_imperial`). Returns `None` if `name` isn't a recognized system
    /// parameter, distinct from "named parameter not yet assigned".
    fn get_system_param(&self, _name: &str) -> Option<f64> {
        None
    }

    fn get_config_item(&self, _path: &str) -> Option<f64> {
        None
    }

    fn set_config_item(&mut self, _path: &str, _value: f64) {}
}

impl ParamRef {
    /// Parse a parameter reference, entry condition: `#` already consumed,
    /// `*pos` points at the following character.
    pub fn parse(line: &[u8], pos: &mut usize, env: &mut dyn ExprEnv) -> Result<Self, Error> {
        match line.get(*pos) {
            Some(b'#') => {
                *pos += 1;
                let inner = Self::parse(line, pos, env)?;
                let id = get_value(&inner, env)?;
                Ok(ParamRef::Numbered(id as u32))
            }
            Some(b'<') => {
                *pos += 1;
                let mut name = String::new();
                loop {
                    match line.get(*pos) {
                        Some(b'>') => {
                            *pos += 1;
                            break;
                        }
                        Some(&c) => {
                            name.push(c as char);
                            *pos += 1;
                        }
                        None => return Err(Error::ExpressionBadParameter),
                    }
                }
                Ok(ParamRef::Named(name))
            }
            Some(b'[') => {
                let id = evaluate_expression(line, pos, env)?;
                Ok(ParamRef::Numbered(id as u32))
            }
            Some(_) => {
                let id = read_float(line, pos).ok_or(Error::ExpressionBadParameter)?;
                Ok(ParamRef::Numbered(id as u32))
            }
            None => Err(Error::ExpressionBadParameter),
        }
    }
}

/// Read the current value of a parameter reference.
pub fn get_value(param: &ParamRef, env: &mut dyn ExprEnv) -> Result<f64, Error> {
    match param {
        ParamRef::Numbered(id) => Ok(env.get_numbered(*id)),
        ParamRef::Named(name) => {
            if let Some(path) = name.strip_prefix('/') {
                return env
                    .get_config_item(path)
                    .ok_or(Error::ExpressionBadParameter);
            }
            if is_global_name(name) {
                if let Some(v) = env.get_system_param(name) {
                    return Ok(v);
                }
            }
            Ok(env.get_named(name).unwrap_or(0.0))
        }
    }
}

/// Write a value through a parameter reference. Read-only numbered slots
/// are silently ignored (§4.2), not an error.
pub fn set_value(param: &ParamRef, value: f64, env: &mut dyn ExprEnv) -> Result<(), Error> {
    match param {
        ParamRef::Numbered(id) => {
            env.set_numbered(*id, value);
            Ok(())
        }
        ParamRef::Named(name) => {
            if let Some(path) = name.strip_prefix('/') {
                env.set_config_item(path, value);
                return Ok(());
            }
            env.set_named(name, value);
            Ok(())
        }
    }
}

/// Whether `name` (already stripped of `#<...>` delimiters) names an
/// assigned parameter, for the `EXISTS[...]` unary function. LinuxCNC
/// accepts both `EXISTS[#<_foo>]` and the bare `EXISTS[_foo]` spelling.
pub fn named_param_exists(raw: &str, env: &dyn ExprEnv) -> bool {
    let search = raw
        .strip_prefix("#<")
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(raw);
    if search.is_empty() {
        return false;
    }
    if let Some(path) = search.strip_prefix('/') {
        return env.get_config_item(path).is_some();
    }
    if is_global_name(search) && env.get_system_param(search).is_some() {
        return true;
    }
    env.named_exists(search)
}

/// A pending `#ref=value` assignment, queued during block parsing and
/// applied only after the motion the block describes has been queued
/// (§3: "deferred assignment queue" — assignments must not be visible to
/// the same block's own axis-word evaluation).
#[derive(Debug, Default)]
pub struct PendingAssignments(Vec<(ParamRef, f64)>);

impl PendingAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, param: ParamRef, value: f64) {
        self.0.push((param, value));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Apply every queued assignment, in program order, then clear the queue.
    pub fn apply(&mut self, env: &mut dyn ExprEnv) -> Result<(), Error> {
        for (param, value) in self.0.drain(..) {
            set_value(&param, value, env)?;
        }
        Ok(())
    }
}

/// Parse and queue a `#ref=value` assignment. Entry condition: the leading
/// `#` has already been consumed.
pub fn parse_assignment(
    line: &[u8],
    pos: &mut usize,
    env: &mut dyn ExprEnv,
    queue: &mut PendingAssignments,
) -> Result<(), Error> {
    let param = ParamRef::parse(line, pos, env)?;
    if line.get(*pos) != Some(&b'=') {
        return Err(Error::ExpressionSyntaxError);
    }
    *pos += 1;
    let value = crate::eval::read_number(line, pos, env, true)?;
    queue.push(param, value);
    Ok(())
}
