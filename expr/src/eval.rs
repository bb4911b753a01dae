//! The `[...]` expression grammar: `read_number` dispatches between a plain
//! literal, a `#`-parameter, a unary function call, and a nested bracketed
//! expression; [`evaluate_expression`] runs the legacy precedence-climbing
//! two-stack algorithm over a `[a op b op c ...]` term list.

use fluidnc_common::error::Error;

use crate::number::read_float;
use crate::ops::{self, BinaryOp, UnaryOp};
use crate::param::{self, ExprEnv, ParamRef};

/// Maximum number of pending (value, operator) pairs before the expression
/// is rejected as too deeply nested. Matches the legacy `MAX_STACK`; RS274
/// programs never legitimately need more than a handful of chained operators.
pub const MAX_STACK: usize = 7;

/// Read a numeric term: a literal, a `#`-parameter (possibly with nested
/// `##` indirection), a bracketed sub-expression, or — only when
/// `in_expression` is set, since their names would otherwise collide with
/// G-code words — a signed term or a unary function call.
pub fn read_number(
    line: &[u8],
    pos: &mut usize,
    env: &mut dyn ExprEnv,
    in_expression: bool,
) -> Result<f64, Error> {
    match line.get(*pos) {
        Some(b'#') => {
            *pos += 1;
            let param_ref = ParamRef::parse(line, pos, env)?;
            param::get_value(&param_ref, env)
        }
        Some(b'[') => evaluate_expression(line, pos, env),
        Some(&c) if in_expression && c.is_ascii_alphabetic() => read_unary(line, pos, env),
        Some(b'-') if in_expression => {
            *pos += 1;
            Ok(-read_number(line, pos, env, in_expression)?)
        }
        Some(b'+') if in_expression => {
            *pos += 1;
            read_number(line, pos, env, in_expression)
        }
        _ => read_float(line, pos).ok_or(Error::BadNumberFormat),
    }
}

/// Read and apply a unary function call: `NAME[expr]`, with `ATAN` taking a
/// second `/[expr]` argument and `EXISTS` taking a raw parameter name
/// instead of evaluating its bracketed contents.
fn read_unary(line: &[u8], pos: &mut usize, env: &mut dyn ExprEnv) -> Result<f64, Error> {
    let op = UnaryOp::read(line, pos)?.ok_or(Error::ExpressionUnknownOp)?;
    if line.get(*pos) != Some(&b'[') {
        return Err(Error::ExpressionSyntaxError);
    }

    if op == UnaryOp::Exists {
        *pos += 1;
        let start = *pos;
        while line.get(*pos).is_some_and(|&c| c != b']') {
            *pos += 1;
        }
        if line.get(*pos) != Some(&b']') {
            return Err(Error::ExpressionSyntaxError);
        }
        let arg = std::str::from_utf8(&line[start..*pos]).map_err(|_| Error::ExpressionSyntaxError)?;
        let exists = param::named_param_exists(arg, env);
        *pos += 1;
        return Ok(if exists { 1.0 } else { 0.0 });
    }

    let value = evaluate_expression(line, pos, env)?;
    if op == UnaryOp::Atan {
        if line.get(*pos) != Some(&b'/') {
            return Err(Error::ExpressionSyntaxError);
        }
        *pos += 1;
        if line.get(*pos) != Some(&b'[') {
            return Err(Error::ExpressionSyntaxError);
        }
        let x = evaluate_expression(line, pos, env)?;
        return Ok(ops::atan2_degrees(value, x));
    }
    ops::execute_unary(value, op)
}

/// Evaluate a `[term op term op term ...]` expression, entry condition:
/// `line[*pos] == '['`.
///
/// Standard precedence climbing: read a term, then so long as the next
/// token is a binary operator binding at least as tightly as `min_prec`,
/// fold it in by recursing for its right-hand side at one precedence level
/// higher (left-associative). The closing `]` is recognized directly,
/// never mistaken for an operator, and its consumption propagates back
/// through every enclosing recursive call so nesting depth and expression
/// extent stay in sync.
pub fn evaluate_expression(line: &[u8], pos: &mut usize, env: &mut dyn ExprEnv) -> Result<f64, Error> {
    if line.get(*pos) != Some(&b'[') {
        return Err(Error::GcodeUnsupportedCommand);
    }
    *pos += 1;
    let (value, closed) = parse_expr(line, pos, env, 0, 0)?;
    if !closed {
        return Err(Error::ExpressionSyntaxError);
    }
    Ok(value)
}

/// Returns `(value, closing_bracket_was_consumed)`. `depth` bounds
/// left-hand chain length against [`MAX_STACK`], matching the legacy
/// evaluator's fixed-size operand stack.
fn parse_expr(
    line: &[u8],
    pos: &mut usize,
    env: &mut dyn ExprEnv,
    min_prec: u8,
    depth: usize,
) -> Result<(f64, bool), Error> {
    if depth >= MAX_STACK {
        return Err(Error::ExpressionStackOverflow);
    }
    let mut lhs = read_number(line, pos, env, true)?;
    loop {
        if line.get(*pos) == Some(&b']') {
            *pos += 1;
            return Ok((lhs, true));
        }
        let save = *pos;
        let op = BinaryOp::read(line, pos)?;
        if op.precedence() < min_prec {
            *pos = save;
            return Ok((lhs, false));
        }
        let (rhs, closed) = parse_expr(line, pos, env, op.precedence() + 1, depth + 1)?;
        lhs = ops::execute_binary(lhs, op, rhs)?;
        if closed {
            return Ok((lhs, true));
        }
    }
}
