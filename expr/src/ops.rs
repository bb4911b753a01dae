//! Binary and unary operators (ops model §3, grounded in `Expression.cpp`'s
//! `execute_binary1`/`execute_binary2`/`execute_unary`).

use fluidnc_common::error::Error;

/// Equality tolerance for `EQ`/`NE`, matching the legacy `TOLERANCE_EQUAL`.
pub const TOLERANCE_EQUAL: f64 = 0.00001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    DividedBy,
    Modulo,
    Power,
    Times,
    And,
    ExclusiveOr,
    Minus,
    NotExclusiveOr,
    Plus,
    Lt,
    Eq,
    Ne,
    Le,
    Ge,
    Gt,
}

impl BinaryOp {
    /// Precedence level, high binds tighter. Matches the legacy table:
    /// `**` (6) > `* / MOD` (5) > `+ -` (4) > relational (3) > `AND XOR OR` (2).
    pub const fn precedence(self) -> u8 {
        match self {
            BinaryOp::Power => 6,
            BinaryOp::DividedBy | BinaryOp::Modulo | BinaryOp::Times => 5,
            BinaryOp::Minus | BinaryOp::Plus => 4,
            BinaryOp::Lt | BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Le | BinaryOp::Ge | BinaryOp::Gt => 3,
            BinaryOp::And | BinaryOp::ExclusiveOr | BinaryOp::NotExclusiveOr => 2,
        }
    }

    /// Parse an operator keyword/symbol starting at `line[*pos]`. The
    /// caller is responsible for recognizing `]` (end of expression)
    /// before calling this — by the time we're called, a binary operator
    /// is the only valid thing left to read.
    pub fn read(line: &[u8], pos: &mut usize) -> Result<BinaryOp, Error> {
        let Some(&c) = line.get(*pos) else {
            return Err(Error::ExpressionSyntaxError);
        };
        *pos += 1;
        let starts_with = |rest: &[u8]| line[*pos..].starts_with(rest);
        let op = match c {
            b'+' => BinaryOp::Plus,
            b'-' => BinaryOp::Minus,
            b'/' => BinaryOp::DividedBy,
            b'*' => {
                if line.get(*pos) == Some(&b'*') {
                    *pos += 1;
                    BinaryOp::Power
                } else {
                    BinaryOp::Times
                }
            }
            b'A' if starts_with(b"ND") => {
                *pos += 2;
                BinaryOp::And
            }
            b'M' if starts_with(b"OD") => {
                *pos += 2;
                BinaryOp::Modulo
            }
            b'O' if line.get(*pos) == Some(&b'R') => {
                *pos += 1;
                BinaryOp::NotExclusiveOr
            }
            b'X' if starts_with(b"OR") => {
                *pos += 2;
                BinaryOp::ExclusiveOr
            }
            b'E' if line.get(*pos) == Some(&b'Q') => {
                *pos += 1;
                BinaryOp::Eq
            }
            b'N' if line.get(*pos) == Some(&b'E') => {
                *pos += 1;
                BinaryOp::Ne
            }
            b'G' if line.get(*pos) == Some(&b'E') => {
                *pos += 1;
                BinaryOp::Ge
            }
            b'G' if line.get(*pos) == Some(&b'T') => {
                *pos += 1;
                BinaryOp::Gt
            }
            b'L' if line.get(*pos) == Some(&b'E') => {
                *pos += 1;
                BinaryOp::Le
            }
            b'L' if line.get(*pos) == Some(&b'T') => {
                *pos += 1;
                BinaryOp::Lt
            }
            _ => return Err(Error::ExpressionUnknownOp),
        };
        Ok(op)
    }
}

/// Evaluate `lhs op rhs`. The relational/boolean group (precedence <= 3)
/// always yields exactly `1.0` or `0.0`; RS274 leaves the truth
/// representation unspecified beyond "nonzero is true".
pub fn execute_binary(lhs: f64, op: BinaryOp, rhs: f64) -> Result<f64, Error> {
    let truth = |b: bool| if b { 1.0 } else { 0.0 };
    Ok(match op {
        BinaryOp::DividedBy => {
            if rhs == 0.0 {
                return Err(Error::ExpressionDivideByZero);
            }
            lhs / rhs
        }
        BinaryOp::Modulo => {
            let m = lhs % rhs;
            if m < 0.0 {
                m + rhs.abs()
            } else {
                m
            }
        }
        BinaryOp::Power => {
            if lhs < 0.0 && rhs.floor() != rhs {
                return Err(Error::ExpressionInvalidArgument);
            }
            lhs.powf(rhs)
        }
        BinaryOp::Times => lhs * rhs,
        BinaryOp::And => truth(lhs != 0.0 && rhs != 0.0),
        BinaryOp::ExclusiveOr => truth((lhs == 0.0) != (rhs == 0.0)),
        BinaryOp::Minus => lhs - rhs,
        BinaryOp::NotExclusiveOr => truth(lhs != 0.0 || rhs != 0.0),
        BinaryOp::Plus => lhs + rhs,
        BinaryOp::Lt => truth(lhs < rhs),
        BinaryOp::Eq => truth((lhs - rhs).abs() < TOLERANCE_EQUAL),
        BinaryOp::Ne => truth((lhs - rhs).abs() >= TOLERANCE_EQUAL),
        BinaryOp::Le => truth(lhs <= rhs),
        BinaryOp::Ge => truth(lhs >= rhs),
        BinaryOp::Gt => truth(lhs > rhs),
    })
}

/// Unary functions, valid only inside `[...]` expressions (their names
/// would otherwise collide with G-code words).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Abs,
    Acos,
    Asin,
    Atan,
    Cos,
    Exp,
    Fix,
    Fup,
    Ln,
    Round,
    Sin,
    Sqrt,
    Tan,
    Exists,
}

impl UnaryOp {
    pub fn read(line: &[u8], pos: &mut usize) -> Result<Option<Self>, Error> {
        let Some(&c) = line.get(*pos) else {
            return Ok(None);
        };
        *pos += 1;
        let starts_with = |rest: &[u8]| line[*pos..].starts_with(rest);
        let op = match c {
            b'A' if starts_with(b"BS") => {
                *pos += 2;
                Self::Abs
            }
            b'A' if starts_with(b"COS") => {
                *pos += 3;
                Self::Acos
            }
            b'A' if starts_with(b"SIN") => {
                *pos += 3;
                Self::Asin
            }
            b'A' if starts_with(b"TAN") => {
                *pos += 3;
                Self::Atan
            }
            b'C' if starts_with(b"OS") => {
                *pos += 2;
                Self::Cos
            }
            b'E' if starts_with(b"XP") => {
                *pos += 2;
                Self::Exp
            }
            b'E' if starts_with(b"XISTS") => {
                *pos += 5;
                Self::Exists
            }
            b'F' if starts_with(b"IX") => {
                *pos += 2;
                Self::Fix
            }
            b'F' if starts_with(b"UP") => {
                *pos += 2;
                Self::Fup
            }
            b'L' if line.get(*pos) == Some(&b'N') => {
                *pos += 1;
                Self::Ln
            }
            b'R' if starts_with(b"OUND") => {
                *pos += 4;
                Self::Round
            }
            b'S' if starts_with(b"IN") => {
                *pos += 2;
                Self::Sin
            }
            b'S' if starts_with(b"QRT") => {
                *pos += 3;
                Self::Sqrt
            }
            b'T' if starts_with(b"AN") => {
                *pos += 2;
                Self::Tan
            }
            _ => {
                *pos -= 1;
                return Ok(None);
            }
        };
        Ok(Some(op))
    }
}

const DEG_PER_RAD: f64 = 180.0 / std::f64::consts::PI;
const RAD_PER_DEG: f64 = std::f64::consts::PI / 180.0;

/// Apply a unary function. `Exists` is handled by the caller before this is
/// reached (its argument is a raw parameter name, not an expression).
pub fn execute_unary(operand: f64, op: UnaryOp) -> Result<f64, Error> {
    Ok(match op {
        UnaryOp::Abs => operand.abs(),
        UnaryOp::Acos => {
            if !(-1.0..=1.0).contains(&operand) {
                return Err(Error::ExpressionInvalidArgument);
            }
            operand.acos() * DEG_PER_RAD
        }
        UnaryOp::Asin => {
            if !(-1.0..=1.0).contains(&operand) {
                return Err(Error::ExpressionInvalidArgument);
            }
            operand.asin() * DEG_PER_RAD
        }
        UnaryOp::Atan => return Err(Error::ExpressionUnknownOp), // handled specially, two args
        UnaryOp::Cos => (operand * RAD_PER_DEG).cos(),
        UnaryOp::Exp => operand.exp(),
        UnaryOp::Fix => operand.floor(),
        UnaryOp::Fup => operand.ceil(),
        UnaryOp::Ln => {
            if operand <= 0.0 {
                return Err(Error::ExpressionInvalidArgument);
            }
            operand.ln()
        }
        UnaryOp::Round => {
            if operand < 0.0 {
                (operand - 0.5).trunc()
            } else {
                (operand + 0.5).trunc()
            }
        }
        UnaryOp::Sin => (operand * RAD_PER_DEG).sin(),
        UnaryOp::Sqrt => {
            if operand < 0.0 {
                return Err(Error::ExpressionInvalidArgument);
            }
            operand.sqrt()
        }
        UnaryOp::Tan => (operand * RAD_PER_DEG).tan(),
        UnaryOp::Exists => 0.0,
    })
}

/// `ATAN[y]/[x]`: two-argument arctangent, result in degrees.
pub fn atan2_degrees(y: f64, x: f64) -> f64 {
    y.atan2(x) * DEG_PER_RAD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modulo_is_always_nonnegative() {
        assert!((execute_binary(-7.0, BinaryOp::Modulo, 3.0).unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn divide_by_zero_errors() {
        assert_eq!(
            execute_binary(1.0, BinaryOp::DividedBy, 0.0),
            Err(Error::ExpressionDivideByZero)
        );
    }

    #[test]
    fn negative_base_noninteger_power_errors() {
        assert_eq!(
            execute_binary(-2.0, BinaryOp::Power, 0.5),
            Err(Error::ExpressionInvalidArgument)
        );
    }

    #[test]
    fn eq_uses_tolerance() {
        assert_eq!(execute_binary(1.0, BinaryOp::Eq, 1.000001).unwrap(), 1.0);
        assert_eq!(execute_binary(1.0, BinaryOp::Eq, 1.01).unwrap(), 0.0);
    }

    #[test]
    fn precedence_ordering() {
        assert!(BinaryOp::Power.precedence() > BinaryOp::Times.precedence());
        assert!(BinaryOp::Times.precedence() > BinaryOp::Plus.precedence());
        assert!(BinaryOp::Plus.precedence() > BinaryOp::Lt.precedence());
        assert!(BinaryOp::Lt.precedence() > BinaryOp::And.precedence());
    }

    #[test]
    fn round_half_away_from_zero() {
        assert_eq!(execute_unary(2.5, UnaryOp::Round).unwrap(), 3.0);
        assert_eq!(execute_unary(-2.5, UnaryOp::Round).unwrap(), -3.0);
    }
}
