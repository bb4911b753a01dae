//! Expression and parameter evaluator (spec component C2).
//!
//! Parses and evaluates the RS274/NGC `[...]` expression grammar — binary
//! operators, unary functions, and `#`-parameter references with nested
//! indirection — against an [`ExprEnv`] supplied by the interpreter (C6/C8).
//! This crate owns grammar and arithmetic only; parameter *storage* lives
//! with whoever implements the trait.

pub mod eval;
pub mod number;
pub mod ops;
pub mod param;

pub use eval::{evaluate_expression, read_number, MAX_STACK};
pub use ops::{execute_binary, execute_unary, BinaryOp, UnaryOp};
pub use param::{named_param_exists, parse_assignment, set_value, ExprEnv, ParamRef, PendingAssignments};

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

    fn eval(s: &str) -> f64 {
        let mut env = TestEnv::default();
        let mut pos = 0;
        evaluate_expression(s.as_bytes(), &mut pos, &mut env).unwrap()
    }

    #[test]
    fn simple_arithmetic_precedence() {
        assert_eq!(eval("[1+2*3]"), 7.0);
        assert_eq!(eval("[2**3+1]"), 9.0);
        assert_eq!(eval("[1+2*3-4/2]"), 5.0);
    }

    #[test]
    fn left_associative_same_precedence() {
        assert_eq!(eval("[10-2-3]"), 5.0);
        assert_eq!(eval("[100/10/2]"), 5.0);
    }

    #[test]
    fn relational_below_arithmetic() {
        assert_eq!(eval("[1+1 EQ 2]"), 1.0);
        assert_eq!(eval("[3 GT 2 AND 1]"), 1.0);
    }

    #[test]
    fn nested_brackets() {
        assert_eq!(eval("[2*[3+4]]"), 14.0);
    }

    #[test]
    fn unary_functions() {
        assert!((eval("[SIN[90]]") - 1.0).abs() < 1e-6);
        assert_eq!(eval("[ABS[-5]]"), 5.0);
        assert_eq!(eval("[ROUND[2.5]]"), 3.0);
        assert_eq!(eval("[FIX[2.9]]"), 2.0);
        assert_eq!(eval("[FUP[2.1]]"), 3.0);
    }

    #[test]
    fn atan_takes_two_arguments() {
        assert!((eval("[ATAN[1]/[1]]") - 45.0).abs() < 1e-6);
    }

    #[test]
    fn parameter_read_write_round_trip() {
        let mut env = TestEnv::default();
        env.set_numbered(100, 42.0);
        let mut pos = 0;
        let v = read_number(b"#100", &mut pos, &mut env, false).unwrap();
        assert_eq!(v, 42.0);
    }

    #[test]
    fn named_parameter_defaults_to_zero_when_unset() {
        let mut env = TestEnv::default();
        let mut pos = 0;
        let v = read_number(b"#<foo>", &mut pos, &mut env, false).unwrap();
        assert_eq!(v, 0.0);
    }

    #[test]
    fn exists_reports_named_parameter_presence() {
        let mut env = TestEnv::default();
        let mut pos = 0;
        assert_eq!(
            evaluate_expression(b"[EXISTS[#<foo>]]", &mut pos, &mut env).unwrap(),
            0.0
        );
        env.set_named("foo", 1.0);
        pos = 0;
        assert_eq!(
            evaluate_expression(b"[EXISTS[#<foo>]]", &mut pos, &mut env).unwrap(),
            1.0
        );
    }

    #[test]
    fn divide_by_zero_propagates_error() {
        let mut env = TestEnv::default();
        let mut pos = 0;
        let err = evaluate_expression(b"[1/0]", &mut pos, &mut env).unwrap_err();
        assert_eq!(err, fluidnc_common::error::Error::ExpressionDivideByZero);
    }

    #[test]
    fn nested_indirection_through_double_hash() {
        let mut env = TestEnv::default();
        env.set_numbered(5, 100.0);
        env.set_numbered(100, 7.0);
        // "##5": leading '#' already consumed by the caller convention, so
        // parsing starts at the second '#'.
        let mut pos = 1;
        let param_ref = crate::ParamRef::parse(b"##5", &mut pos, &mut env).unwrap();
        assert_eq!(param_ref, crate::ParamRef::Numbered(100));
        let mut pos2 = 0;
        assert_eq!(read_number(b"##5", &mut pos2, &mut env, false), Ok(7.0));
    }
}
