//! The binary operation every worker performs.

use crate::error::{EvalError, Result};
use crate::parser::Operator;

/// Apply `op` to `lhs` and `rhs`.
///
/// Division truncates toward zero. Overflow is reported instead of wrapping.
pub fn compute(op: Operator, lhs: i64, rhs: i64) -> Result<i64> {
    let value = match op {
        Operator::Add => lhs.checked_add(rhs),
        Operator::Sub => lhs.checked_sub(rhs),
        Operator::Mul => lhs.checked_mul(rhs),
        Operator::Div => {
            if rhs == 0 {
                return Err(EvalError::DivisionByZero { lhs });
            }
            lhs.checked_div(rhs)
        }
    };
    value.ok_or(EvalError::ArithmeticOverflow { lhs, op, rhs })
}

/// Same as [`compute`], for an operator that has not been validated yet.
pub fn compute_symbol(symbol: &str, lhs: i64, rhs: i64) -> Result<i64> {
    compute(symbol.parse()?, lhs, rhs)
}
