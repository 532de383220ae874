//! Crate-level error type and `Result` alias.
//!
//! Every failure of an evaluation is fatal: nothing here is retried, and the
//! driver stops at the first error it sees.
use crate::parser::{Operator, ParsingError};
use crate::worker::WorkerId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EvalError>;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("parse error: {0}")]
    Parse(#[from] ParsingError),

    #[error("invalid operator {0}")]
    InvalidOperator(String),

    #[error("division by zero ({lhs} / 0)")]
    DivisionByZero { lhs: i64 },

    #[error("arithmetic overflow in {lhs}{op}{rhs}")]
    ArithmeticOverflow { lhs: i64, op: Operator, rhs: i64 },

    #[error("failed to spawn worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("{id} terminated abnormally with status {status}")]
    WorkerFailed { id: WorkerId, status: i32 },

    #[error("malformed worker message: {0}")]
    Protocol(String),

    #[error("input is {len} bytes, limit is {limit}")]
    InputTooLong { len: usize, limit: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EvalError {
    pub fn protocol<E: std::fmt::Display>(e: E) -> Self {
        EvalError::Protocol(e.to_string())
    }
}
