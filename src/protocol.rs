//! Wire format between the driver and a worker subprocess.
//!
//! One JSON object per line. The driver writes a single [`WorkRequest`] to
//! the worker's stdin and reads a single [`WorkResponse`] from its stdout.

use crate::error::{EvalError, Result};
use crate::parser::Operator;
use serde::{Deserialize, Serialize};

/// Request from driver to worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkRequest {
    /// Compute `lhs op rhs`. The operator travels as text and is validated by the worker.
    #[serde(rename = "compute")]
    Compute { op: String, lhs: i64, rhs: i64 },
}

/// Response from worker to driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkResponse {
    #[serde(rename = "result")]
    Result {
        /// Process id of the worker that did the computation
        pid: u32,
        value: i64,
    },

    #[serde(rename = "error")]
    Error { kind: ErrorKind, message: String },
}

/// Error categories a worker can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DivisionByZero,
    InvalidOperator,
    Overflow,
    Protocol,
}

impl WorkRequest {
    pub fn compute(op: Operator, lhs: i64, rhs: i64) -> Self {
        Self::Compute {
            op: op.to_string(),
            lhs,
            rhs,
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_line(&self) -> Result<String> {
        to_line(self)
    }

    /// Deserialize from JSON line.
    pub fn from_line(line: &str) -> Result<Self> {
        serde_json::from_str(line.trim()).map_err(EvalError::protocol)
    }
}

impl WorkResponse {
    pub fn result(pid: u32, value: i64) -> Self {
        Self::Result { pid, value }
    }

    /// Encode a worker-side failure.
    pub fn error(err: &EvalError) -> Self {
        let kind = match err {
            EvalError::DivisionByZero { .. } => ErrorKind::DivisionByZero,
            EvalError::InvalidOperator(_) => ErrorKind::InvalidOperator,
            EvalError::ArithmeticOverflow { .. } => ErrorKind::Overflow,
            _ => ErrorKind::Protocol,
        };
        Self::Error {
            kind,
            message: err.to_string(),
        }
    }

    /// Rebuild the driver-side error from an error response.
    ///
    /// The response only carries a category; the operands come from the
    /// request the driver sent.
    pub fn rebuild_error(kind: ErrorKind, message: String, request: &WorkRequest) -> EvalError {
        let WorkRequest::Compute { op, lhs, rhs } = request;
        match kind {
            ErrorKind::DivisionByZero => EvalError::DivisionByZero { lhs: *lhs },
            ErrorKind::InvalidOperator => EvalError::InvalidOperator(op.clone()),
            ErrorKind::Overflow => match op.parse::<Operator>() {
                Ok(op) => EvalError::ArithmeticOverflow {
                    lhs: *lhs,
                    op,
                    rhs: *rhs,
                },
                Err(e) => e,
            },
            ErrorKind::Protocol => EvalError::Protocol(message),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_line(&self) -> Result<String> {
        to_line(self)
    }

    /// Deserialize from JSON line.
    pub fn from_line(line: &str) -> Result<Self> {
        serde_json::from_str(line.trim()).map_err(EvalError::protocol)
    }
}

fn to_line<T: Serialize>(message: &T) -> Result<String> {
    let mut json = serde_json::to_string(message).map_err(EvalError::protocol)?;
    json.push('\n');
    Ok(json)
}
