use crate::error::{EvalError, Result};
use crate::parser::Operator;
use std::fmt;
use std::str::FromStr;

/// Identity of one worker, as printed in its diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerId {
    /// An OS process.
    Pid(u32),
    /// A thread of the driver process, numbered from 1.
    Thread(usize),
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerId::Pid(pid) => write!(f, "PID {pid}"),
            WorkerId::Thread(n) => write!(f, "thread #{n}"),
        }
    }
}

/// The single binary operation a worker is asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkOrder {
    pub op: Operator,
    pub lhs: i64,
    pub rhs: i64,
}

/// What the driver learns from a worker that finished normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub id: WorkerId,
    pub order: WorkOrder,
    /// The value the worker computed.
    pub computed: i64,
    /// The value that reached the driver. Differs from `computed` only when
    /// results travel through the 8-bit exit status.
    pub delivered: i64,
}

impl fmt::Display for WorkerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} calculated {}{}{} as {}",
            self.id, self.order.lhs, self.order.op, self.order.rhs, self.computed
        )
    }
}

/// How a worker process hands its result back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultChannel {
    /// A JSON line on the worker's stdout. Full `i64` range.
    #[default]
    Pipe,
    /// The low 8 bits of the worker's exit status. Negative and large
    /// results wrap into `0..=255`.
    ExitStatus,
}

/// Where workers run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// One child process per operation.
    #[default]
    Process,
    /// One OS thread per operation.
    Thread,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "process" => Ok(Backend::Process),
            "thread" => Ok(Backend::Thread),
            _ => Err(format!(
                "Unknown backend: '{}'. Valid options: process, thread",
                s
            )),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Process => write!(f, "process"),
            Backend::Thread => write!(f, "thread"),
        }
    }
}

/// A running worker. Awaiting it consumes the handle.
pub trait Worker {
    fn id(&self) -> WorkerId;

    /// Block until the worker terminates and collect its result.
    ///
    /// Any abnormal termination is returned as an error; the worker is
    /// reaped either way.
    fn wait(self: Box<Self>) -> Result<WorkerReport>;
}

/// Starts workers. The driver holds one of these and asks it for a fresh
/// worker per operator.
pub trait WorkerLauncher {
    fn launch(&self, order: WorkOrder) -> Result<Box<dyn Worker>>;
}

/// Map a termination status to a shell-style code.
///
/// A normal exit gives its code; death by signal gives `128 + signal`.
pub fn exit_code(status: std::process::ExitStatus) -> i32 {
    match status.code() {
        Some(x) => x,
        None => terminated_by_signal(status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: std::process::ExitStatus) -> i32 {
    -1
}

/// Reduce a result to what fits in an exit status, the way the OS does.
pub fn truncate_to_status(value: i64) -> i64 {
    value & 0xFF
}

pub(crate) fn failed(id: WorkerId, status: i32) -> EvalError {
    EvalError::WorkerFailed { id, status }
}
