//! Process backend: every operation runs in a child process.
//!
//! The child is this same executable started as `forkcalc worker`. It reads
//! one [`WorkRequest`] line from stdin and answers with one [`WorkResponse`]
//! line on stdout. Its stderr is inherited so worker logs reach the terminal.

use crate::env::Environment;
use crate::error::{EvalError, Result};
use crate::executor;
use crate::protocol::{WorkRequest, WorkResponse};
use crate::worker::{
    self, ResultChannel, WorkOrder, Worker, WorkerId, WorkerLauncher, WorkerReport,
};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use tracing::{debug, error, warn};

/// Name of the subcommand that turns the binary into a worker.
pub const WORKER_SUBCOMMAND: &str = "worker";

/// Launches one child process per operation.
pub struct ProcessLauncher {
    program: PathBuf,
    env: Environment,
    channel: ResultChannel,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>, env: Environment, channel: ResultChannel) -> Self {
        Self {
            program: program.into(),
            env,
            channel,
        }
    }

    /// Launcher that re-executes the running binary.
    pub fn current_exe(env: Environment, channel: ResultChannel) -> Result<Self> {
        let program = std::env::current_exe().map_err(EvalError::WorkerSpawn)?;
        Ok(Self::new(program, env, channel))
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(WORKER_SUBCOMMAND);
        if self.channel == ResultChannel::ExitStatus {
            cmd.arg("--exit-status");
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .envs(self.env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&self.env.current_dir);
        cmd
    }
}

impl WorkerLauncher for ProcessLauncher {
    fn launch(&self, order: WorkOrder) -> Result<Box<dyn Worker>> {
        let child = self.command().spawn().map_err(EvalError::WorkerSpawn)?;
        let id = WorkerId::Pid(child.id());
        debug!(%id, program = %self.program.display(), "spawned worker process");

        let mut worker = ProcessWorker {
            id,
            order,
            request: WorkRequest::compute(order.op, order.lhs, order.rhs),
            channel: self.channel,
            child: Some(child),
        };
        // On failure the worker is dropped here, which kills and reaps it.
        worker.send()?;
        Ok(Box::new(worker))
    }
}

/// Handle to one worker process. Always reaped, even when never awaited.
struct ProcessWorker {
    id: WorkerId,
    order: WorkOrder,
    request: WorkRequest,
    channel: ResultChannel,
    child: Option<Child>,
}

impl ProcessWorker {
    fn send(&mut self) -> Result<()> {
        let line = self.request.to_line()?;
        let child = self
            .child
            .as_mut()
            .ok_or_else(|| EvalError::protocol("worker already reaped"))?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| EvalError::protocol("worker stdin not captured"))?;
        stdin.write_all(line.as_bytes())?;
        // Dropping stdin closes the pipe; the worker sees EOF after one request.
        Ok(())
    }

    fn decode(&self, stdout: &[u8], status: std::process::ExitStatus) -> Result<WorkerReport> {
        let code = worker::exit_code(status);
        let text = String::from_utf8_lossy(stdout);
        let line = text.lines().find(|l| !l.trim().is_empty());

        let response = match line.map(WorkResponse::from_line) {
            Some(Ok(response)) => response,
            // Garbage from a process that also failed: report the failure
            Some(Err(_)) | None if !status.success() => return Err(worker::failed(self.id, code)),
            Some(Err(e)) => return Err(e),
            None => return Err(EvalError::protocol(format!("{} sent no result", self.id))),
        };

        match response {
            WorkResponse::Error { kind, message } => {
                Err(WorkResponse::rebuild_error(kind, message, &self.request))
            }
            WorkResponse::Result { pid, value } => {
                if WorkerId::Pid(pid) != self.id {
                    warn!(id = %self.id, reported = pid, "worker reported a different pid");
                }
                let delivered = match self.channel {
                    ResultChannel::Pipe if status.success() => value,
                    ResultChannel::Pipe => return Err(worker::failed(self.id, code)),
                    // Exactly what a parent reading WEXITSTATUS would see
                    ResultChannel::ExitStatus => match status.code() {
                        Some(c) => i64::from(c),
                        None => return Err(worker::failed(self.id, code)),
                    },
                };
                Ok(WorkerReport {
                    id: self.id,
                    order: self.order,
                    computed: value,
                    delivered,
                })
            }
        }
    }
}

impl Worker for ProcessWorker {
    fn id(&self) -> WorkerId {
        self.id
    }

    fn wait(mut self: Box<Self>) -> Result<WorkerReport> {
        let child = self
            .child
            .take()
            .ok_or_else(|| EvalError::protocol("worker already reaped"))?;
        let output = child.wait_with_output()?;
        debug!(id = %self.id, status = %output.status, "reaped worker process");
        self.decode(&output.stdout, output.status)
    }
}

impl Drop for ProcessWorker {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Body of `forkcalc worker`: answer exactly one request.
///
/// Returns the exit code the worker process should terminate with: 0 on
/// success and 1 on failure, except in exit-status mode where a successful
/// result is itself the code.
pub fn run_worker(input: &mut dyn BufRead, output: &mut dyn Write, channel: ResultChannel) -> u8 {
    let outcome = read_request(input).and_then(|WorkRequest::Compute { op, lhs, rhs }| {
        executor::compute_symbol(&op, lhs, rhs)
    });

    let (response, code) = match outcome {
        Ok(value) => {
            let code = match channel {
                ResultChannel::Pipe => 0,
                ResultChannel::ExitStatus => worker::truncate_to_status(value) as u8,
            };
            (WorkResponse::result(std::process::id(), value), code)
        }
        Err(e) => {
            error!("{e}");
            (WorkResponse::error(&e), 1)
        }
    };

    let written = response.to_line().and_then(|line| {
        output.write_all(line.as_bytes())?;
        output.flush()?;
        Ok(())
    });
    match written {
        Ok(()) => code,
        Err(e) => {
            error!("failed to send result: {e}");
            1
        }
    }
}

fn read_request(input: &mut dyn BufRead) -> Result<WorkRequest> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(EvalError::protocol("no request received"));
    }
    WorkRequest::from_line(&line)
}
