//! Thread backend: every operation runs on its own named OS thread and its
//! result comes back through the join handle.

use crate::error::{EvalError, Result};
use crate::executor;
use crate::worker::{self, WorkOrder, Worker, WorkerId, WorkerLauncher, WorkerReport};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use tracing::debug;

/// Exit status reported for a worker thread that panicked, matching the
/// code a panicking Rust process exits with.
const PANIC_STATUS: i32 = 101;

#[derive(Default)]
pub struct ThreadLauncher {
    launched: AtomicUsize,
}

impl ThreadLauncher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkerLauncher for ThreadLauncher {
    fn launch(&self, order: WorkOrder) -> Result<Box<dyn Worker>> {
        let n = self.launched.fetch_add(1, Ordering::Relaxed) + 1;
        let handle = thread::Builder::new()
            .name(format!("forkcalc-worker-{n}"))
            .spawn(move || executor::compute(order.op, order.lhs, order.rhs))
            .map_err(EvalError::WorkerSpawn)?;
        let id = WorkerId::Thread(n);
        debug!(%id, "spawned worker thread");
        Ok(Box::new(ThreadWorker { id, order, handle }))
    }
}

struct ThreadWorker {
    id: WorkerId,
    order: WorkOrder,
    handle: JoinHandle<Result<i64>>,
}

impl Worker for ThreadWorker {
    fn id(&self) -> WorkerId {
        self.id
    }

    fn wait(self: Box<Self>) -> Result<WorkerReport> {
        let value = match self.handle.join() {
            Ok(outcome) => outcome?,
            Err(_) => return Err(worker::failed(self.id, PANIC_STATUS)),
        };
        Ok(WorkerReport {
            id: self.id,
            order: self.order,
            computed: value,
            delivered: value,
        })
    }
}
