use crate::config::Config;
use crate::env::Environment;
use crate::error::Result;
use crate::parser::Expression;
use crate::process::ProcessLauncher;
use crate::thread::ThreadLauncher;
use crate::worker::{Backend, WorkOrder, Worker, WorkerLauncher, WorkerReport};
use std::io::Write;
use tracing::{debug, info};

/// Outcome of a complete evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Final accumulator value.
    pub value: i64,
    /// One report per worker, in the order the workers ran.
    pub reports: Vec<WorkerReport>,
}

impl Evaluation {
    pub fn workers_spawned(&self) -> usize {
        self.reports.len()
    }
}

enum DriverState {
    Start,
    SpawnWorker { step: usize },
    AwaitWorker { step: usize, worker: Box<dyn Worker> },
    Done,
}

/// Folds a flat expression left to right, one worker per operator.
///
/// Workers are strictly sequential: the next one is launched only after
/// the previous one has been reaped and its result folded in.
///
/// Example
/// ```
/// use forkcalc::{Evaluator, ThreadLauncher};
/// let evaluator = Evaluator::new(Box::new(ThreadLauncher::new()));
/// let mut out = Vec::new();
/// let evaluation = evaluator.evaluate("10 - 2 * 3", &mut out).unwrap();
/// assert_eq!(evaluation.value, 24);
/// ```
pub struct Evaluator {
    launcher: Box<dyn WorkerLauncher>,
}

impl Evaluator {
    pub fn new(launcher: Box<dyn WorkerLauncher>) -> Self {
        Self { launcher }
    }

    /// Build an evaluator with the backend and result channel from `config`.
    pub fn from_config(config: &Config, env: Environment) -> Result<Self> {
        let launcher: Box<dyn WorkerLauncher> = match config.backend {
            Backend::Process => Box::new(ProcessLauncher::current_exe(env, config.channel)?),
            Backend::Thread => Box::new(ThreadLauncher::new()),
        };
        Ok(Self::new(launcher))
    }

    /// Parse `line` and evaluate it, writing one diagnostic line per worker
    /// to `out`.
    pub fn evaluate(&self, line: &str, out: &mut dyn Write) -> Result<Evaluation> {
        let expression = Expression::parse(line)?;
        self.evaluate_expression(&expression, out)
    }

    /// Evaluate `line` and, on success, finish with the `Final result` line.
    pub fn run(&self, line: &str, out: &mut dyn Write) -> Result<Evaluation> {
        let evaluation = self.evaluate(line, out)?;
        writeln!(out, "Final result: {}", evaluation.value)?;
        out.flush()?;
        Ok(evaluation)
    }

    pub fn evaluate_expression(
        &self,
        expression: &Expression,
        out: &mut dyn Write,
    ) -> Result<Evaluation> {
        let steps = &expression.steps;
        let mut accumulator = expression.first;
        let mut reports = Vec::with_capacity(steps.len());
        let mut state = DriverState::Start;

        loop {
            state = match state {
                DriverState::Start => {
                    debug!(%expression, operators = steps.len(), "starting evaluation");
                    if steps.is_empty() {
                        DriverState::Done
                    } else {
                        DriverState::SpawnWorker { step: 0 }
                    }
                }
                DriverState::SpawnWorker { step } => {
                    let next = steps[step];
                    let order = WorkOrder {
                        op: next.op,
                        lhs: accumulator,
                        rhs: next.operand,
                    };
                    debug!(step, offset = next.offset, "launching worker");
                    let worker = self.launcher.launch(order)?;
                    DriverState::AwaitWorker { step, worker }
                }
                DriverState::AwaitWorker { step, worker } => {
                    let report = worker.wait()?;
                    writeln!(out, "{report}")?;
                    accumulator = report.delivered;
                    reports.push(report);
                    if step + 1 < steps.len() {
                        DriverState::SpawnWorker { step: step + 1 }
                    } else {
                        DriverState::Done
                    }
                }
                DriverState::Done => break,
            };
        }

        info!(value = accumulator, workers = reports.len(), "evaluation finished");
        Ok(Evaluation {
            value: accumulator,
            reports,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;
    use crate::executor;
    use crate::parser::Operator;
    use crate::worker::{self, WorkerId};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Launcher that runs work inline and records what it was asked to do.
    #[derive(Default, Clone)]
    struct Recorder {
        orders: Rc<RefCell<Vec<WorkOrder>>>,
        alive: Rc<Cell<usize>>,
        max_alive: Rc<Cell<usize>>,
        exit_status: bool,
    }

    struct RecordedWorker {
        id: WorkerId,
        order: WorkOrder,
        alive: Rc<Cell<usize>>,
        exit_status: bool,
    }

    impl WorkerLauncher for Recorder {
        fn launch(&self, order: WorkOrder) -> Result<Box<dyn Worker>> {
            self.orders.borrow_mut().push(order);
            self.alive.set(self.alive.get() + 1);
            self.max_alive
                .set(self.max_alive.get().max(self.alive.get()));
            Ok(Box::new(RecordedWorker {
                id: WorkerId::Pid(1000 + self.orders.borrow().len() as u32),
                order,
                alive: self.alive.clone(),
                exit_status: self.exit_status,
            }))
        }
    }

    impl Worker for RecordedWorker {
        fn id(&self) -> WorkerId {
            self.id
        }

        fn wait(self: Box<Self>) -> Result<WorkerReport> {
            let computed = executor::compute(self.order.op, self.order.lhs, self.order.rhs)?;
            let delivered = if self.exit_status {
                worker::truncate_to_status(computed)
            } else {
                computed
            };
            Ok(WorkerReport {
                id: self.id,
                order: self.order,
                computed,
                delivered,
            })
        }
    }

    impl Drop for RecordedWorker {
        fn drop(&mut self) {
            self.alive.set(self.alive.get() - 1);
        }
    }

    fn run(line: &str) -> (Recorder, Result<Evaluation>, String) {
        let recorder = Recorder::default();
        let evaluator = Evaluator::new(Box::new(recorder.clone()));
        let mut out = Vec::new();
        let result = evaluator.run(line, &mut out);
        (recorder, result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_single_operation() {
        let (recorder, result, out) = run("3 + 4");
        assert_eq!(result.unwrap().value, 7);
        assert_eq!(out, "PID 1001 calculated 3+4 as 7\nFinal result: 7\n");
        assert_eq!(recorder.orders.borrow().len(), 1);
    }

    #[test]
    fn test_left_to_right_without_precedence() {
        let (recorder, result, out) = run("10 - 2 * 3");
        let evaluation = result.unwrap();
        assert_eq!(evaluation.value, 24);
        assert_eq!(
            *recorder.orders.borrow(),
            vec![
                WorkOrder {
                    op: Operator::Sub,
                    lhs: 10,
                    rhs: 2
                },
                WorkOrder {
                    op: Operator::Mul,
                    lhs: 8,
                    rhs: 3
                },
            ]
        );
        assert_eq!(
            out,
            "PID 1001 calculated 10-2 as 8\nPID 1002 calculated 8*3 as 24\nFinal result: 24\n"
        );
    }

    #[test]
    fn test_one_worker_per_operator_never_overlapping() {
        let (recorder, result, _) = run("1 + 2 + 3 + 4 + 5 * 2");
        let evaluation = result.unwrap();
        assert_eq!(evaluation.value, 30);
        assert_eq!(evaluation.workers_spawned(), 5);
        assert_eq!(recorder.orders.borrow().len(), 5);
        assert_eq!(recorder.max_alive.get(), 1);
        assert_eq!(recorder.alive.get(), 0);
    }

    #[test]
    fn test_single_number_spawns_nothing() {
        let (recorder, result, out) = run("42");
        let evaluation = result.unwrap();
        assert_eq!(evaluation.value, 42);
        assert_eq!(evaluation.workers_spawned(), 0);
        assert!(recorder.orders.borrow().is_empty());
        assert_eq!(out, "Final result: 42\n");
    }

    #[test]
    fn test_division_by_zero_halts() {
        let (recorder, result, out) = run("5 / 0 + 1");
        assert!(matches!(result, Err(EvalError::DivisionByZero { lhs: 5 })));
        // no worker after the failing one
        assert_eq!(recorder.orders.borrow().len(), 1);
        assert_eq!(recorder.alive.get(), 0);
        assert!(!out.contains("Final result"));
    }

    #[test]
    fn test_failure_midway_keeps_earlier_lines() {
        let (recorder, result, out) = run("6 - 6 + 0 / 0");
        assert!(matches!(result, Err(EvalError::DivisionByZero { lhs: 0 })));
        assert_eq!(recorder.orders.borrow().len(), 3);
        assert_eq!(out.lines().count(), 2);
    }

    #[test]
    fn test_invalid_operator_spawns_nothing() {
        let (recorder, result, out) = run("5 ? 3");
        assert!(matches!(result, Err(EvalError::InvalidOperator(ref op)) if op == "?"));
        assert!(recorder.orders.borrow().is_empty());
        assert!(out.is_empty());
    }

    #[test]
    fn test_invalid_operator_later_in_line_spawns_nothing() {
        let (recorder, result, _) = run("1 + 2 % 3");
        assert!(matches!(result, Err(EvalError::InvalidOperator(_))));
        assert!(recorder.orders.borrow().is_empty());
    }

    #[test]
    fn test_parse_error_spawns_nothing() {
        let (recorder, result, _) = run("1 + 2 +");
        assert!(matches!(result, Err(EvalError::Parse(_))));
        assert!(recorder.orders.borrow().is_empty());
    }

    #[test]
    fn test_full_range_results() {
        let (_, result, _) = run("2 - 5 * 1000");
        assert_eq!(result.unwrap().value, -3000);
    }

    #[test]
    fn test_exit_status_channel_wraps_accumulator() {
        let recorder = Recorder {
            exit_status: true,
            ..Recorder::default()
        };
        let evaluator = Evaluator::new(Box::new(recorder));
        let mut out = Vec::new();
        let evaluation = evaluator.evaluate("2 - 5 + 1", &mut out).unwrap();
        // 2 - 5 = -3 wraps to 253, then 253 + 1
        assert_eq!(evaluation.value, 254);
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("PID 1001 calculated 2-5 as -3\n"));
    }

    #[test]
    fn test_repeated_runs_agree() {
        let evaluator = Evaluator::new(Box::new(ThreadLauncher::new()));
        let first = evaluator.evaluate("7 * 6 - 2 / 4", &mut Vec::new()).unwrap();
        let second = evaluator.evaluate("7 * 6 - 2 / 4", &mut Vec::new()).unwrap();
        assert_eq!(first.value, 10);
        assert_eq!(first.value, second.value);
    }

    #[test]
    fn test_thread_backend_diagnostics() {
        let evaluator = Evaluator::new(Box::new(ThreadLauncher::new()));
        let mut out = Vec::new();
        evaluator.run("3 + 4", &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "thread #1 calculated 3+4 as 7\nFinal result: 7\n"
        );
    }
}
