//! A left-to-right arithmetic evaluator that delegates every operation to a
//! freshly spawned worker.
//!
//! An expression such as `10 - 2 * 3` is folded strictly left to right (no
//! precedence, so the answer is 24). For each operator the driver launches
//! one worker, waits for it to terminate, collects its result and only then
//! moves on. Workers are child processes by default; a thread backend is
//! available for embedding and tests.
//!
//! The main entry point is [`Evaluator`]. The [`worker`] module exposes the
//! traits for plugging in other ways of running a single operation.

pub mod cli;
pub mod config;
mod driver;
pub mod env;
pub mod error;
pub mod executor;
pub mod input;
pub mod lexer;
pub mod logging;
pub mod parser;
pub mod process;
pub mod protocol;
pub mod thread;
pub mod worker;

pub use config::Config;
pub use driver::{Evaluation, Evaluator};
pub use error::{EvalError, Result};
pub use parser::{Expression, Operator};
pub use process::ProcessLauncher;
pub use thread::ThreadLauncher;
