//! Runtime configuration.
//!
//! Values are layered: built-in defaults, then environment variables, then
//! command-line flags.

use crate::cli::Cli;
use crate::env::Environment;
use crate::worker::{Backend, ResultChannel};
use anyhow::{Result, anyhow, bail};

/// Default upper bound on the length of an input line, in bytes.
pub const DEFAULT_MAX_INPUT: usize = 1024;

/// Selects the worker backend (`process` or `thread`).
pub const BACKEND_VAR: &str = "FORKCALC_BACKEND";
/// Overrides the input bound.
pub const MAX_INPUT_VAR: &str = "FORKCALC_MAX_INPUT";

/// What to do with a line longer than the input bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OversizePolicy {
    /// Fail with `InputTooLong`.
    #[default]
    Reject,
    /// Keep the longest prefix that fits, cut at a character boundary.
    Truncate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub backend: Backend,
    pub channel: ResultChannel,
    pub max_input: usize,
    pub oversize: OversizePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Process,
            channel: ResultChannel::Pipe,
            max_input: DEFAULT_MAX_INPUT,
            oversize: OversizePolicy::Reject,
        }
    }
}

impl Config {
    /// Defaults, then environment, then flags.
    pub fn load(cli: &Cli, env: &Environment) -> Result<Self> {
        let config = Self::default().with_env_overrides(env)?.with_cli(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn with_env_overrides(mut self, env: &Environment) -> Result<Self> {
        if let Some(backend) = env.get_parsed::<Backend>(BACKEND_VAR) {
            self.backend = backend.map_err(|e| anyhow!("invalid {BACKEND_VAR}: {e}"))?;
        }
        if let Some(max) = env.get_parsed::<usize>(MAX_INPUT_VAR) {
            self.max_input = max.map_err(|e| anyhow!("invalid {MAX_INPUT_VAR}: {e}"))?;
        }
        Ok(self)
    }

    pub fn with_cli(mut self, cli: &Cli) -> Self {
        if let Some(backend) = cli.backend {
            self.backend = backend;
        }
        if cli.exit_status {
            self.channel = ResultChannel::ExitStatus;
        }
        if let Some(max) = cli.max_input {
            self.max_input = max;
        }
        if cli.truncate {
            self.oversize = OversizePolicy::Truncate;
        }
        self
    }

    fn validate(&self) -> Result<()> {
        if self.max_input == 0 {
            bail!("input limit must be greater than 0");
        }
        if self.channel == ResultChannel::ExitStatus && self.backend != Backend::Process {
            bail!("--exit-status only applies to the process backend");
        }
        Ok(())
    }
}
