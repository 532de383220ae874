//! Logging setup.
//!
//! Logs go to stderr so they never mix with the evaluation output on stdout.
//! The filter is taken from `FORKCALC_LOG`, then `RUST_LOG`, then the
//! `-v` count.

use crate::env::Environment;
use tracing_subscriber::EnvFilter;

/// Log filter variable, takes precedence over `RUST_LOG`.
pub const LOG_VAR: &str = "FORKCALC_LOG";

pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// The filter directive in effect for `verbosity` and `env`.
pub fn directive(verbosity: u8, env: &Environment) -> String {
    [LOG_VAR, "RUST_LOG"]
        .into_iter()
        .filter_map(|key| env.get_var(key))
        .find(|v| !v.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| level_for(verbosity).to_string())
}

/// Install the global subscriber. Calling it again is a no-op.
pub fn init(verbosity: u8, env: &Environment) {
    let directive = directive(verbosity, env);
    let filter = EnvFilter::try_new(&directive)
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Make worker processes log at the same level as the driver.
pub fn propagate(verbosity: u8, env: &mut Environment) {
    let directive = directive(verbosity, env);
    env.set_var(LOG_VAR, directive);
}
