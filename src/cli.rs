use crate::worker::{Backend, ResultChannel};
use argh::FromArgs;

#[derive(FromArgs, Debug)]
/// Evaluate a flat arithmetic expression strictly left to right (no precedence),
/// handing every operation to a freshly spawned worker.
///
/// The expression is read from standard input, e.g. `3 + 4 * 2`.
pub struct Cli {
    #[argh(option, short = 'e')]
    /// expression to evaluate instead of reading a line from standard input.
    pub expr: Option<String>,

    #[argh(option)]
    /// where workers run: `process` (default) or `thread`.
    pub backend: Option<Backend>,

    #[argh(switch)]
    /// hand results back through the 8-bit process exit status, so they wrap into 0..=255.
    pub exit_status: bool,

    #[argh(option)]
    /// maximum accepted input length in bytes (default 1024).
    pub max_input: Option<usize>,

    #[argh(switch)]
    /// shorten over-long input to the limit instead of rejecting it.
    pub truncate: bool,

    #[argh(switch)]
    /// keep prompting for expressions until end of input.
    pub repl: bool,

    #[argh(switch, short = 'v')]
    /// log more on stderr; repeat for more detail.
    pub verbose: u8,

    #[argh(subcommand)]
    pub command: Option<Command>,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand)]
pub enum Command {
    Worker(WorkerArgs),
}

#[derive(FromArgs, Debug)]
/// Internal: compute the one operation requested on stdin and answer on stdout.
#[argh(subcommand, name = "worker")]
pub struct WorkerArgs {
    #[argh(switch)]
    /// also use the result as the exit status.
    pub exit_status: bool,
}

impl WorkerArgs {
    pub fn channel(&self) -> ResultChannel {
        if self.exit_status {
            ResultChannel::ExitStatus
        } else {
            ResultChannel::Pipe
        }
    }
}
