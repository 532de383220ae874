use anyhow::Context;
use forkcalc::cli::{Cli, Command, WorkerArgs};
use forkcalc::env::Environment;
use forkcalc::input::{self, LineSource};
use forkcalc::{Config, Evaluator, logging, process};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli: Cli = argh::from_env();
    let env = Environment::new();

    if let Some(Command::Worker(args)) = &cli.command {
        logging::init(0, &env);
        return worker_main(args);
    }

    logging::init(cli.verbose, &env);
    match run(&cli, env) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn worker_main(args: &WorkerArgs) -> ExitCode {
    let code = process::run_worker(
        &mut std::io::stdin().lock(),
        &mut std::io::stdout().lock(),
        args.channel(),
    );
    ExitCode::from(code)
}

fn run(cli: &Cli, mut env: Environment) -> anyhow::Result<()> {
    let config = Config::load(cli, &env)?;
    logging::propagate(cli.verbose, &mut env);
    let evaluator = Evaluator::from_config(&config, env)?;

    if let Some(expr) = &cli.expr {
        return evaluate(&evaluator, &config, expr.clone());
    }

    let mut source = LineSource::stdin()?;
    if cli.repl {
        while let Some(line) = source.next_line()? {
            if line.trim().is_empty() {
                continue;
            }
            if let Err(err) = evaluate(&evaluator, &config, line) {
                eprintln!("Error: {err:#}");
            }
        }
        return Ok(());
    }

    let line = source
        .next_line()?
        .context("no expression on standard input")?;
    evaluate(&evaluator, &config, line)
}

fn evaluate(evaluator: &Evaluator, config: &Config, line: String) -> anyhow::Result<()> {
    let line = input::enforce_limit(line, config)?;
    evaluator.run(&line, &mut std::io::stdout().lock())?;
    Ok(())
}
