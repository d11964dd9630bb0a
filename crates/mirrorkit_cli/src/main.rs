//! `mirrorkit` binary: backup (`-b`) or restore (`-r`) the files listed in a
//! parameter file.

mod cli;

use std::process::ExitCode;

use clap::Parser;

use crate::cli::{Cli, execute, init_logging, outcome_message};

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(&cli.log_level, cli.log_format) {
        eprintln!("error: {e:#}");
        return ExitCode::FAILURE;
    }
    tracing::debug!(?cli, "arguments parsed");

    let report = execute(&cli);
    if report.outcome.is_ok() {
        println!("{}", outcome_message(report.outcome));
        return ExitCode::SUCCESS;
    }

    eprintln!("error: {}", outcome_message(report.outcome));
    if let Some(spec_error) = &report.error {
        eprintln!("  {}", spec_error.exception);
    }
    ExitCode::FAILURE
}
