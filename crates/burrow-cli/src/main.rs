//! # burrow — isolated image runner
//!
//! Runs a command inside a root assembled from a registry image, in its own
//! PID namespace, and exits with the command's exit status.

mod commands;

use std::process::ExitCode;

use clap::Parser;

use crate::commands::Cli;

fn main() -> ExitCode {
    // Diagnostics go to stderr; stdout belongs to the launched command.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(commands::parse_failure_status(&e));
        }
    };
    ExitCode::from(commands::execute(cli))
}
