/*!
 * insnmix - Main Entry Point
 *
 * Parses options, initializes tracing and runs the profiler until a bound
 * is reached, `q` is pressed or SIGINT/SIGTERM arrives.
 */

use clap::Parser;
use insnmix::{init_tracing, Cli, InsnmixError, Options};
use miette::Diagnostic;
use std::process::ExitCode;

fn report(err: &InsnmixError) {
    match err.help() {
        Some(help) => eprintln!("insnmix: {} ({})", err, help),
        None => eprintln!("insnmix: {}", err),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let options = match Options::from_cli(Cli::parse()) {
        Ok(options) => options,
        Err(e) => {
            report(&e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(options.is_interactive());

    match insnmix::run(options).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}
