use std::process::ExitCode;

use trace_verifier::cli::run_cli;

fn main() -> ExitCode {
    run_cli()
}
