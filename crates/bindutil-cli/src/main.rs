//! CLI entrypoint for the `bindutil` bind-mount tool.
//!
//! The binary delegates to [`bindutil_cli::run`], which parses arguments,
//! initialises telemetry and runs the selected subcommand.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    bindutil_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
