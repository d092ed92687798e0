//! Command-line interface runtime for `bindutil`.
//!
//! The module owns argument parsing, telemetry bootstrapping and the mapping
//! of lifecycle results to exit codes. [`run`] takes its output streams as
//! parameters so tests can drive the CLI without a subprocess.
//!
//! Exit codes: `0` on success, the child's own code for `exec` and `gpm`,
//! `1` on any mount, unmount, launch or usage failure, and `2` when the
//! command was interrupted.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;

mod cli;
mod commands;
mod errors;
mod paths;
mod runtime_utils;
pub mod telemetry;

use cli::Cli;
use errors::AppError;

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => return report_usage(&error, stdout, stderr),
    };

    let result = telemetry::initialise(&cli.config)
        .map_err(AppError::from)
        .and_then(|_| commands::dispatch(&cli.config, cli.command, stderr));

    match result {
        Ok(exit_code) => exit_code,
        Err(error) => {
            let _ = writeln!(stderr, "bindutil: {error}");
            ExitCode::FAILURE
        }
    }
}

/// Writes clap's rendering of `error` and picks the exit code.
///
/// Help and version requests go to stdout and succeed; everything else is a
/// usage error on stderr.
fn report_usage<W, E>(error: &clap::Error, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    W: Write,
    E: Write,
{
    let rendered = error.render();
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = write!(stdout, "{rendered}");
            ExitCode::SUCCESS
        }
        _ => {
            let _ = write!(stderr, "{rendered}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests;
