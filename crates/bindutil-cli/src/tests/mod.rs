//! Unit tests for the CLI runtime.

mod telemetry;

use std::ffi::OsString;
use std::process::ExitCode;

/// Compares exit codes through their debug form.
fn same_exit_code(actual: ExitCode, expected: ExitCode) -> bool {
    format!("{actual:?}") == format!("{expected:?}")
}

/// Runs the CLI in-process and captures its streams.
fn run_captured(args: &[&str]) -> (ExitCode, String, String) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let args: Vec<OsString> = args.iter().map(OsString::from).collect();
    let code = crate::run(args, &mut stdout, &mut stderr);
    (
        code,
        String::from_utf8(stdout).expect("stdout is utf-8"),
        String::from_utf8(stderr).expect("stderr is utf-8"),
    )
}
