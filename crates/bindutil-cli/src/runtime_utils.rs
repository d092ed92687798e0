//! Runtime helpers for the CLI entrypoints.

use std::io::Write;
use std::process::ExitCode;

use bindutil_mount::ChildOutcome;

/// Exit status reported when the user interrupted the command.
pub(crate) const INTERRUPTED_STATUS: u8 = 2;

/// Maps a child exit code to a process status; out-of-range codes fail.
pub(crate) fn status_byte(status: i32) -> u8 {
    u8::try_from(status).unwrap_or(1)
}

/// Process status for a supervised run.
pub(crate) fn outcome_status(outcome: ChildOutcome) -> u8 {
    match outcome {
        ChildOutcome::Exited(code) => status_byte(code),
        ChildOutcome::Terminated => INTERRUPTED_STATUS,
    }
}

pub(crate) fn exit_code_from_outcome<E>(outcome: ChildOutcome, stderr: &mut E) -> ExitCode
where
    E: Write,
{
    if outcome == ChildOutcome::Terminated {
        let _ = writeln!(stderr, "bindutil: interrupted; command terminated");
    }
    ExitCode::from(outcome_status(outcome))
}
