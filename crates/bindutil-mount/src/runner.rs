//! Runs external mount-family tools to completion.

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

const RUNNER_TARGET: &str = "bindutil_mount::runner";

/// Exit status and captured output of an external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, absent when the tool was terminated by a signal.
    pub status: Option<i32>,
    /// Captured stdout followed by stderr, lossily decoded.
    pub output: String,
}

impl ToolOutput {
    /// Builds a successful result with the given output.
    #[must_use]
    pub fn succeeded(output: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            output: output.into(),
        }
    }

    /// Builds a failed result with the given status and output.
    #[must_use]
    pub fn failed(status: i32, output: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            output: output.into(),
        }
    }

    /// Returns true when the tool exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.status, Some(0))
    }
}

/// Abstraction over running an external tool for testability.
///
/// The production implementation is [`SystemRunner`]. Mount and unmount
/// logic only ever sees this trait, so tests can script tool responses
/// without privileges or real mountpoints.
pub trait CommandRunner {
    /// Runs `program` with `args`, waiting for it to exit.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised when the tool cannot be started or its
    /// output cannot be collected. A tool that runs and exits nonzero is not
    /// an error at this level.
    fn run(&self, program: &Path, args: &[OsString]) -> io::Result<ToolOutput>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, program: &Path, args: &[OsString]) -> io::Result<ToolOutput> {
        (**self).run(program, args)
    }
}

/// Runs tools as real subprocesses with stdin closed.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &Path, args: &[OsString]) -> io::Result<ToolOutput> {
        debug!(
            target: RUNNER_TARGET,
            program = %program.display(),
            ?args,
            "running external tool"
        );
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        let status = output.status.code();
        debug!(
            target: RUNNER_TARGET,
            program = %program.display(),
            ?status,
            "external tool exited"
        );
        Ok(ToolOutput {
            status,
            output: combined.trim_end().to_owned(),
        })
    }
}
