//! Unmounting with bounded retries against busy mountpoints.
//!
//! Each failed attempt is classified exactly once, right after the tool
//! returns, into [`FailureClass::Transient`] or [`FailureClass::Fatal`]. Only
//! transient failures are retried; everything else is surfaced at once.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::backend::BackendKind;
use crate::error::BindError;
use crate::runner::CommandRunner;
use crate::tools::ToolLocator;

const UNMOUNT_TARGET: &str = "bindutil_mount::unmount";

/// Output marker identifying a mountpoint that is still in use.
///
/// The match is a plain substring of the tool's English `EBUSY` text. Case
/// is ignored only so the Linux spelling ("Device or resource busy") is
/// recognised next to the BSD one ("Resource busy"); no other wording, such
/// as a bare "target is busy", counts as busy.
///
/// Known fragility: tools running under a non-English locale, or versions
/// that reword the message, will not match and are treated as fatal.
pub const BUSY_MARKER: &str = "resource busy";

/// Default number of unmount attempts.
pub const DEFAULT_ATTEMPTS: u32 = 5;

/// Default pause between attempts.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Classification of a failed unmount attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The mountpoint was busy; another attempt may succeed.
    Transient,
    /// Any other failure; retrying will not help.
    Fatal,
}

/// Classifies the captured output of a failed unmount attempt.
#[must_use]
pub fn classify_failure(output: &str) -> FailureClass {
    if output.to_ascii_lowercase().contains(BUSY_MARKER) {
        FailureClass::Transient
    } else {
        FailureClass::Fatal
    }
}

/// External tools able to release a bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmountProgram {
    /// `fusermount -u`, paired with userspace binds.
    Fusermount,
    /// `umount`, paired with kernel binds.
    Umount,
}

impl UnmountProgram {
    /// Executable name looked up on the search path.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fusermount => "fusermount",
            Self::Umount => "umount",
        }
    }

    /// Arguments releasing `destination`.
    #[must_use]
    pub fn args(self, destination: &Path) -> Vec<OsString> {
        match self {
            Self::Fusermount => vec!["-u".into(), destination.as_os_str().to_owned()],
            Self::Umount => vec![destination.as_os_str().to_owned()],
        }
    }

    /// Tools to try for a bind made by `backend`, preferred tool first.
    ///
    /// Without a known backend `fusermount` is preferred, then `umount`.
    #[must_use]
    pub const fn candidates(backend: Option<BackendKind>) -> [Self; 2] {
        match backend {
            Some(BackendKind::KernelBindMount) => [Self::Umount, Self::Fusermount],
            _ => [Self::Fusermount, Self::Umount],
        }
    }
}

/// Attempt budget and backoff for unmounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    interval: Duration,
}

impl RetryPolicy {
    /// Builds a policy; zero attempts is raised to one.
    #[must_use]
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            interval,
        }
    }

    /// Total attempts, including the first.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Pause between consecutive attempts.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPTS, DEFAULT_INTERVAL)
    }
}

/// Summary of a successful unmount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmountReport {
    /// Tool that released the bind.
    pub program: PathBuf,
    /// Attempts needed, including the successful one.
    pub attempts: u32,
}

/// Releases binds, retrying while the mountpoint reports busy.
#[derive(Debug)]
pub struct RetryingUnmounter<L, R> {
    locator: L,
    runner: R,
    policy: RetryPolicy,
}

impl<L, R> RetryingUnmounter<L, R>
where
    L: ToolLocator,
    R: CommandRunner,
{
    /// Creates an unmounter from its collaborators.
    pub const fn new(locator: L, runner: R, policy: RetryPolicy) -> Self {
        Self {
            locator,
            runner,
            policy,
        }
    }

    /// Unmounts `destination`, pairing the tool with `backend` when known.
    ///
    /// Sleeps for the policy interval between attempts, never after the
    /// last one.
    ///
    /// # Errors
    ///
    /// - [`BindError::NoUnmountTool`] when neither tool exists; nothing is
    ///   attempted.
    /// - [`BindError::UnmountFailed`] on the first non-busy failure, or with
    ///   the final attempt's output once every attempt reported busy.
    pub fn unmount(
        &self,
        destination: &Path,
        backend: Option<BackendKind>,
    ) -> Result<UnmountReport, BindError> {
        let (tool, program) = self.select_tool(backend)?;
        let args = tool.args(destination);
        let attempts = self.policy.attempts();
        let mut last_output = String::new();

        for attempt in 1..=attempts {
            let output = self.runner.run(&program, &args).map_err(|error| {
                BindError::UnmountFailed {
                    destination: destination.to_path_buf(),
                    attempts: attempt,
                    output: error.to_string(),
                }
            })?;

            if output.success() {
                info!(
                    target: UNMOUNT_TARGET,
                    destination = %destination.display(),
                    tool = tool.name(),
                    attempt,
                    "unmounted"
                );
                return Ok(UnmountReport { program, attempts: attempt });
            }

            match classify_failure(&output.output) {
                FailureClass::Fatal => {
                    return Err(BindError::UnmountFailed {
                        destination: destination.to_path_buf(),
                        attempts: attempt,
                        output: output.output,
                    });
                }
                FailureClass::Transient => {
                    warn!(
                        target: UNMOUNT_TARGET,
                        destination = %destination.display(),
                        attempt,
                        attempts,
                        "mountpoint busy"
                    );
                    last_output = output.output;
                }
            }

            if attempt < attempts {
                thread::sleep(self.policy.interval());
            }
        }

        Err(BindError::UnmountFailed {
            destination: destination.to_path_buf(),
            attempts,
            output: last_output,
        })
    }

    fn select_tool(
        &self,
        backend: Option<BackendKind>,
    ) -> Result<(UnmountProgram, PathBuf), BindError> {
        let selected = UnmountProgram::candidates(backend)
            .into_iter()
            .find_map(|tool| self.locator.locate(tool.name()).map(|path| (tool, path)))
            .ok_or(BindError::NoUnmountTool)?;
        debug!(
            target: UNMOUNT_TARGET,
            tool = selected.0.name(),
            program = %selected.1.display(),
            "selected unmount tool"
        );
        Ok(selected)
    }
}
