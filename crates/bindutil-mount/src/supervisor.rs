//! Supervises the child process run against a bound destination.
//!
//! The child is a separate OS process; the supervisor only observes it
//! through `try_wait`. Each poll checks the exit status before the
//! cancellation flag, so a child that finished in the same tick as an
//! interrupt reports its real exit code.

use std::ffi::{OsStr, OsString};
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::error::BindError;

const SUPERVISOR_TARGET: &str = "bindutil_mount::supervisor";

/// Default interval between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How long a terminated child may take to exit before it is killed.
pub const TERMINATION_GRACE: Duration = Duration::from_secs(5);

/// Exit code reported for a child killed by a signal is `128 + signal`.
const SIGNAL_EXIT_BASE: i32 = 128;

/// How a supervised run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOutcome {
    /// The child exited by itself with this code.
    Exited(i32),
    /// Cancellation was requested and the child was terminated.
    ///
    /// Distinct from every exit code: a cancelled run is never reported as
    /// success.
    Terminated,
}

/// Program, arguments, working directory and environment for a child.
///
/// The child inherits the supervisor's environment with the overrides in
/// [`ProcessSpec::env`] applied on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    program: OsString,
    args: Vec<OsString>,
    working_dir: Option<PathBuf>,
    env: Vec<(OsString, OsString)>,
}

impl ProcessSpec {
    /// Starts a spec for `program`.
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
        }
    }

    /// Appends arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the child's working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Adds an environment override.
    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Replaces the program, keeping everything else.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Program to execute.
    #[must_use]
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Arguments passed to the program.
    #[must_use]
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Working directory, if one was set.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Environment overrides.
    #[must_use]
    pub fn env_overrides(&self) -> &[(OsString, OsString)] {
        &self.env
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command.envs(self.env.iter().map(|(key, value)| (key, value)));
        command
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessState {
    Running,
    Exited(i32),
    Terminated,
}

/// A spawned child and what the supervisor knows about it.
#[derive(Debug)]
struct ProcessHandle {
    child: Child,
    program: OsString,
    state: ProcessState,
}

impl ProcessHandle {
    fn spawn(spec: &ProcessSpec) -> Result<Self, BindError> {
        let child = spec
            .command()
            .spawn()
            .map_err(|source| BindError::ProcessLaunch {
                program: spec.program.clone(),
                source: Arc::new(source),
            })?;
        info!(
            target: SUPERVISOR_TARGET,
            pid = child.id(),
            program = %spec.program.to_string_lossy(),
            working_dir = ?spec.working_dir,
            "spawned child"
        );
        Ok(Self {
            child,
            program: spec.program.clone(),
            state: ProcessState::Running,
        })
    }

    fn poll(&mut self) -> Result<ProcessState, BindError> {
        if let Some(status) = self.child.try_wait().map_err(|source| self.wait_error(source))? {
            self.state = ProcessState::Exited(exit_code(status));
        }
        Ok(self.state)
    }

    /// Sends SIGTERM, waits out the grace period, then kills and reaps.
    fn terminate(&mut self, grace: Duration, poll: Duration) -> Result<(), BindError> {
        let pid = self.child.id();
        match i32::try_from(pid) {
            Ok(raw) => {
                if let Err(errno) = kill(Pid::from_raw(raw), Signal::SIGTERM) {
                    debug!(target: SUPERVISOR_TARGET, pid, %errno, "SIGTERM not delivered");
                }
            }
            Err(_) => warn!(target: SUPERVISOR_TARGET, pid, "pid out of range for SIGTERM"),
        }

        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            if self
                .child
                .try_wait()
                .map_err(|source| self.wait_error(source))?
                .is_some()
            {
                self.state = ProcessState::Terminated;
                return Ok(());
            }
            thread::sleep(poll.min(deadline.saturating_duration_since(Instant::now())));
        }

        warn!(
            target: SUPERVISOR_TARGET,
            pid,
            grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
            "child ignored SIGTERM; killing"
        );
        drop(self.child.kill());
        self.child.wait().map_err(|source| self.wait_error(source))?;
        self.state = ProcessState::Terminated;
        Ok(())
    }

    fn wait_error(&self, source: io::Error) -> BindError {
        BindError::ProcessWait {
            program: self.program.clone(),
            source: Arc::new(source),
        }
    }
}

/// Spawns a child and polls it until exit or cancellation.
#[derive(Debug, Clone, Copy)]
pub struct ProcessSupervisor {
    poll_interval: Duration,
    grace: Duration,
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl ProcessSupervisor {
    /// Creates a supervisor polling at `poll_interval`.
    #[must_use]
    pub const fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            grace: TERMINATION_GRACE,
        }
    }

    /// Overrides how long a terminated child may linger before SIGKILL.
    #[must_use]
    pub const fn with_termination_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Runs `spec` to completion or until `token` is cancelled.
    ///
    /// # Errors
    ///
    /// - [`BindError::ProcessLaunch`] when the child cannot be started; no
    ///   polling happens.
    /// - [`BindError::ProcessWait`] when the child's status cannot be read.
    pub fn run(
        &self,
        spec: &ProcessSpec,
        token: &CancellationToken,
    ) -> Result<ChildOutcome, BindError> {
        let mut handle = ProcessHandle::spawn(spec)?;
        loop {
            if let ProcessState::Exited(code) = handle.poll()? {
                info!(target: SUPERVISOR_TARGET, code, "child exited");
                return Ok(ChildOutcome::Exited(code));
            }
            if token.is_cancelled() {
                info!(target: SUPERVISOR_TARGET, "cancellation requested; terminating child");
                handle.terminate(self.grace, self.poll_interval)?;
                return Ok(ChildOutcome::Terminated);
            }
            thread::sleep(self.poll_interval);
        }
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signal| SIGNAL_EXIT_BASE + signal))
        .unwrap_or(1)
}
