//! End-to-end orchestration: bind, run, unbind, clean up.
//!
//! Ordering is fixed: the bind completes before the child is spawned, the
//! child's exit or cancellation is observed before the unmount starts, and
//! directories are only touched once the unmount has an outcome.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::error;

use crate::cancel::CancellationToken;
use crate::env::{DEFAULT_PACKAGE_VAR, compose_path_var};
use crate::error::BindError;
use crate::managed_dir::ManagedDir;
use crate::runner::CommandRunner;
use crate::session::MountSession;
use crate::supervisor::{ChildOutcome, ProcessSpec, ProcessSupervisor};
use crate::tools::ToolLocator;
use crate::workspace::{PackageLayout, Teardown, Workspace, validate_package_path};

const EXEC_TARGET: &str = "bindutil_mount::exec";

/// Prefix used when the source path has no usable file name.
const FALLBACK_WORKSPACE_PREFIX: &str = "bindutil";

/// Parameters of a plain bind-and-run invocation.
#[derive(Debug, Clone)]
pub struct ExecRequest {
    /// Directory to bind.
    pub source: PathBuf,
    /// Mountpoint the child sees the source at.
    pub destination: PathBuf,
    /// Create the destination beforehand and remove it afterwards.
    pub manage_dir: bool,
    /// Child process to run while bound.
    pub command: ProcessSpec,
}

/// Parameters of the package-build variant.
#[derive(Debug, Clone)]
pub struct PackageRequest {
    /// Directory to bind.
    pub source: PathBuf,
    /// Package path nested under `<workspace>/src`.
    pub package_path: PathBuf,
    /// Search-path variable to compose, `GOPATH` by default.
    pub path_var: OsString,
    /// Current value of `path_var`, if set.
    pub existing_value: Option<OsString>,
    /// Use the workspace root alone instead of prepending it.
    pub clean: bool,
    /// Child process; its working directory and `path_var` are overridden.
    pub command: ProcessSpec,
}

impl PackageRequest {
    /// Builds a request composing [`DEFAULT_PACKAGE_VAR`].
    #[must_use]
    pub fn new(source: PathBuf, package_path: PathBuf, command: ProcessSpec) -> Self {
        Self {
            source,
            package_path,
            path_var: OsString::from(DEFAULT_PACKAGE_VAR),
            existing_value: None,
            clean: false,
            command,
        }
    }
}

/// Runs commands against bound directories.
#[derive(Debug)]
pub struct BindExecutor<L, R> {
    session: MountSession<L, R>,
    supervisor: ProcessSupervisor,
}

impl<L, R> BindExecutor<L, R>
where
    L: ToolLocator,
    R: CommandRunner,
{
    /// Creates an executor.
    pub const fn new(session: MountSession<L, R>, supervisor: ProcessSupervisor) -> Self {
        Self {
            session,
            supervisor,
        }
    }

    /// Mount session used for binding.
    pub const fn session(&self) -> &MountSession<L, R> {
        &self.session
    }

    /// Binds, runs the command, unbinds and tears down the destination.
    ///
    /// # Errors
    ///
    /// Returns the first failure in lifecycle order, except that an unmount
    /// failure always wins over a child launch failure. A managed
    /// destination survives an unmount failure.
    pub fn exec(
        &self,
        request: &ExecRequest,
        token: &CancellationToken,
    ) -> Result<ChildOutcome, BindError> {
        let command = self.resolve_command(&request.command)?;
        let dir = ManagedDir::enter(&request.destination, request.manage_dir)?;
        let result = self.run_bound(&request.source, &request.destination, &command, token);
        finish(result, |teardown| dir.exit(teardown))
    }

    /// Runs the package-build variant.
    ///
    /// Creates a temporary workspace named after the source, lays out
    /// `src/<package>` and `bin`, binds the source at `src/<package>`, and
    /// runs the command there with the composed search-path variable.
    ///
    /// # Errors
    ///
    /// As for [`BindExecutor::exec`]; the workspace is kept on disk after an
    /// unmount failure.
    pub fn exec_package(
        &self,
        request: &PackageRequest,
        token: &CancellationToken,
    ) -> Result<ChildOutcome, BindError> {
        validate_package_path(&request.package_path)?;
        let program = self.resolve_command(&request.command)?;
        let workspace = Workspace::create_temp(&workspace_prefix(&request.source))?;

        let prepared = PackageLayout::plan(workspace.root(), &request.package_path)
            .and_then(|layout| layout.create().map(|()| layout))
            .and_then(|layout| {
                compose_path_var(
                    request.existing_value.as_deref(),
                    workspace.root(),
                    request.clean,
                )
                .map(|value| (layout, value))
            });
        let (layout, value) = match prepared {
            Ok(prepared) => prepared,
            Err(error) => return finish(Err(error), |teardown| workspace.finish(teardown)),
        };

        let command = program
            .current_dir(layout.source_dir())
            .env(request.path_var.clone(), value);
        let result = self.run_bound(&request.source, layout.source_dir(), &command, token);
        finish(result, |teardown| workspace.finish(teardown))
    }

    fn resolve_command(&self, spec: &ProcessSpec) -> Result<ProcessSpec, BindError> {
        let program = spec.program();
        let resolved = program
            .to_str()
            .and_then(|name| self.session.locator().locate(name))
            .ok_or_else(|| BindError::ProcessLaunch {
                program: program.to_owned(),
                source: Arc::new(io::Error::new(
                    io::ErrorKind::NotFound,
                    "command not found on the search path",
                )),
            })?;
        Ok(spec.clone().with_program(resolved))
    }

    fn run_bound(
        &self,
        source: &Path,
        destination: &Path,
        command: &ProcessSpec,
        token: &CancellationToken,
    ) -> Result<ChildOutcome, BindError> {
        self.session
            .scoped(source, destination, |_binding| {
                self.supervisor.run(command, token)
            })?
            .into_result()
    }
}

/// Teardown implied by the lifecycle result.
fn teardown_for<T>(result: &Result<T, BindError>) -> Teardown {
    match result {
        Err(error) if error.leaves_mount_live() => Teardown::MountFailed,
        _ => Teardown::Clean,
    }
}

/// Applies directory teardown, keeping the lifecycle error when both fail.
fn finish<F>(
    result: Result<ChildOutcome, BindError>,
    cleanup: F,
) -> Result<ChildOutcome, BindError>
where
    F: FnOnce(Teardown) -> Result<(), BindError>,
{
    let cleaned = cleanup(teardown_for(&result));
    match (result, cleaned) {
        (Ok(outcome), Ok(())) => Ok(outcome),
        (Ok(_), Err(cleanup_error)) => Err(cleanup_error),
        (Err(error), Ok(())) => Err(error),
        (Err(error), Err(cleanup_error)) => {
            error!(
                target: EXEC_TARGET,
                error = %cleanup_error,
                "cleanup failed after an earlier error"
            );
            Err(error)
        }
    }
}

fn workspace_prefix(source: &Path) -> String {
    source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_WORKSPACE_PREFIX.to_owned())
}
