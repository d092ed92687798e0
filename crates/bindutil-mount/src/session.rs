//! Scoped bind acquisition with guaranteed release.
//!
//! A [`MountBinding`] exists only once the bind tool has succeeded. It is
//! released exactly once: explicitly through [`MountBinding::release`], by
//! [`MountSession::scoped`] on every path out of the scope, or as a last
//! resort from `Drop` when a bound binding is abandoned during unwinding.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::backend::{BackendKind, resolve_backend};
use crate::error::BindError;
use crate::runner::CommandRunner;
use crate::tools::{Platform, ToolLocator};
use crate::unmount::{RetryPolicy, RetryingUnmounter, UnmountReport};
use crate::workspace::Teardown;

const SESSION_TARGET: &str = "bindutil_mount::session";

/// Lifecycle state of a [`MountBinding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    /// Nothing is bound at the destination.
    Unbound,
    /// The source is bound at the destination.
    Bound,
    /// An unmount sequence is in progress.
    Unbinding,
    /// Unmounting was abandoned; the bind may still be live.
    Failed,
}

/// Binds directories through the host's mount backend.
#[derive(Debug)]
pub struct MountSession<L, R> {
    platform: Platform,
    locator: L,
    runner: R,
    policy: RetryPolicy,
}

impl<L, R> MountSession<L, R>
where
    L: ToolLocator,
    R: CommandRunner,
{
    /// Creates a session from its collaborators.
    pub const fn new(platform: Platform, locator: L, runner: R, policy: RetryPolicy) -> Self {
        Self {
            platform,
            locator,
            runner,
            policy,
        }
    }

    /// Tool locator used for backend and command resolution.
    pub const fn locator(&self) -> &L {
        &self.locator
    }

    /// Binds `source` onto `destination`.
    ///
    /// # Errors
    ///
    /// - [`BindError::UnsupportedPlatform`] when no backend is usable.
    /// - [`BindError::MountFailed`] when the bind tool fails to start or
    ///   exits nonzero. Nothing is bound in either case.
    pub fn acquire(
        &self,
        source: &Path,
        destination: &Path,
    ) -> Result<MountBinding<'_, L, R>, BindError> {
        let backend = resolve_backend(&self.platform, &self.locator)?;
        let args = backend.bind_args(source, destination);
        let output = self
            .runner
            .run(backend.program(), &args)
            .map_err(|error| BindError::MountFailed {
                backend: backend.kind(),
                status: None,
                output: error.to_string(),
            })?;

        if !output.success() {
            return Err(BindError::MountFailed {
                backend: backend.kind(),
                status: output.status,
                output: output.output,
            });
        }

        info!(
            target: SESSION_TARGET,
            source = %source.display(),
            destination = %destination.display(),
            backend = %backend.kind(),
            "bound"
        );
        Ok(MountBinding {
            session: self,
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            backend: backend.kind(),
            state: BindingState::Bound,
            detached: false,
        })
    }

    /// Runs `body` with `source` bound onto `destination`, then releases.
    ///
    /// The release runs whether `body` succeeds or fails, and its result is
    /// reported separately in [`Scoped`]. When acquiring fails the body does
    /// not run and nothing is released.
    ///
    /// # Errors
    ///
    /// Returns the acquisition error from [`MountSession::acquire`].
    pub fn scoped<T, F>(
        &self,
        source: &Path,
        destination: &Path,
        body: F,
    ) -> Result<Scoped<T>, BindError>
    where
        F: FnOnce(&MountBinding<'_, L, R>) -> Result<T, BindError>,
    {
        let mut binding = self.acquire(source, destination)?;
        let body = body(&binding);
        let release = binding.release();
        Ok(Scoped { body, release })
    }

    /// Binds `source` onto `destination` and leaves the bind in place.
    ///
    /// # Errors
    ///
    /// See [`MountSession::acquire`].
    pub fn bind_only(&self, source: &Path, destination: &Path) -> Result<BackendKind, BindError> {
        let binding = self.acquire(source, destination)?;
        let backend = binding.backend();
        binding.detach();
        Ok(backend)
    }

    /// Unmounts a path this session did not bind, such as one left by an
    /// earlier `mount` invocation.
    ///
    /// The unmount tool is paired with the backend a bind would resolve to on
    /// this host. When no backend resolves, `fusermount` is tried first.
    ///
    /// # Errors
    ///
    /// See [`RetryingUnmounter::unmount`].
    pub fn unmount_path(&self, destination: &Path) -> Result<UnmountReport, BindError> {
        let backend = resolve_backend(&self.platform, &self.locator)
            .ok()
            .map(|resolved| resolved.kind());
        self.unmounter().unmount(destination, backend)
    }

    fn unmounter(&self) -> RetryingUnmounter<&L, &R> {
        RetryingUnmounter::new(&self.locator, &self.runner, self.policy)
    }
}

/// A live bind owned by the session that created it.
#[derive(Debug)]
pub struct MountBinding<'s, L, R>
where
    L: ToolLocator,
    R: CommandRunner,
{
    session: &'s MountSession<L, R>,
    source: PathBuf,
    destination: PathBuf,
    backend: BackendKind,
    state: BindingState,
    detached: bool,
}

impl<L, R> MountBinding<'_, L, R>
where
    L: ToolLocator,
    R: CommandRunner,
{
    /// Directory that was bound.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Mountpoint the source is visible at.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Backend that created the bind.
    #[must_use]
    pub const fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> BindingState {
        self.state
    }

    /// Runs the unmount sequence for a bound binding.
    ///
    /// Success moves the binding to [`BindingState::Unbound`]; failure
    /// leaves it [`BindingState::Failed`]. A binding that is not bound has
    /// nothing to release and returns `Ok` without invoking any tool.
    ///
    /// # Errors
    ///
    /// Propagates [`BindError::NoUnmountTool`] or
    /// [`BindError::UnmountFailed`].
    pub fn release(&mut self) -> Result<(), BindError> {
        if self.state != BindingState::Bound {
            return Ok(());
        }
        self.state = BindingState::Unbinding;
        match self
            .session
            .unmounter()
            .unmount(&self.destination, Some(self.backend))
        {
            Ok(_) => {
                self.state = BindingState::Unbound;
                Ok(())
            }
            Err(error) => {
                self.state = BindingState::Failed;
                error!(
                    target: SESSION_TARGET,
                    destination = %self.destination.display(),
                    error = %error,
                    "unmount abandoned; bind may still be live"
                );
                Err(error)
            }
        }
    }

    /// Leaves the bind in place and stops tracking it.
    ///
    /// The caller becomes responsible for a later unmount, typically through
    /// the `umount` subcommand.
    pub fn detach(mut self) {
        self.detached = true;
        info!(
            target: SESSION_TARGET,
            destination = %self.destination.display(),
            "bind left in place"
        );
    }

    /// Teardown outcome implied by the current state.
    #[must_use]
    pub const fn teardown(&self) -> Teardown {
        match self.state {
            BindingState::Failed => Teardown::MountFailed,
            _ => Teardown::Clean,
        }
    }
}

impl<L, R> Drop for MountBinding<'_, L, R>
where
    L: ToolLocator,
    R: CommandRunner,
{
    fn drop(&mut self) {
        if self.detached || self.state != BindingState::Bound {
            return;
        }
        if let Err(error) = self.release() {
            error!(
                target: SESSION_TARGET,
                destination = %self.destination.display(),
                error = %error,
                "failed to release abandoned bind"
            );
        }
    }
}

/// Results of a [`MountSession::scoped`] run.
#[derive(Debug)]
pub struct Scoped<T> {
    /// Result of the scoped body.
    pub body: Result<T, BindError>,
    /// Result of the release that followed it.
    pub release: Result<(), BindError>,
}

impl<T> Scoped<T> {
    /// Teardown outcome for workspaces and managed directories.
    #[must_use]
    pub fn teardown(&self) -> Teardown {
        match &self.release {
            Err(error) if error.leaves_mount_live() => Teardown::MountFailed,
            _ => Teardown::Clean,
        }
    }

    /// Collapses both results; a release failure takes precedence.
    ///
    /// # Errors
    ///
    /// Returns the release error if there was one, otherwise the body's.
    pub fn into_result(self) -> Result<T, BindError> {
        self.release?;
        self.body
    }
}
