//! Bind-mount lifecycle management for `bindutil`.
//!
//! The `bindutil-mount` crate binds a source directory onto a destination
//! with an external tool (`bindfs` or `mount -o bind`), runs a child process
//! against the destination, and guarantees the bind is released afterwards.
//! Mounting itself is never implemented here; the crate owns the sequencing,
//! the retry of busy unmounts, and the cleanup ordering around the external
//! tools.
//!
//! - [`resolve_backend`] picks the bind mechanism for the host.
//! - [`MountSession`] acquires a [`MountBinding`] and releases it on every
//!   exit path.
//! - [`RetryingUnmounter`] retries unmounts that report "resource busy".
//! - [`ProcessSupervisor`] polls the child and terminates it once a
//!   [`CancellationToken`] is set.
//! - [`Workspace`] and [`ManagedDir`] remove directories only after a clean
//!   unmount.
//! - [`BindExecutor`] ties the pieces together in a fixed order.
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! use bindutil_mount::{
//!     BindExecutor, CancellationToken, ExecRequest, MountSession, Platform,
//!     ProcessSpec, ProcessSupervisor, RetryPolicy, SearchPathLocator,
//!     SystemRunner,
//! };
//!
//! # fn main() -> Result<(), bindutil_mount::BindError> {
//! let session = MountSession::new(
//!     Platform::current(),
//!     SearchPathLocator,
//!     SystemRunner,
//!     RetryPolicy::default(),
//! );
//! let executor = BindExecutor::new(session, ProcessSupervisor::default());
//! let request = ExecRequest {
//!     source: PathBuf::from("/srv/project"),
//!     destination: PathBuf::from("/tmp/project-view"),
//!     manage_dir: true,
//!     command: ProcessSpec::new("make").args(["test"]),
//! };
//! let outcome = executor.exec(&request, &CancellationToken::new())?;
//! println!("{outcome:?}");
//! # Ok(()) }
//! ```

mod backend;
mod cancel;
mod env;
mod error;
mod exec;
mod managed_dir;
mod runner;
mod session;
mod supervisor;
mod tools;
mod unmount;
mod workspace;

pub use backend::{
    BINDFS, BackendKind, MOUNT, Prerequisite, ResolvedBackend, UnmetPrerequisite, UnmetReason,
    resolve_backend,
};
pub use cancel::{CancellationToken, InterruptHandler};
pub use env::{DEFAULT_PACKAGE_VAR, compose_path_var};
pub use error::BindError;
pub use exec::{BindExecutor, ExecRequest, PackageRequest};
pub use managed_dir::ManagedDir;
pub use runner::{CommandRunner, SystemRunner, ToolOutput};
pub use session::{BindingState, MountBinding, MountSession, Scoped};
pub use supervisor::{
    ChildOutcome, DEFAULT_POLL_INTERVAL, ProcessSpec, ProcessSupervisor, TERMINATION_GRACE,
};
pub use tools::{Platform, SearchPathLocator, ToolLocator};
pub use unmount::{
    BUSY_MARKER, DEFAULT_ATTEMPTS, DEFAULT_INTERVAL, FailureClass, RetryPolicy,
    RetryingUnmounter, UnmountProgram, UnmountReport, classify_failure,
};
pub use workspace::{PackageLayout, Teardown, Workspace, validate_package_path};

#[cfg(test)]
mod tests;
