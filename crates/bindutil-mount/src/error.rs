//! Domain errors raised while binding, supervising and tearing down.
//!
//! I/O errors are wrapped in `Arc` so the enum stays small and cloneable.
//! A user interrupt is deliberately absent: cancellation is reported as
//! [`ChildOutcome::Terminated`](crate::ChildOutcome::Terminated), not as a
//! failure.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::backend::{BackendKind, UnmetPrerequisite};

/// Errors arising from the bind/exec/unbind lifecycle.
#[derive(Debug, Clone, Error)]
pub enum BindError {
    /// No usable mount backend exists on this host.
    #[error("unsupported platform {platform}: {}", describe_unmet(.missing))]
    UnsupportedPlatform {
        /// Operating system identifier the resolver saw.
        platform: String,
        /// Every backend prerequisite and why it was not met.
        missing: Vec<UnmetPrerequisite>,
    },

    /// The external bind command failed.
    #[error("failed to bind mount with {backend} (status {}): {output}", describe_status(.status))]
    MountFailed {
        /// Backend whose tool was invoked.
        backend: BackendKind,
        /// Exit status of the tool, absent when it never ran or was killed.
        status: Option<i32>,
        /// Combined stdout and stderr of the tool.
        output: String,
    },

    /// Neither `fusermount` nor `umount` could be found.
    #[error("no unmount tool (fusermount or umount) found on the search path")]
    NoUnmountTool,

    /// Unmounting failed fatally or stayed busy for every attempt.
    #[error("failed to unmount {} after {attempts} attempt(s): {output}", destination.display())]
    UnmountFailed {
        /// Mountpoint that could not be released.
        destination: PathBuf,
        /// Number of unmount attempts made.
        attempts: u32,
        /// Output of the final attempt.
        output: String,
    },

    /// The supervised child process could not be started.
    #[error("failed to execute command {}: {source}", program.to_string_lossy())]
    ProcessLaunch {
        /// Program that failed to launch.
        program: OsString,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// Waiting on the supervised child failed.
    #[error("failed to poll command {}: {source}", program.to_string_lossy())]
    ProcessWait {
        /// Program being supervised.
        program: OsString,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// A managed directory was expected to be absent.
    #[error("directory {} already exists", path.display())]
    DirectoryExists {
        /// Directory that already exists.
        path: PathBuf,
    },

    /// Creating a directory failed.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// Removing a directory tree failed.
    #[error("failed to remove directory {}: {source}", path.display())]
    RemoveDirectory {
        /// Directory that could not be removed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// A temporary workspace could not be allocated.
    #[error("failed to create temporary workspace: {source}")]
    Workspace {
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The package path would escape the workspace source tree.
    #[error("package path {} must be relative and must not contain '..'", path.display())]
    InvalidPackagePath {
        /// Rejected package path.
        path: PathBuf,
    },

    /// A search-path variable could not be composed.
    #[error("failed to compose path variable: {message}")]
    PathList {
        /// Description of the offending entry.
        message: String,
    },

    /// Installing the interrupt handler failed.
    #[error("failed to install interrupt handler: {source}")]
    InterruptHandler {
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
}

impl BindError {
    /// Returns true when the error means a bind may still be live.
    ///
    /// Workspace and directory teardown must not remove anything when this
    /// holds, since deleting over a live bind reaches into the source tree.
    #[must_use]
    pub const fn leaves_mount_live(&self) -> bool {
        matches!(self, Self::UnmountFailed { .. } | Self::NoUnmountTool)
    }
}

fn describe_unmet(missing: &[UnmetPrerequisite]) -> String {
    let parts: Vec<String> = missing.iter().map(ToString::to_string).collect();
    format!("need one of {}", parts.join(", "))
}

fn describe_status(status: &Option<i32>) -> String {
    status.map_or_else(|| String::from("none"), |code| code.to_string())
}
