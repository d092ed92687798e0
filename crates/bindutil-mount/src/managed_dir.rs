//! Optional create/remove bracket around a destination directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use crate::error::BindError;
use crate::workspace::{Teardown, remove_tree};

const MANAGED_DIR_TARGET: &str = "bindutil_mount::managed_dir";

/// A destination directory, created and removed by the tool when managed.
///
/// Unmanaged directories are never created or removed.
#[derive(Debug)]
pub struct ManagedDir {
    path: PathBuf,
    managed: bool,
}

impl ManagedDir {
    /// Enters the bracket, creating `path` when `managed`.
    ///
    /// Missing parents are created; the directory itself must not exist.
    ///
    /// # Errors
    ///
    /// - [`BindError::DirectoryExists`] when a managed path already exists.
    /// - [`BindError::CreateDirectory`] when creation fails.
    pub fn enter(path: &Path, managed: bool) -> Result<Self, BindError> {
        if managed {
            create_fresh(path)?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            managed,
        })
    }

    /// Takes over removal of a directory that already exists.
    #[must_use]
    pub fn adopt(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            managed: true,
        }
    }

    /// The bracketed directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the directory is created and removed by the tool.
    #[must_use]
    pub const fn managed(&self) -> bool {
        self.managed
    }

    /// Leaves the bracket, removing a managed directory after a clean
    /// teardown.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::RemoveDirectory`] when removal fails.
    pub fn exit(self, teardown: Teardown) -> Result<(), BindError> {
        if !self.managed {
            return Ok(());
        }
        match teardown {
            Teardown::Clean => remove_tree(&self.path),
            Teardown::MountFailed => {
                warn!(
                    target: MANAGED_DIR_TARGET,
                    path = %self.path.display(),
                    "unmount failed; leaving managed directory in place"
                );
                Ok(())
            }
        }
    }
}

fn create_fresh(path: &Path) -> Result<(), BindError> {
    let create_error = |source: io::Error| BindError::CreateDirectory {
        path: path.to_path_buf(),
        source: Arc::new(source),
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(create_error)?;
    }
    match fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {
            Err(BindError::DirectoryExists {
                path: path.to_path_buf(),
            })
        }
        Err(error) => Err(create_error(error)),
    }
}
