//! Disposable workspaces hosting a bind target.
//!
//! A workspace is never removed implicitly. Removal happens only through
//! [`Workspace::finish`], and only when the paired bind was released;
//! deleting a tree with a live bind underneath would reach into the bound
//! source.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::BindError;

const WORKSPACE_TARGET: &str = "bindutil_mount::workspace";

/// Outcome of mount teardown, consumed by directory cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    /// The bind was released, or no bind was made.
    Clean,
    /// Unmounting failed; the bind may still be live.
    MountFailed,
}

/// A temporary directory tree created to host a bind.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Creates a uniquely named temporary directory starting with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::Workspace`] when the directory cannot be made.
    pub fn create_temp(prefix: &str) -> Result<Self, BindError> {
        let root = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .map_err(|source| BindError::Workspace {
                source: Arc::new(source),
            })?
            .keep();
        info!(
            target: WORKSPACE_TARGET,
            root = %root.display(),
            "created workspace"
        );
        Ok(Self { root })
    }

    /// Root directory of the workspace.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Removes the workspace unless the bind teardown failed.
    ///
    /// After [`Teardown::MountFailed`] the tree is left on disk for the
    /// operator and a warning names it.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::RemoveDirectory`] when removal fails.
    pub fn finish(self, teardown: Teardown) -> Result<(), BindError> {
        match teardown {
            Teardown::MountFailed => {
                warn!(
                    target: WORKSPACE_TARGET,
                    root = %self.root.display(),
                    "unmount failed; leaving workspace in place"
                );
                Ok(())
            }
            Teardown::Clean => remove_tree(&self.root),
        }
    }
}

/// Nested layout used by the package-build variant.
///
/// `<root>/src/<package>` receives the bind; `<root>/bin` collects build
/// output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLayout {
    source_dir: PathBuf,
    bin_dir: PathBuf,
}

impl PackageLayout {
    /// Computes the layout for `package` under `root` without touching disk.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::InvalidPackagePath`] unless `package` is a
    /// non-empty relative path made only of normal components.
    pub fn plan(root: &Path, package: &Path) -> Result<Self, BindError> {
        validate_package_path(package)?;
        Ok(Self {
            source_dir: root.join("src").join(package),
            bin_dir: root.join("bin"),
        })
    }

    /// Creates both directories.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::CreateDirectory`] for the first directory that
    /// cannot be created.
    pub fn create(&self) -> Result<(), BindError> {
        for dir in [&self.source_dir, &self.bin_dir] {
            fs::create_dir_all(dir).map_err(|source| BindError::CreateDirectory {
                path: dir.clone(),
                source: Arc::new(source),
            })?;
        }
        Ok(())
    }

    /// Directory the source tree is bound onto.
    #[must_use]
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Directory for build output.
    #[must_use]
    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }
}

/// Rejects package paths that are empty, absolute or climb out of `src/`.
///
/// # Errors
///
/// Returns [`BindError::InvalidPackagePath`].
pub fn validate_package_path(package: &Path) -> Result<(), BindError> {
    let mut components = package.components().peekable();
    let valid = components.peek().is_some()
        && components.all(|component| matches!(component, Component::Normal(_)));
    if valid {
        Ok(())
    } else {
        Err(BindError::InvalidPackagePath {
            path: package.to_path_buf(),
        })
    }
}

pub(crate) fn remove_tree(path: &Path) -> Result<(), BindError> {
    fs::remove_dir_all(path).map_err(|source| BindError::RemoveDirectory {
        path: path.to_path_buf(),
        source: Arc::new(source),
    })?;
    info!(
        target: WORKSPACE_TARGET,
        path = %path.display(),
        "removed directory"
    );
    Ok(())
}
