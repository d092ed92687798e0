//! Composition of package-search variables such as `GOPATH`.
//!
//! The composed value is handed to the child through
//! [`ProcessSpec::env`](crate::ProcessSpec::env); the supervisor's own
//! environment is never modified.

use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::error::BindError;

/// Variable composed by the package-build variant unless overridden.
pub const DEFAULT_PACKAGE_VAR: &str = "GOPATH";

/// Prepends `prefix` to the search-path value `existing`.
///
/// In `clean` mode, or when `existing` is unset or empty, the result is
/// `prefix` alone. Otherwise entries are joined with the platform path-list
/// separator, `prefix` first.
///
/// # Errors
///
/// Returns [`BindError::PathList`] when an entry contains the separator.
pub fn compose_path_var(
    existing: Option<&OsStr>,
    prefix: &Path,
    clean: bool,
) -> Result<OsString, BindError> {
    let mut entries: Vec<PathBuf> = vec![prefix.to_path_buf()];
    if !clean && let Some(value) = existing.filter(|value| !value.is_empty()) {
        entries.extend(env::split_paths(value));
    }
    env::join_paths(entries).map_err(|error| BindError::PathList {
        message: error.to_string(),
    })
}
