//! Resolution of user-supplied paths to absolute form.
//!
//! A leading `~` expands to the home directory, then `$VAR` and `${VAR}`
//! references expand from the environment. Unset variables are left as
//! written. Relative results are anchored at the current directory and
//! normalised lexically, without touching the filesystem, so paths that do
//! not exist yet (a destination about to be created) resolve too.

use std::env;
use std::ffi::OsString;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Errors raised while resolving a path.
#[derive(Debug, Error)]
pub(crate) enum PathError {
    #[error("failed to resolve {} against the current directory: {source}", path.display())]
    CurrentDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Expands and absolutises `raw` using the process environment.
pub(crate) fn resolve_path(raw: &Path) -> Result<PathBuf, PathError> {
    let expanded = expand(raw, dirs::home_dir().as_deref(), |name| env::var_os(name));
    absolutize(&expanded)
}

/// Expands `~` and variable references in `raw`.
///
/// Paths that are not valid UTF-8 are returned unchanged.
pub(crate) fn expand<F>(raw: &Path, home: Option<&Path>, lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<OsString>,
{
    let Some(text) = raw.to_str() else {
        return raw.to_path_buf();
    };
    let with_home = expand_home(text, home);
    match with_home.to_str() {
        Some(text) => PathBuf::from(expand_vars(text, &lookup)),
        None => with_home,
    }
}

fn expand_home(text: &str, home: Option<&Path>) -> PathBuf {
    let rest = match text.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return PathBuf::from(text),
    };
    let Some(home) = home else {
        return PathBuf::from(text);
    };
    let mut expanded = home.as_os_str().to_owned();
    expanded.push(rest);
    PathBuf::from(expanded)
}

fn expand_vars<F>(text: &str, lookup: &F) -> OsString
where
    F: Fn(&str) -> Option<OsString>,
{
    let mut expanded = OsString::new();
    let mut remaining = text;
    while let Some(index) = remaining.find('$') {
        let (head, tail) = remaining.split_at(index);
        expanded.push(head);
        let after = tail.strip_prefix('$').unwrap_or(tail);
        match split_variable(after) {
            Some((name, rest)) => {
                let consumed = after.len() - rest.len();
                match lookup(name) {
                    Some(value) => expanded.push(value),
                    None => {
                        expanded.push("$");
                        expanded.push(after.split_at(consumed).0);
                    }
                }
                remaining = rest;
            }
            None => {
                expanded.push("$");
                remaining = after;
            }
        }
    }
    expanded.push(remaining);
    expanded
}

/// Splits a variable reference off the text following a `$`.
///
/// Returns the variable name and the text after the reference.
fn split_variable(after: &str) -> Option<(&str, &str)> {
    if let Some(braced) = after.strip_prefix('{') {
        let end = braced.find('}')?;
        let (name, tail) = braced.split_at(end);
        if name.is_empty() {
            return None;
        }
        return Some((name, tail.strip_prefix('}').unwrap_or(tail)));
    }
    let end = after
        .find(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
        .unwrap_or(after.len());
    if end == 0 {
        return None;
    }
    Some(after.split_at(end))
}

/// Anchors `path` at the current directory and removes `.` and `..`.
pub(crate) fn absolutize(path: &Path) -> Result<PathBuf, PathError> {
    let anchored = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map_err(|source| PathError::CurrentDir {
                path: path.to_path_buf(),
                source,
            })?
            .join(path)
    };
    Ok(normalize(&anchored))
}

/// Lexically normalises an absolute path.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
