//! Host discovery: operating system detection and executable lookup.

use std::fmt;
use std::path::PathBuf;

/// Looks up external executables by name.
///
/// The production implementation is [`SearchPathLocator`]. Tests substitute
/// fixed tool tables so backend selection can be exercised on any host.
pub trait ToolLocator {
    /// Returns the absolute path of `program`, or `None` when it is absent.
    fn locate(&self, program: &str) -> Option<PathBuf>;
}

impl<T: ToolLocator + ?Sized> ToolLocator for &T {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        (**self).locate(program)
    }
}

/// Resolves executables against the `PATH` of the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SearchPathLocator;

impl ToolLocator for SearchPathLocator {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

/// Operating systems the backend resolver distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    /// macOS.
    Darwin,
    /// Linux.
    Linux,
    /// Anything else, carrying the reported OS identifier.
    Other(String),
}

impl Platform {
    /// Detects the platform this binary was compiled for.
    #[must_use]
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Maps an OS identifier as reported by `std::env::consts::OS`.
    #[must_use]
    pub fn from_os(os: &str) -> Self {
        match os {
            "macos" => Self::Darwin,
            "linux" => Self::Linux,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Darwin => f.write_str("darwin"),
            Self::Linux => f.write_str("linux"),
            Self::Other(name) => f.write_str(name),
        }
    }
}
