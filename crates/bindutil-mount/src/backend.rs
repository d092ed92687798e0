//! Mount backend selection.
//!
//! [`resolve_backend`] is a total, ordered decision over the host platform
//! and the tools found on the search path. Every outcome, including "nothing
//! usable", is a named value so callers and tests never rely on a
//! fallthrough.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::BindError;
use crate::tools::{Platform, ToolLocator};

const BACKEND_TARGET: &str = "bindutil_mount::backend";

/// Userspace bind filesystem driver.
pub const BINDFS: &str = "bindfs";
/// Kernel mount tool.
pub const MOUNT: &str = "mount";

/// Mechanism used to bind a source directory onto a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// `bindfs` on macOS.
    UserspaceBindfsDarwin,
    /// `bindfs` on Linux.
    UserspaceBindfsLinux,
    /// `mount -o bind` on Linux.
    KernelBindMount,
    /// No usable mechanism.
    Unsupported,
}

impl BackendKind {
    /// Returns true for FUSE-backed binds, which pair with `fusermount -u`.
    #[must_use]
    pub const fn is_userspace(self) -> bool {
        matches!(self, Self::UserspaceBindfsDarwin | Self::UserspaceBindfsLinux)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::UserspaceBindfsDarwin => "bindfs (darwin)",
            Self::UserspaceBindfsLinux => "bindfs (linux)",
            Self::KernelBindMount => "mount -o bind",
            Self::Unsupported => "unsupported",
        };
        f.write_str(label)
    }
}

/// The three host configurations that can provide a bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prerequisite {
    /// macOS with `bindfs` installed.
    DarwinBindfs,
    /// Linux with `bindfs` installed.
    LinuxBindfs,
    /// Linux with the kernel `mount` tool.
    LinuxMount,
}

impl fmt::Display for Prerequisite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::DarwinBindfs => "darwin/bindfs",
            Self::LinuxBindfs => "linux/bindfs",
            Self::LinuxMount => "linux/mount -o bind",
        };
        f.write_str(label)
    }
}

/// Why a prerequisite was not satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmetReason {
    /// The host runs a different operating system.
    WrongPlatform,
    /// The required tool is not on the search path.
    ToolMissing(&'static str),
}

/// A prerequisite paired with the reason it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnmetPrerequisite {
    /// Prerequisite that was checked.
    pub prerequisite: Prerequisite,
    /// Reason it was not met.
    pub reason: UnmetReason,
}

impl fmt::Display for UnmetPrerequisite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            UnmetReason::WrongPlatform => write!(f, "{} (wrong platform)", self.prerequisite),
            UnmetReason::ToolMissing(tool) => {
                write!(f, "{} ({tool} not found)", self.prerequisite)
            }
        }
    }
}

/// A selected backend together with the tool that implements it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBackend {
    kind: BackendKind,
    program: PathBuf,
}

impl ResolvedBackend {
    /// Pairs a backend with the absolute path of its tool.
    #[must_use]
    pub const fn new(kind: BackendKind, program: PathBuf) -> Self {
        Self { kind, program }
    }

    /// Backend variant.
    #[must_use]
    pub const fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Absolute path of the bind tool.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Builds the argument vector binding `source` onto `destination`.
    #[must_use]
    pub fn bind_args(&self, source: &Path, destination: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = match self.kind {
            BackendKind::UserspaceBindfsDarwin => {
                vec!["-o".into(), "local,extended_security".into()]
            }
            BackendKind::UserspaceBindfsLinux => vec!["-n".into()],
            BackendKind::KernelBindMount => vec!["-o".into(), "bind".into()],
            BackendKind::Unsupported => Vec::new(),
        };
        args.push(source.as_os_str().to_owned());
        args.push(destination.as_os_str().to_owned());
        args
    }
}

/// Chooses the bind mechanism for `platform`, first match wins.
///
/// 1. macOS with `bindfs` → [`BackendKind::UserspaceBindfsDarwin`].
/// 2. Linux with `bindfs` → [`BackendKind::UserspaceBindfsLinux`].
/// 3. Linux with `mount` → [`BackendKind::KernelBindMount`].
/// 4. Otherwise [`BindError::UnsupportedPlatform`], listing all three
///    prerequisites and why each was unmet.
///
/// # Errors
///
/// Returns [`BindError::UnsupportedPlatform`] when no rule matches.
pub fn resolve_backend<L>(platform: &Platform, locator: &L) -> Result<ResolvedBackend, BindError>
where
    L: ToolLocator + ?Sized,
{
    let bindfs = locator.locate(BINDFS);
    let mount = locator.locate(MOUNT);

    let resolved = match (platform, bindfs, mount) {
        (Platform::Darwin, Some(program), _) => {
            ResolvedBackend::new(BackendKind::UserspaceBindfsDarwin, program)
        }
        (Platform::Linux, Some(program), _) => {
            ResolvedBackend::new(BackendKind::UserspaceBindfsLinux, program)
        }
        (Platform::Linux, None, Some(program)) => {
            ResolvedBackend::new(BackendKind::KernelBindMount, program)
        }
        (_, bindfs, mount) => {
            return Err(BindError::UnsupportedPlatform {
                platform: platform.to_string(),
                missing: unmet_prerequisites(platform, bindfs.is_some(), mount.is_some()),
            });
        }
    };

    debug!(
        target: BACKEND_TARGET,
        backend = %resolved.kind(),
        program = %resolved.program().display(),
        "resolved mount backend"
    );
    Ok(resolved)
}

fn unmet_prerequisites(
    platform: &Platform,
    has_bindfs: bool,
    has_mount: bool,
) -> Vec<UnmetPrerequisite> {
    let check = |prerequisite, wanted: &Platform, tool: &'static str, present: bool| {
        let reason = if platform != wanted {
            UnmetReason::WrongPlatform
        } else if !present {
            UnmetReason::ToolMissing(tool)
        } else {
            return None;
        };
        Some(UnmetPrerequisite {
            prerequisite,
            reason,
        })
    };

    [
        check(Prerequisite::DarwinBindfs, &Platform::Darwin, BINDFS, has_bindfs),
        check(Prerequisite::LinuxBindfs, &Platform::Linux, BINDFS, has_bindfs),
        check(Prerequisite::LinuxMount, &Platform::Linux, MOUNT, has_mount),
    ]
    .into_iter()
    .flatten()
    .collect()
}
