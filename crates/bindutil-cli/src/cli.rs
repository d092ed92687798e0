//! CLI argument definitions for `bindutil`.

use std::ffi::OsString;
use std::path::PathBuf;

use bindutil_config::Config;
use bindutil_mount::DEFAULT_PACKAGE_VAR;
use clap::{Args, Parser, Subcommand};

/// Bind-mounts directories and runs commands against them.
#[derive(Parser, Debug)]
#[command(name = "bindutil", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Runtime settings shared by every subcommand.
    #[command(flatten)]
    pub(crate) config: Config,
    /// Operation to perform.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Subcommands understood by `bindutil`.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Bind-mounts a directory and leaves it mounted.
    Mount(MountArgs),
    /// Unmounts a bind-mounted directory, retrying while it is busy.
    Umount(UmountArgs),
    /// Runs a command with a directory bind-mounted, then unmounts it.
    Exec(ExecArgs),
    /// Runs a command inside a temporary Go workspace that binds the source.
    Gpm(GpmArgs),
}

#[derive(Args, Debug, Clone)]
pub(crate) struct MountArgs {
    /// Create the destination directory first; it must not exist.
    #[arg(short = 'c', long = "create-dir")]
    pub(crate) create_dir: bool,
    /// Source path to bind mount.
    #[arg(value_name = "SOURCE")]
    pub(crate) source: PathBuf,
    /// Destination to bind mount onto.
    #[arg(value_name = "DESTINATION")]
    pub(crate) destination: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct UmountArgs {
    /// Remove the mountpoint after a successful unmount.
    #[arg(short = 'r', long = "remove-dir")]
    pub(crate) remove_dir: bool,
    /// Bind-mounted directory to unmount.
    #[arg(value_name = "PATH")]
    pub(crate) path: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ExecArgs {
    /// Create the destination before mounting and remove it afterwards.
    #[arg(short = 'm', long = "manage-dir")]
    pub(crate) manage_dir: bool,
    /// Working directory for the command.
    #[arg(short = 'd', long = "working-directory", value_name = "DIR")]
    pub(crate) working_directory: Option<PathBuf>,
    /// Source path to bind mount.
    #[arg(value_name = "SOURCE")]
    pub(crate) source: PathBuf,
    /// Destination to bind mount onto.
    #[arg(value_name = "DESTINATION")]
    pub(crate) destination: PathBuf,
    /// Command to execute, followed by its arguments.
    #[arg(
        value_name = "COMMAND",
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub(crate) command: Vec<OsString>,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct GpmArgs {
    /// Use only the temporary workspace instead of prepending it.
    #[arg(long = "clean-gopath")]
    pub(crate) clean_gopath: bool,
    /// Package-search variable to compose.
    #[arg(long = "path-var", value_name = "NAME", default_value = DEFAULT_PACKAGE_VAR)]
    pub(crate) path_var: OsString,
    /// Source path to bind mount.
    #[arg(value_name = "SOURCE")]
    pub(crate) source: PathBuf,
    /// Package path inside the workspace, for example `github.com/acme/widget`.
    #[arg(value_name = "PACKAGE")]
    pub(crate) package: PathBuf,
    /// Command to execute, followed by its arguments.
    #[arg(
        value_name = "COMMAND",
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub(crate) command: Vec<OsString>,
}
