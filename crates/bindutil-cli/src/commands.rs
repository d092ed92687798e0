//! Subcommand handlers.
//!
//! Each handler resolves its paths, wires the system tool locator and runner
//! into a [`MountSession`], and maps the lifecycle result to an exit code.

use std::env;
use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use bindutil_config::Config;
use bindutil_mount::{
    BindExecutor, CancellationToken, ExecRequest, InterruptHandler, ManagedDir, MountSession,
    PackageRequest, Platform, ProcessSpec, ProcessSupervisor, RetryPolicy, SearchPathLocator,
    SystemRunner, Teardown,
};
use tracing::{info, warn};

use crate::cli::{CliCommand, ExecArgs, GpmArgs, MountArgs, UmountArgs};
use crate::errors::AppError;
use crate::paths::resolve_path;
use crate::runtime_utils::exit_code_from_outcome;

const COMMANDS_TARGET: &str = "bindutil_cli::commands";

type SystemSession = MountSession<SearchPathLocator, SystemRunner>;

pub(crate) fn dispatch<E>(
    config: &Config,
    command: CliCommand,
    stderr: &mut E,
) -> Result<ExitCode, AppError>
where
    E: Write,
{
    match command {
        CliCommand::Mount(args) => mount(config, &args),
        CliCommand::Umount(args) => umount(config, &args),
        CliCommand::Exec(args) => exec(config, args, stderr),
        CliCommand::Gpm(args) => gpm(config, args, stderr),
    }
}

fn system_session(config: &Config) -> SystemSession {
    MountSession::new(
        Platform::current(),
        SearchPathLocator,
        SystemRunner,
        RetryPolicy::new(config.unmount_attempts(), config.retry_interval()),
    )
}

fn system_executor(config: &Config) -> BindExecutor<SearchPathLocator, SystemRunner> {
    BindExecutor::new(
        system_session(config),
        ProcessSupervisor::new(config.poll_interval()),
    )
}

fn mount(config: &Config, args: &MountArgs) -> Result<ExitCode, AppError> {
    let source = resolve_path(&args.source)?;
    let destination = resolve_path(&args.destination)?;
    let dir = ManagedDir::enter(&destination, args.create_dir)?;

    match system_session(config).bind_only(&source, &destination) {
        Ok(backend) => {
            info!(
                target: COMMANDS_TARGET,
                destination = %destination.display(),
                %backend,
                "mounted"
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            if let Err(cleanup) = dir.exit(Teardown::Clean) {
                warn!(
                    target: COMMANDS_TARGET,
                    error = %cleanup,
                    "failed to remove destination after a failed mount"
                );
            }
            Err(error.into())
        }
    }
}

fn umount(config: &Config, args: &UmountArgs) -> Result<ExitCode, AppError> {
    let path = resolve_path(&args.path)?;
    system_session(config).unmount_path(&path)?;
    if args.remove_dir {
        ManagedDir::adopt(&path).exit(Teardown::Clean)?;
    }
    Ok(ExitCode::SUCCESS)
}

fn exec<E>(config: &Config, args: ExecArgs, stderr: &mut E) -> Result<ExitCode, AppError>
where
    E: Write,
{
    let mut command = process_spec(args.command)?;
    if let Some(dir) = &args.working_directory {
        command = command.current_dir(resolve_path(dir)?);
    }
    let request = ExecRequest {
        source: resolve_path(&args.source)?,
        destination: resolve_path(&args.destination)?,
        manage_dir: args.manage_dir,
        command,
    };

    let token = CancellationToken::new();
    let _handler = InterruptHandler::install(&token)?;
    let outcome = system_executor(config).exec(&request, &token)?;
    Ok(exit_code_from_outcome(outcome, stderr))
}

fn gpm<E>(config: &Config, args: GpmArgs, stderr: &mut E) -> Result<ExitCode, AppError>
where
    E: Write,
{
    let command = process_spec(args.command)?;
    let mut request = PackageRequest::new(resolve_path(&args.source)?, args.package, command);
    request.existing_value = env::var_os(&args.path_var);
    request.path_var = args.path_var;
    request.clean = args.clean_gopath;

    let token = CancellationToken::new();
    let _handler = InterruptHandler::install(&token)?;
    let outcome = system_executor(config).exec_package(&request, &token)?;
    Ok(exit_code_from_outcome(outcome, stderr))
}

fn process_spec(command: Vec<OsString>) -> Result<ProcessSpec, AppError> {
    let mut parts = command.into_iter();
    let program = parts.next().ok_or(AppError::MissingCommand)?;
    Ok(ProcessSpec::new(program).args(parts))
}
