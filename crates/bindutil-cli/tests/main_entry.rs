//! Integration tests for the `bindutil` binary entry point.
//!
//! Covers help output, usage failures, and the error paths that must leave
//! existing directories untouched. None of these tests need mount
//! privileges.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;
use tempfile::TempDir;

#[test]
fn help_lists_subcommands() {
    let mut command = cargo_bin_cmd!("bindutil");
    command.arg("--help");
    command
        .assert()
        .success()
        .stdout(contains("mount"))
        .stdout(contains("umount"))
        .stdout(contains("exec"))
        .stdout(contains("gpm"));
}

#[test]
fn unknown_subcommand_exits_with_failure() {
    let mut command = cargo_bin_cmd!("bindutil");
    command.arg("remount");
    command.assert().code(1).stderr(contains("remount"));
}

#[test]
fn unmounting_a_plain_directory_fails_without_removing_it() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut command = cargo_bin_cmd!("bindutil");
    command
        .args(["--retry-interval-ms", "0", "umount", "-r"])
        .arg(dir.path());
    command.assert().code(1).stderr(contains("bindutil:"));
    assert!(dir.path().is_dir(), "mountpoint must survive a failed unmount");
    Ok(())
}

#[test]
fn managed_exec_refuses_an_existing_destination() -> anyhow::Result<()> {
    let source = TempDir::new()?;
    let destination = TempDir::new()?;
    let mut command = cargo_bin_cmd!("bindutil");
    command
        .args(["exec", "-m"])
        .arg(source.path())
        .arg(destination.path())
        .arg("true");
    command.assert().code(1).stderr(contains("already exists"));
    assert!(destination.path().is_dir());
    Ok(())
}

#[test]
fn gpm_rejects_escaping_package_path() -> anyhow::Result<()> {
    let source = TempDir::new()?;
    let mut command = cargo_bin_cmd!("bindutil");
    command
        .arg("gpm")
        .arg(source.path())
        .args(["../escape", "true"]);
    command
        .assert()
        .code(1)
        .stderr(contains("must be relative and must not contain '..'"));
    Ok(())
}

#[test]
fn invalid_log_filter_is_reported() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut command = cargo_bin_cmd!("bindutil");
    command
        .args(["--log-filter", "bindutil=notalevel", "umount"])
        .arg(dir.path());
    command.assert().code(1).stderr(contains("invalid log filter"));
    Ok(())
}
