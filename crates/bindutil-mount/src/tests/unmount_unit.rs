//! Unit tests for the retrying unmounter.

use std::ffi::OsString;
use std::path::Path;
use std::time::{Duration, Instant};

use rstest::rstest;

use crate::backend::BackendKind;
use crate::error::BindError;
use crate::runner::ToolOutput;
use crate::tests::support::{FakeLocator, ScriptedRunner, fast_policy};
use crate::unmount::{
    FailureClass, RetryPolicy, RetryingUnmounter, UnmountProgram, classify_failure,
};

const DEST: &str = "/mnt/view";

#[rstest]
#[case::linux("umount: /mnt/view: target is busy (Device or resource busy)")]
#[case::bsd("umount(/mnt/view): Resource busy -- try 'diskutil unmount'")]
#[case::fuse("fusermount: failed to unmount /mnt/view: Device or resource busy")]
#[case::shouting("RESOURCE BUSY")]
fn busy_output_is_transient(#[case] output: &str) {
    assert_eq!(classify_failure(output), FailureClass::Transient);
}

#[rstest]
#[case::not_mounted("umount: /mnt/view: not mounted.")]
#[case::permission("umount: /mnt/view: must be superuser to unmount.")]
#[case::empty("")]
#[case::bare_busy("umount: /mnt/view: target is busy.")]
fn other_output_is_fatal(#[case] output: &str) {
    assert_eq!(classify_failure(output), FailureClass::Fatal);
}

#[rstest]
#[case::kernel(Some(BackendKind::KernelBindMount), UnmountProgram::Umount)]
#[case::userspace(Some(BackendKind::UserspaceBindfsLinux), UnmountProgram::Fusermount)]
#[case::unknown(None, UnmountProgram::Fusermount)]
fn preferred_tool_matches_backend(
    #[case] backend: Option<BackendKind>,
    #[case] preferred: UnmountProgram,
) {
    let [first, second] = UnmountProgram::candidates(backend);
    assert_eq!(first, preferred);
    assert_ne!(second, preferred);
}

#[test]
fn tool_arguments_name_the_destination() {
    let dest = Path::new(DEST);
    assert_eq!(
        UnmountProgram::Fusermount.args(dest),
        vec![OsString::from("-u"), OsString::from(DEST)]
    );
    assert_eq!(UnmountProgram::Umount.args(dest), vec![OsString::from(DEST)]);
}

#[test]
fn zero_attempts_is_raised_to_one() {
    assert_eq!(RetryPolicy::new(0, Duration::ZERO).attempts(), 1);
    assert_eq!(RetryPolicy::default().attempts(), 5);
    assert_eq!(RetryPolicy::default().interval(), Duration::from_secs(1));
}

#[rstest]
#[case::first_try(0)]
#[case::after_one_busy(1)]
#[case::after_four_busy(4)]
fn succeeds_after_transient_busy_attempts(#[case] busy: usize) {
    let locator = FakeLocator::linux_bindfs();
    let runner = ScriptedRunner::new();
    runner.push_busy(busy);
    let policy = fast_policy(5);
    let unmounter = RetryingUnmounter::new(&locator, &runner, policy);

    let started = Instant::now();
    let report = unmounter
        .unmount(Path::new(DEST), Some(BackendKind::UserspaceBindfsLinux))
        .expect("unmount succeeds");
    let elapsed = started.elapsed();

    let expected_attempts = u32::try_from(busy + 1).expect("small count");
    assert_eq!(report.attempts, expected_attempts);
    assert_eq!(runner.call_count(), busy + 1);
    assert_eq!(runner.calls_to("fusermount"), busy + 1);
    assert!(
        elapsed >= policy.interval() * u32::try_from(busy).expect("small count"),
        "expected at least {busy} pauses, took {elapsed:?}"
    );
}

#[test]
fn exhausting_attempts_reports_final_output() {
    let locator = FakeLocator::linux_bindfs();
    let runner = ScriptedRunner::new();
    for attempt in 1..=5 {
        runner.push(ToolOutput::failed(
            1,
            format!("attempt {attempt}: Device or resource busy"),
        ));
    }
    let unmounter = RetryingUnmounter::new(&locator, &runner, fast_policy(5));

    let started = Instant::now();
    let error = unmounter
        .unmount(Path::new(DEST), None)
        .expect_err("every attempt is busy");
    let elapsed = started.elapsed();

    let BindError::UnmountFailed {
        attempts, output, ..
    } = error
    else {
        panic!("expected an unmount failure");
    };
    assert_eq!(attempts, 5);
    assert_eq!(output, "attempt 5: Device or resource busy");
    assert_eq!(runner.call_count(), 5);
    assert!(elapsed >= Duration::from_millis(40), "took {elapsed:?}");
}

#[test]
fn fatal_failure_is_not_retried() {
    let locator = FakeLocator::linux_bindfs();
    let runner = ScriptedRunner::new();
    runner.push(ToolOutput::failed(32, "umount: /mnt/view: not mounted."));
    let policy = RetryPolicy::new(5, Duration::from_secs(30));
    let unmounter = RetryingUnmounter::new(&locator, &runner, policy);

    let started = Instant::now();
    let error = unmounter
        .unmount(Path::new(DEST), Some(BackendKind::KernelBindMount))
        .expect_err("not mounted is fatal");

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(runner.call_count(), 1);
    assert_eq!(runner.calls_to("umount"), 1);
    assert!(matches!(
        error,
        BindError::UnmountFailed { attempts: 1, .. }
    ));
}

#[test]
fn busy_then_fatal_stops_at_the_fatal_attempt() {
    let locator = FakeLocator::linux_bindfs();
    let runner = ScriptedRunner::new();
    runner
        .push_busy(2)
        .push(ToolOutput::failed(1, "fusermount: entry for /mnt/view not found"));
    let unmounter = RetryingUnmounter::new(&locator, &runner, fast_policy(5));

    let error = unmounter
        .unmount(Path::new(DEST), None)
        .expect_err("third attempt is fatal");
    assert!(matches!(
        error,
        BindError::UnmountFailed { attempts: 3, .. }
    ));
    assert_eq!(runner.call_count(), 3);
}

#[test]
fn missing_tools_fail_without_attempts() {
    let locator = FakeLocator::new();
    let runner = ScriptedRunner::new();
    let unmounter = RetryingUnmounter::new(&locator, &runner, fast_policy(5));

    let error = unmounter
        .unmount(Path::new(DEST), None)
        .expect_err("no tool available");
    assert!(matches!(error, BindError::NoUnmountTool));
    assert_eq!(runner.call_count(), 0);
}

#[test]
fn falls_back_to_the_other_tool() {
    let locator = FakeLocator::new().with_tool("umount");
    let runner = ScriptedRunner::new();
    let unmounter = RetryingUnmounter::new(&locator, &runner, fast_policy(5));

    let report = unmounter
        .unmount(Path::new(DEST), Some(BackendKind::UserspaceBindfsLinux))
        .expect("umount fallback succeeds");
    assert!(report.program.ends_with("umount"));
    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls.first().map(|call| call.args.clone()), Some(vec![OsString::from(DEST)]));
}

#[test]
fn tool_start_failure_is_reported_immediately() {
    let locator = FakeLocator::linux_bindfs();
    let runner = ScriptedRunner::new();
    runner.push_io_error("permission denied");
    let unmounter = RetryingUnmounter::new(&locator, &runner, fast_policy(5));

    let error = unmounter
        .unmount(Path::new(DEST), None)
        .expect_err("start failure");
    assert!(matches!(
        error,
        BindError::UnmountFailed { attempts: 1, .. }
    ));
    assert_eq!(runner.call_count(), 1);
}
