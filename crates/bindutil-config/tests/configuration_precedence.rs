//! Precedence tests for `bindutil` configuration: flags beat environment
//! variables, which beat built-in defaults.

use std::sync::{Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use bindutil_config::{
    Config, DEFAULT_LOG_FILTER, DEFAULT_UNMOUNT_ATTEMPTS, LogFormat, default_log_format,
};
use clap::Parser;
use rstest::rstest;

#[derive(Parser, Debug)]
struct Harness {
    #[command(flatten)]
    config: Config,
}

static ENV_MUTEX: OnceLock<Mutex<()>> = OnceLock::new();

fn lock_env() -> MutexGuard<'static, ()> {
    ENV_MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Sets an environment variable for the lifetime of the guard.
struct EnvOverride {
    key: &'static str,
    previous: Option<std::ffi::OsString>,
}

impl EnvOverride {
    fn set(key: &'static str, value: &str) -> Self {
        let previous = std::env::var_os(key);
        // Environment mutation is serialised through `lock_env`.
        unsafe { std::env::set_var(key, value) };
        Self { key, previous }
    }
}

impl Drop for EnvOverride {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(value) => unsafe { std::env::set_var(self.key, value) },
            None => unsafe { std::env::remove_var(self.key) },
        }
    }
}

fn parse(args: &[&str]) -> Result<Config, clap::Error> {
    let argv = std::iter::once("bindutil").chain(args.iter().copied());
    Harness::try_parse_from(argv).map(|harness| harness.config)
}

#[test]
fn defaults_apply_without_flags_or_environment() {
    let _guard = lock_env();
    let config = parse(&[]).expect("empty argv should parse");

    assert_eq!(config, Config::default());
    assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
    assert_eq!(config.log_format(), default_log_format());
    assert_eq!(default_log_format(), LogFormat::Compact);
    assert_eq!(config.unmount_attempts(), DEFAULT_UNMOUNT_ATTEMPTS);
    assert_eq!(config.retry_interval(), Duration::from_secs(1));
    assert_eq!(config.poll_interval(), Duration::from_secs(1));
}

#[test]
fn environment_overrides_defaults() {
    let _guard = lock_env();
    let _attempts = EnvOverride::set("BINDUTIL_UNMOUNT_ATTEMPTS", "3");
    let _format = EnvOverride::set("BINDUTIL_LOG_FORMAT", "json");

    let config = parse(&[]).expect("environment should parse");
    assert_eq!(config.unmount_attempts(), 3);
    assert_eq!(config.log_format(), LogFormat::Json);
}

#[test]
fn flags_override_environment() {
    let _guard = lock_env();
    let _interval = EnvOverride::set("BINDUTIL_RETRY_INTERVAL_MS", "250");

    let config = parse(&["--retry-interval-ms", "10"]).expect("flag should parse");
    assert_eq!(config.retry_interval(), Duration::from_millis(10));
}

#[rstest]
#[case::zero_attempts(&["--unmount-attempts", "0"])]
#[case::unknown_format(&["--log-format", "yaml"])]
#[case::negative_interval(&["--poll-interval-ms", "-5"])]
fn invalid_values_are_rejected(#[case] args: &[&str]) {
    let _guard = lock_env();
    assert!(parse(args).is_err(), "expected {args:?} to be rejected");
}

#[rstest]
#[case("json", LogFormat::Json)]
#[case("COMPACT", LogFormat::Compact)]
fn log_format_parses_case_insensitively(#[case] raw: &str, #[case] expected: LogFormat) {
    let parsed: LogFormat = raw.parse().expect("format should parse");
    assert_eq!(parsed, expected);
}
