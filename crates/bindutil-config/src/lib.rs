//! Shared configuration for the `bindutil` binary.
//!
//! Settings are read from command-line flags first and the environment
//! second, falling back to the defaults in [`defaults`]. The [`Config`] type
//! is a [`clap::Args`] group so the CLI can flatten it into its parser and
//! expose every flag globally across subcommands.
//!
//! | Flag                  | Environment                  | Default   |
//! |-----------------------|------------------------------|-----------|
//! | `--log-filter`        | `BINDUTIL_LOG_FILTER`        | `warn`    |
//! | `--log-format`        | `BINDUTIL_LOG_FORMAT`        | `compact` |
//! | `--unmount-attempts`  | `BINDUTIL_UNMOUNT_ATTEMPTS`  | `5`       |
//! | `--retry-interval-ms` | `BINDUTIL_RETRY_INTERVAL_MS` | `1000`    |
//! | `--poll-interval-ms`  | `BINDUTIL_POLL_INTERVAL_MS`  | `1000`    |

use std::time::Duration;

use clap::Args;

mod defaults;
mod logging;

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RETRY_INTERVAL_MS,
    DEFAULT_UNMOUNT_ATTEMPTS, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Runtime settings shared by all `bindutil` subcommands.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Tracing filter expression (for example `debug` or `bindutil_mount=trace`).
    #[arg(
        long = "log-filter",
        global = true,
        env = "BINDUTIL_LOG_FILTER",
        default_value = DEFAULT_LOG_FILTER,
        value_name = "EXPR"
    )]
    log_filter: String,

    /// Log output format.
    #[arg(
        long = "log-format",
        global = true,
        env = "BINDUTIL_LOG_FORMAT",
        default_value_t = default_log_format(),
        value_name = "FORMAT"
    )]
    log_format: LogFormat,

    /// Maximum number of unmount attempts against a busy mountpoint.
    #[arg(
        long = "unmount-attempts",
        global = true,
        env = "BINDUTIL_UNMOUNT_ATTEMPTS",
        default_value_t = DEFAULT_UNMOUNT_ATTEMPTS,
        value_parser = clap::value_parser!(u32).range(1..),
        value_name = "N"
    )]
    unmount_attempts: u32,

    /// Pause between unmount attempts, in milliseconds.
    #[arg(
        long = "retry-interval-ms",
        global = true,
        env = "BINDUTIL_RETRY_INTERVAL_MS",
        default_value_t = DEFAULT_RETRY_INTERVAL_MS,
        value_name = "MS"
    )]
    retry_interval_ms: u64,

    /// Interval between child process polls, in milliseconds.
    #[arg(
        long = "poll-interval-ms",
        global = true,
        env = "BINDUTIL_POLL_INTERVAL_MS",
        default_value_t = DEFAULT_POLL_INTERVAL_MS,
        value_name = "MS"
    )]
    poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: default_log_format(),
            unmount_attempts: DEFAULT_UNMOUNT_ATTEMPTS,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl Config {
    /// Tracing filter expression applied to the subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Selected log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Maximum number of unmount attempts. Always at least one.
    #[must_use]
    pub const fn unmount_attempts(&self) -> u32 {
        self.unmount_attempts
    }

    /// Pause between unmount attempts.
    #[must_use]
    pub const fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Interval between child process polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
