/// Default log filter expression used by the binary.
///
/// Only warnings reach stderr unless the operator asks for more, so the
/// diagnostic line printed on failure stays readable.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Number of unmount attempts made before giving up on a busy mountpoint.
pub const DEFAULT_UNMOUNT_ATTEMPTS: u32 = 5;

/// Pause between unmount attempts, in milliseconds.
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 1_000;

/// Interval at which the supervised child is polled, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Default logging format for the binary.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}

