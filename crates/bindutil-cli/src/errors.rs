//! Error types for the CLI runtime.

use bindutil_mount::BindError;
use thiserror::Error;

use crate::paths::PathError;
use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("a command to execute must be provided")]
    MissingCommand,
}
