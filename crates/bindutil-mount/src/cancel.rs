//! Cooperative cancellation driven by SIGINT.
//!
//! The signal handler installed by [`InterruptHandler`] only stores `true`
//! into an atomic flag. It performs no I/O and no cleanup; the supervisor
//! observes the flag on its next poll and does the teardown on its own
//! thread.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::SigId;
use signal_hook::consts::signal::SIGINT;
use tracing::debug;

use crate::error::BindError;

const CANCEL_TARGET: &str = "bindutil_mount::cancel";

/// Shared flag requesting that the supervised child be stopped.
///
/// Clones observe the same flag. Once set it stays set.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates an unset token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Requests cancellation; the programmatic equivalent of SIGINT.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

/// Routes SIGINT into a [`CancellationToken`] while alive.
///
/// Dropping the handler unregisters it. SIGINT then regains whatever
/// disposition other registrations give it.
#[derive(Debug)]
pub struct InterruptHandler {
    id: SigId,
}

impl InterruptHandler {
    /// Registers a SIGINT handler that sets `token`.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::InterruptHandler`] when registration fails.
    pub fn install(token: &CancellationToken) -> Result<Self, BindError> {
        let id = signal_hook::flag::register(SIGINT, Arc::clone(&token.flag)).map_err(
            |source: io::Error| BindError::InterruptHandler {
                source: Arc::new(source),
            },
        )?;
        debug!(target: CANCEL_TARGET, "interrupt handler installed");
        Ok(Self { id })
    }
}

impl Drop for InterruptHandler {
    fn drop(&mut self) {
        let _ = signal_hook::low_level::unregister(self.id);
    }
}
