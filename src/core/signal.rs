//! Cooperative cancellation signal handed to work routines.

use tokio_util::sync::CancellationToken;

use super::error::Cancelled;

/// Shared flag a work routine polls at safe points to learn that its job
/// should stop.
///
/// Clones observe the same flag. Raising it never interrupts the work; the
/// routine decides where it is safe to bail out.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    token: CancellationToken,
}

impl CancelSignal {
    /// Create a fresh, unraised signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the signal has been raised.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolve once the signal is raised.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Safe-point check for use with `?`.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] once the signal has been raised.
    pub fn checkpoint(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}
