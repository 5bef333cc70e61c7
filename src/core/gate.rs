//! Global admission gate and the permit type shared by both gates.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::error::GateError;
use super::signal::CancelSignal;
use crate::util::ids::RequesterId;

/// Which gate a permit was taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateScope {
    /// The system-wide gate.
    Global,
    /// A single requester's gate.
    Requester(RequesterId),
}

/// One unit of gate capacity. Returned to its gate on [`release`](Self::release)
/// or on drop.
#[derive(Debug)]
pub struct GatePermit {
    permit: OwnedSemaphorePermit,
    scope: GateScope,
}

impl GatePermit {
    pub(crate) fn new(permit: OwnedSemaphorePermit, scope: GateScope) -> Self {
        Self { permit, scope }
    }

    /// Gate this permit belongs to.
    #[must_use]
    pub const fn scope(&self) -> &GateScope {
        &self.scope
    }

    /// Return the permit to its gate.
    pub fn release(self) {
        tracing::trace!(scope = ?self.scope, "permit released");
        drop(self.permit);
    }
}

/// Wait for a permit on `semaphore`, giving up if `signal` is raised first.
///
/// `Ok(None)` means the wait was abandoned and nothing was consumed.
pub(crate) async fn acquire_or_cancel(
    semaphore: Arc<Semaphore>,
    scope: GateScope,
    signal: &CancelSignal,
) -> Result<Option<GatePermit>, GateError> {
    if signal.is_cancelled() {
        return Ok(None);
    }
    tokio::select! {
        biased;
        () = signal.cancelled() => Ok(None),
        permit = semaphore.acquire_owned() => match permit {
            Ok(permit) => Ok(Some(GatePermit::new(permit, scope))),
            Err(_) => Err(GateError::Closed),
        },
    }
}

/// Counting gate bounding the number of jobs running system-wide.
#[derive(Debug, Clone)]
pub struct GlobalGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl GlobalGate {
    /// Create a gate with `capacity` permits.
    ///
    /// # Errors
    ///
    /// [`GateError::InvalidConfig`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, GateError> {
        if capacity == 0 {
            return Err(GateError::InvalidConfig(
                "global capacity must be greater than 0".into(),
            ));
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    /// Wait for a permit.
    ///
    /// # Errors
    ///
    /// [`GateError::Closed`] once the gate has been closed.
    pub async fn acquire(&self) -> Result<GatePermit, GateError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| GateError::Closed)?;
        Ok(GatePermit::new(permit, GateScope::Global))
    }

    /// Wait for a permit unless `signal` is raised first. `Ok(None)` means
    /// the wait was abandoned and nothing was consumed.
    ///
    /// # Errors
    ///
    /// [`GateError::Closed`] once the gate has been closed.
    pub async fn acquire_or_cancel(
        &self,
        signal: &CancelSignal,
    ) -> Result<Option<GatePermit>, GateError> {
        acquire_or_cancel(Arc::clone(&self.semaphore), GateScope::Global, signal).await
    }

    /// Take a permit only if one is free right now.
    #[must_use]
    pub fn try_acquire(&self) -> Option<GatePermit> {
        Arc::clone(&self.semaphore)
            .try_acquire_owned()
            .ok()
            .map(|permit| GatePermit::new(permit, GateScope::Global))
    }

    /// Configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held.
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Permits currently held.
    #[must_use]
    pub fn held(&self) -> usize {
        self.capacity.saturating_sub(self.available())
    }

    /// Stop admitting: pending and future acquisitions fail with `Closed`.
    pub fn close(&self) {
        self.semaphore.close();
    }
}
