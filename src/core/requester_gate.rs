//! Per-requester admission gates, created lazily on first use.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Semaphore;

use super::error::GateError;
use super::gate::{acquire_or_cancel, GatePermit, GateScope};
use super::signal::CancelSignal;
use crate::util::ids::RequesterId;

/// One counting gate per requester, each with the same capacity.
///
/// The map only grows; the requester population is bounded by real users.
#[derive(Debug)]
pub struct RequesterGates {
    capacity: usize,
    gates: Mutex<HashMap<RequesterId, Arc<Semaphore>>>,
}

impl RequesterGates {
    /// Create the gate set with `capacity` permits per requester.
    ///
    /// # Errors
    ///
    /// [`GateError::InvalidConfig`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, GateError> {
        if capacity == 0 {
            return Err(GateError::InvalidConfig(
                "per-requester capacity must be greater than 0".into(),
            ));
        }
        Ok(Self {
            capacity,
            gates: Mutex::new(HashMap::new()),
        })
    }

    /// Look up the requester's gate, creating it if this is their first job.
    /// Concurrent callers for the same requester always get the same gate.
    #[must_use]
    pub fn gate_for(&self, requester: &RequesterId) -> Arc<Semaphore> {
        let mut gates = self.gates.lock();
        if let Some(gate) = gates.get(requester) {
            return Arc::clone(gate);
        }
        tracing::debug!(requester = %requester, capacity = self.capacity, "creating requester gate");
        let gate = Arc::new(Semaphore::new(self.capacity));
        gates.insert(requester.clone(), Arc::clone(&gate));
        gate
    }

    /// Wait for one of the requester's permits.
    ///
    /// # Errors
    ///
    /// [`GateError::Closed`] once the gates have been closed.
    pub async fn acquire(&self, requester: &RequesterId) -> Result<GatePermit, GateError> {
        let permit = self
            .gate_for(requester)
            .acquire_owned()
            .await
            .map_err(|_| GateError::Closed)?;
        Ok(GatePermit::new(
            permit,
            GateScope::Requester(requester.clone()),
        ))
    }

    /// Wait for one of the requester's permits unless `signal` is raised
    /// first. `Ok(None)` means the wait was abandoned.
    ///
    /// # Errors
    ///
    /// [`GateError::Closed`] once the gates have been closed.
    pub async fn acquire_or_cancel(
        &self,
        requester: &RequesterId,
        signal: &CancelSignal,
    ) -> Result<Option<GatePermit>, GateError> {
        let gate = self.gate_for(requester);
        acquire_or_cancel(gate, GateScope::Requester(requester.clone()), signal).await
    }

    /// Configured per-requester capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free permits for `requester`; full capacity if they have never submitted.
    #[must_use]
    pub fn available(&self, requester: &RequesterId) -> usize {
        self.gates
            .lock()
            .get(requester)
            .map_or(self.capacity, |gate| gate.available_permits())
    }

    /// Number of requesters that have a gate.
    #[must_use]
    pub fn tracked_requesters(&self) -> usize {
        self.gates.lock().len()
    }

    /// Close every existing gate. Requesters first seen afterwards still get
    /// a fresh gate, so the global gate must be closed as well to stop admission.
    pub fn close(&self) {
        for gate in self.gates.lock().values() {
            gate.close();
        }
    }
}
