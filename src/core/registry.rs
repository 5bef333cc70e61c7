//! Cancellation registry: which jobs are active for which requester.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::error::GateError;
use super::signal::CancelSignal;
use crate::util::ids::{JobId, RequesterId};

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Waiting on the per-requester or global gate.
    Queued,
    /// Both permits held, work not yet invoked.
    Admitted,
    /// Work routine is executing.
    Running,
    /// Work returned a result.
    Completed,
    /// Work returned its own error.
    Failed,
    /// Job was cancelled by its requester.
    Cancelled,
    /// Job's deadline elapsed.
    TimedOut,
}

impl JobState {
    /// Terminal states release every resource the job held.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::TimedOut
        )
    }

    /// Lowercase name used in logs and audit events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Admitted => "admitted",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct JobEntry {
    signal: CancelSignal,
    state: JobState,
}

/// Maps `(requester, job)` to the job's cancellation signal.
///
/// Entries are grouped by requester so `cancel` can only ever reach the
/// caller's own jobs. All operations take the internal lock briefly and never
/// across an await point.
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    jobs: Mutex<HashMap<RequesterId, HashMap<JobId, JobEntry>>>,
}

impl CancellationRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `signal` for `(requester, job)` in the `Queued` state.
    ///
    /// # Errors
    ///
    /// [`GateError::AlreadyRegistered`] if the key is already present.
    pub fn register(
        &self,
        requester: &RequesterId,
        job: JobId,
        signal: CancelSignal,
    ) -> Result<(), GateError> {
        let mut jobs = self.jobs.lock();
        let entries = jobs.entry(requester.clone()).or_default();
        if entries.contains_key(&job) {
            return Err(GateError::AlreadyRegistered {
                requester: requester.clone(),
                job,
            });
        }
        entries.insert(
            job,
            JobEntry {
                signal,
                state: JobState::Queued,
            },
        );
        Ok(())
    }

    /// Raise the signal of one specific job.
    ///
    /// # Errors
    ///
    /// [`GateError::JobNotFound`] if the job is not active for the requester.
    pub fn cancel_job(&self, requester: &RequesterId, job: JobId) -> Result<(), GateError> {
        let jobs = self.jobs.lock();
        let entry = jobs
            .get(requester)
            .and_then(|entries| entries.get(&job))
            .ok_or_else(|| GateError::JobNotFound {
                requester: requester.clone(),
                job,
            })?;
        entry.signal.cancel();
        Ok(())
    }

    /// Raise the signal of every active job owned by `requester`, queued or
    /// running. Returns how many jobs were signalled.
    ///
    /// # Errors
    ///
    /// [`GateError::NotFound`] if the requester has no active job.
    pub fn cancel(&self, requester: &RequesterId) -> Result<usize, GateError> {
        let jobs = self.jobs.lock();
        match jobs.get(requester) {
            Some(entries) if !entries.is_empty() => {
                for entry in entries.values() {
                    entry.signal.cancel();
                }
                Ok(entries.len())
            }
            _ => Err(GateError::NotFound(requester.clone())),
        }
    }

    /// Record a lifecycle transition. Unknown keys are ignored.
    pub fn set_state(&self, requester: &RequesterId, job: JobId, state: JobState) {
        let mut jobs = self.jobs.lock();
        if let Some(entry) = jobs
            .get_mut(requester)
            .and_then(|entries| entries.get_mut(&job))
        {
            entry.state = state;
        }
    }

    /// Remove `(requester, job)`. Safe to call more than once.
    pub fn deregister(&self, requester: &RequesterId, job: JobId) {
        let mut jobs = self.jobs.lock();
        if let Some(entries) = jobs.get_mut(requester) {
            entries.remove(&job);
            if entries.is_empty() {
                jobs.remove(requester);
            }
        }
    }

    /// Whether `(requester, job)` is currently registered.
    #[must_use]
    pub fn contains(&self, requester: &RequesterId, job: JobId) -> bool {
        self.jobs
            .lock()
            .get(requester)
            .is_some_and(|entries| entries.contains_key(&job))
    }

    /// Snapshot of the requester's active jobs, ordered by job id.
    #[must_use]
    pub fn active_jobs(&self, requester: &RequesterId) -> Vec<(JobId, JobState)> {
        let jobs = self.jobs.lock();
        let mut active: Vec<_> = jobs
            .get(requester)
            .map(|entries| entries.iter().map(|(id, e)| (*id, e.state)).collect())
            .unwrap_or_default();
        active.sort_unstable_by_key(|(id, _)| *id);
        active
    }

    /// Total number of active jobs across all requesters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.lock().values().map(HashMap::len).sum()
    }

    /// True when no job is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> RequesterId {
        RequesterId::new("alice")
    }

    #[test]
    fn register_rejects_duplicate_key() {
        let registry = CancellationRegistry::new();
        let job = JobId::from(7);
        registry.register(&alice(), job, CancelSignal::new()).unwrap();
        let err = registry
            .register(&alice(), job, CancelSignal::new())
            .unwrap_err();
        assert!(matches!(err, GateError::AlreadyRegistered { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn cancel_raises_only_own_signal() {
        let registry = CancellationRegistry::new();
        let bob = RequesterId::new("bob");
        let mine = CancelSignal::new();
        let theirs = CancelSignal::new();
        registry.register(&alice(), JobId::from(1), mine.clone()).unwrap();
        registry.register(&bob, JobId::from(2), theirs.clone()).unwrap();

        assert_eq!(registry.cancel(&alice()).unwrap(), 1);
        assert!(mine.is_cancelled());
        assert!(!theirs.is_cancelled());
    }

    #[test]
    fn cancel_without_job_is_not_found() {
        let registry = CancellationRegistry::new();
        assert_eq!(
            registry.cancel(&alice()),
            Err(GateError::NotFound(alice()))
        );
        assert!(matches!(
            registry.cancel_job(&alice(), JobId::from(3)),
            Err(GateError::JobNotFound { .. })
        ));
    }

    #[test]
    fn deregister_is_idempotent_and_prunes_requester() {
        let registry = CancellationRegistry::new();
        let job = JobId::from(11);
        registry.register(&alice(), job, CancelSignal::new()).unwrap();
        registry.deregister(&alice(), job);
        registry.deregister(&alice(), job);
        assert!(registry.is_empty());
        assert!(!registry.contains(&alice(), job));
        assert!(registry.cancel(&alice()).is_err());
    }

    #[test]
    fn tracks_state_transitions() {
        let registry = CancellationRegistry::new();
        registry.register(&alice(), JobId::from(5), CancelSignal::new()).unwrap();
        registry.register(&alice(), JobId::from(4), CancelSignal::new()).unwrap();
        registry.set_state(&alice(), JobId::from(5), JobState::Running);
        assert_eq!(
            registry.active_jobs(&alice()),
            vec![
                (JobId::from(4), JobState::Queued),
                (JobId::from(5), JobState::Running)
            ]
        );
    }
}
