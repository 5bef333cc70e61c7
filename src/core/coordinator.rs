//! Job coordinator: the single entry point for running generation work under
//! admission control.
//!
//! Every submission goes through the same sequence:
//!
//! 1. register a fresh cancellation signal (`Queued`),
//! 2. take a permit from the requester's gate,
//! 3. take a permit from the global gate (`Admitted`),
//! 4. run the work with the signal (`Running`),
//! 5. deregister, release the global permit, release the requester permit.
//!
//! Step 5 runs on every exit path, including the caller dropping the
//! `submit` future. Gates are always taken requester-first, which keeps two
//! requesters from ever waiting on each other in a cycle.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;

use super::audit::{build_audit_event, AuditSink};
use super::error::{GateError, JobError};
use super::gate::{GatePermit, GlobalGate};
use super::registry::{CancellationRegistry, JobState};
use super::requester_gate::RequesterGates;
use super::signal::CancelSignal;
use super::work::GenerationWork;
use crate::util::ids::{JobId, RequesterId};

/// Point-in-time view of coordinator utilisation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoordinatorStats {
    /// Configured global capacity.
    pub global_capacity: usize,
    /// Global permits not currently held.
    pub global_available: usize,
    /// Configured per-requester capacity.
    pub per_requester_capacity: usize,
    /// Jobs registered (queued or running).
    pub active_jobs: usize,
    /// Work routines currently executing.
    pub running_jobs: usize,
    /// Highest number of simultaneously executing work routines seen.
    pub peak_running: usize,
    /// Requesters that have been given a gate.
    pub tracked_requesters: usize,
    /// Total jobs submitted.
    pub submitted: u64,
    /// Jobs whose work returned a result.
    pub completed: u64,
    /// Jobs whose work returned an error.
    pub failed: u64,
    /// Jobs cancelled by their requester or abandoned by the caller.
    pub cancelled: u64,
    /// Jobs stopped by their deadline.
    pub timed_out: u64,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    timed_out: AtomicU64,
    running: AtomicUsize,
    peak_running: AtomicUsize,
}

/// Arbitrates a scarce generation resource between many requesters.
///
/// Share it behind an `Arc`; all methods take `&self`.
pub struct JobCoordinator {
    global: GlobalGate,
    requesters: RequesterGates,
    registry: CancellationRegistry,
    default_timeout: Option<Duration>,
    counters: Counters,
    audit: Option<Mutex<Box<dyn AuditSink>>>,
}

impl std::fmt::Debug for JobCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobCoordinator")
            .field("global", &self.global)
            .field("requesters", &self.requesters)
            .field("registry", &self.registry)
            .field("default_timeout", &self.default_timeout)
            .field("audit", &self.audit.is_some())
            .finish_non_exhaustive()
    }
}

impl JobCoordinator {
    /// Create a coordinator with the given capacities.
    ///
    /// # Errors
    ///
    /// [`GateError::InvalidConfig`] if either capacity is zero.
    pub fn new(global_capacity: usize, per_requester_capacity: usize) -> Result<Self, GateError> {
        Ok(Self {
            global: GlobalGate::new(global_capacity)?,
            requesters: RequesterGates::new(per_requester_capacity)?,
            registry: CancellationRegistry::new(),
            default_timeout: None,
            counters: Counters::default(),
            audit: None,
        })
    }

    /// Apply `timeout` to every plain [`submit`](Self::submit).
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.audit = Some(Mutex::new(audit));
        self
    }

    /// Run `work` for `requester` once both gates admit it.
    ///
    /// Waits while the requester already has `per_requester_capacity` jobs in
    /// flight or the system has `global_capacity` jobs running. A
    /// [`cancel`](Self::cancel) issued while waiting abandons the wait.
    ///
    /// # Errors
    ///
    /// - [`JobError::Cancelled`] if the job was cancelled while queued, or the
    ///   work returned an error after its signal was raised.
    /// - [`JobError::TimedOut`] likewise when a configured default timeout fired.
    /// - [`JobError::Work`] with the routine's own error otherwise.
    /// - [`JobError::Gate`] if the gates were shut down or registration failed.
    pub async fn submit<W, T, E>(&self, requester: &RequesterId, work: W) -> Result<T, JobError<E>>
    where
        W: GenerationWork<T, E>,
    {
        self.run(requester, work, self.default_timeout).await
    }

    /// Like [`submit`](Self::submit), but raises the job's signal once
    /// `timeout` has elapsed since submission (queue time included).
    ///
    /// # Errors
    ///
    /// As for [`submit`](Self::submit); expiry is reported as
    /// [`JobError::TimedOut`].
    pub async fn submit_with_timeout<W, T, E>(
        &self,
        requester: &RequesterId,
        timeout: Duration,
        work: W,
    ) -> Result<T, JobError<E>>
    where
        W: GenerationWork<T, E>,
    {
        self.run(requester, work, Some(timeout)).await
    }

    /// Cancel every active job of `requester`, queued or running. Returns how
    /// many jobs were signalled.
    ///
    /// # Errors
    ///
    /// [`GateError::NotFound`] if the requester has nothing in flight,
    /// including when their last job finished just before this call.
    pub fn cancel(&self, requester: &RequesterId) -> Result<usize, GateError> {
        let signalled = self.registry.cancel(requester)?;
        tracing::info!(requester = %requester, jobs = signalled, "cancellation requested");
        Ok(signalled)
    }

    /// Cancel one specific job of `requester`.
    ///
    /// # Errors
    ///
    /// [`GateError::JobNotFound`] if that job is not active for the requester.
    pub fn cancel_job(&self, requester: &RequesterId, job: JobId) -> Result<(), GateError> {
        self.registry.cancel_job(requester, job)?;
        tracing::info!(requester = %requester, job = %job, "cancellation requested");
        Ok(())
    }

    /// The requester's active jobs and their states.
    #[must_use]
    pub fn active_jobs(&self, requester: &RequesterId) -> Vec<(JobId, JobState)> {
        self.registry.active_jobs(requester)
    }

    /// Whether the requester has anything queued or running.
    #[must_use]
    pub fn has_active_job(&self, requester: &RequesterId) -> bool {
        !self.registry.active_jobs(requester).is_empty()
    }

    /// Free permits on the requester's gate.
    #[must_use]
    pub fn requester_available(&self, requester: &RequesterId) -> usize {
        self.requesters.available(requester)
    }

    /// Snapshot of utilisation and outcome counters.
    #[must_use]
    pub fn stats(&self) -> CoordinatorStats {
        let c = &self.counters;
        CoordinatorStats {
            global_capacity: self.global.capacity(),
            global_available: self.global.available(),
            per_requester_capacity: self.requesters.capacity(),
            active_jobs: self.registry.len(),
            running_jobs: c.running.load(Ordering::Acquire),
            peak_running: c.peak_running.load(Ordering::Acquire),
            tracked_requesters: self.requesters.tracked_requesters(),
            submitted: c.submitted.load(Ordering::Relaxed),
            completed: c.completed.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            cancelled: c.cancelled.load(Ordering::Relaxed),
            timed_out: c.timed_out.load(Ordering::Relaxed),
        }
    }

    /// Stop admitting new work. Queued jobs fail with [`GateError::Closed`];
    /// running jobs are left to finish.
    pub fn shutdown(&self) {
        tracing::info!("shutting down admission gates");
        self.global.close();
        self.requesters.close();
    }

    async fn run<W, T, E>(
        &self,
        requester: &RequesterId,
        work: W,
        timeout: Option<Duration>,
    ) -> Result<T, JobError<E>>
    where
        W: GenerationWork<T, E>,
    {
        let job = JobId::next();
        let signal = CancelSignal::new();
        if let Err(e) = self.registry.register(requester, job, signal.clone()) {
            tracing::error!(requester = %requester, job = %job, "duplicate job registration: {}", e);
            return Err(e.into());
        }
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        self.record_audit(job, requester, JobState::Queued, None);
        tracing::debug!(requester = %requester, job = %job, "job queued");

        let mut guard = JobGuard::new(self, requester.clone(), job);
        let deadline = timeout.map(|after| Deadline::arm(after, signal.clone()));

        match self.requesters.acquire_or_cancel(requester, &signal).await {
            Ok(Some(permit)) => guard.requester_permit = Some(permit),
            Ok(None) => return Err(guard.finish_cancelled(deadline.as_ref())),
            Err(e) => return Err(guard.finish_closed(e)),
        }
        match self.global.acquire_or_cancel(&signal).await {
            Ok(Some(permit)) => guard.global_permit = Some(permit),
            Ok(None) => return Err(guard.finish_cancelled(deadline.as_ref())),
            Err(e) => return Err(guard.finish_closed(e)),
        }
        guard.transition(JobState::Admitted);
        tracing::info!(requester = %requester, job = %job, "job admitted");

        guard.transition(JobState::Running);
        guard.mark_running();
        let outcome = work.run(signal.clone()).await;

        match outcome {
            Ok(value) => {
                guard.finish(JobState::Completed, None);
                Ok(value)
            }
            Err(_) if signal.is_cancelled() => Err(guard.finish_cancelled(deadline.as_ref())),
            Err(e) => {
                guard.finish(JobState::Failed, None);
                Err(JobError::Work(e))
            }
        }
    }

    fn record_terminal(&self, job: JobId, requester: &RequesterId, state: JobState, detail: Option<String>) {
        let counter = match state {
            JobState::Completed => &self.counters.completed,
            JobState::Failed => &self.counters.failed,
            JobState::TimedOut => &self.counters.timed_out,
            _ => &self.counters.cancelled,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        match state {
            JobState::Completed => {
                tracing::info!(requester = %requester, job = %job, "job completed");
            }
            JobState::Failed => tracing::warn!(requester = %requester, job = %job, "job failed"),
            _ => tracing::info!(requester = %requester, job = %job, state = %state, "job stopped"),
        }
        self.record_audit(job, requester, state, detail);
    }

    fn record_audit(&self, job: JobId, requester: &RequesterId, state: JobState, detail: Option<String>) {
        if let Some(audit) = &self.audit {
            audit
                .lock()
                .record(build_audit_event(job, requester, state, detail));
        }
    }
}

/// Owns one job's bookkeeping and undoes it exactly once.
struct JobGuard<'a> {
    coordinator: &'a JobCoordinator,
    requester: RequesterId,
    job: JobId,
    requester_permit: Option<GatePermit>,
    global_permit: Option<GatePermit>,
    running: bool,
    finished: bool,
}

impl<'a> JobGuard<'a> {
    fn new(coordinator: &'a JobCoordinator, requester: RequesterId, job: JobId) -> Self {
        Self {
            coordinator,
            requester,
            job,
            requester_permit: None,
            global_permit: None,
            running: false,
            finished: false,
        }
    }

    fn transition(&self, state: JobState) {
        self.coordinator
            .registry
            .set_state(&self.requester, self.job, state);
        self.coordinator
            .record_audit(self.job, &self.requester, state, None);
    }

    fn mark_running(&mut self) {
        let counters = &self.coordinator.counters;
        let now = counters.running.fetch_add(1, Ordering::AcqRel) + 1;
        counters.peak_running.fetch_max(now, Ordering::AcqRel);
        self.running = true;
    }

    fn finish(&mut self, state: JobState, detail: Option<String>) {
        self.finished = true;
        self.release();
        self.coordinator
            .record_terminal(self.job, &self.requester, state, detail);
    }

    fn finish_cancelled<E>(&mut self, deadline: Option<&Deadline>) -> JobError<E> {
        match deadline {
            Some(deadline) if deadline.fired() => {
                let detail = format!("deadline of {:?} elapsed", deadline.after);
                self.finish(JobState::TimedOut, Some(detail));
                JobError::TimedOut(deadline.after)
            }
            _ => {
                self.finish(JobState::Cancelled, None);
                JobError::Cancelled
            }
        }
    }

    fn finish_closed<E>(&mut self, err: GateError) -> JobError<E> {
        self.finish(JobState::Cancelled, Some(err.to_string()));
        JobError::Gate(err)
    }

    /// Deregister, then release the global permit, then the requester permit.
    fn release(&mut self) {
        if self.running {
            self.running = false;
            self.coordinator.counters.running.fetch_sub(1, Ordering::AcqRel);
        }
        self.coordinator.registry.deregister(&self.requester, self.job);
        if let Some(permit) = self.global_permit.take() {
            permit.release();
        }
        if let Some(permit) = self.requester_permit.take() {
            permit.release();
        }
    }
}

impl Drop for JobGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(requester = %self.requester, job = %self.job, "submission dropped before completion");
            self.finish(JobState::Cancelled, Some("submission dropped".into()));
        }
    }
}

/// Timer that raises a job's signal after `after`. Aborted on drop.
struct Deadline {
    after: Duration,
    fired: Arc<AtomicBool>,
    timer: JoinHandle<()>,
}

impl Deadline {
    fn arm(after: Duration, signal: CancelSignal) -> Self {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let timer = tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(after) => {
                    flag.store(true, Ordering::Release);
                    signal.cancel();
                }
                () = signal.cancelled() => {}
            }
        });
        Self { after, fired, timer }
    }

    fn fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.timer.abort();
    }
}
