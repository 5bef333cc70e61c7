//! Audit trail of job lifecycle transitions.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use super::registry::JobState;
use crate::util::clock::now_ms;
use crate::util::ids::{JobId, RequesterId};

/// One recorded lifecycle transition.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// Job the event belongs to.
    pub job: JobId,
    /// Requester owning the job.
    pub requester: RequesterId,
    /// State the job entered.
    pub state: JobState,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context (error text, timeout).
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// In-memory audit sink keeping the most recent `max_events` events.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Helper to build an audit event stamped with a fresh id and the current time.
#[must_use]
pub fn build_audit_event(
    job: JobId,
    requester: &RequesterId,
    state: JobState,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        event_id: Uuid::new_v4().to_string(),
        job,
        requester: requester.clone(),
        state,
        created_at_ms: now_ms(),
        detail,
    }
}

/// Lets a caller keep a handle on a sink after giving it to a coordinator.
impl<S: AuditSink> AuditSink for Arc<Mutex<S>> {
    fn record(&mut self, event: AuditEvent) {
        self.lock().record(event);
    }
}
