//! Tests for audit sink

use generation_gate::core::{build_audit_event, AuditSink, InMemoryAuditSink, JobState};
use generation_gate::util::{JobId, RequesterId};

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);
    let alice = RequesterId::new("alice");

    sink.record(build_audit_event(JobId::from(1), &alice, JobState::Queued, None));
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].job, JobId::from(1));
    assert_eq!(events[0].requester, alice);
    assert_eq!(events[0].state, JobState::Queued);
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);
    let alice = RequesterId::new("alice");

    sink.record(build_audit_event(JobId::from(1), &alice, JobState::Queued, None));
    sink.record(build_audit_event(JobId::from(1), &alice, JobState::Admitted, None));
    sink.record(build_audit_event(JobId::from(1), &alice, JobState::Running, None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].state, JobState::Admitted); // First one popped
    assert_eq!(events[1].state, JobState::Running);
}

#[test]
fn test_build_audit_event() {
    let event = build_audit_event(
        JobId::from(3),
        &RequesterId::new("bob"),
        JobState::TimedOut,
        Some("deadline of 5s elapsed".to_string()),
    );

    assert_eq!(event.job, JobId::from(3));
    assert_eq!(event.requester.as_str(), "bob");
    assert_eq!(event.state, JobState::TimedOut);
    assert_eq!(event.detail.as_deref(), Some("deadline of 5s elapsed"));
    assert_eq!(event.event_id.len(), 36);
    assert!(event.created_at_ms > 0);
}

#[test]
fn test_zero_sized_sink_drops_everything() {
    let mut sink = InMemoryAuditSink::new(0);
    sink.record(build_audit_event(
        JobId::from(1),
        &RequesterId::new("alice"),
        JobState::Completed,
        None,
    ));
    assert!(sink.events().is_empty());
}
