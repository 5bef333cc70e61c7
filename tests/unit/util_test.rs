//! Tests for utility functions

use generation_gate::core::JobState;
use generation_gate::util::{now_ms, JobId, RequesterId};

#[test]
fn test_requester_id_conversions() {
    assert_eq!(RequesterId::from(42_u64), RequesterId::from("42"));
    assert_eq!(RequesterId::from(String::from("u")).to_string(), "u");
}

#[test]
fn test_job_id_display() {
    assert_eq!(JobId::from(17).to_string(), "job-17");
    assert_eq!(JobId::from(17).get(), 17);
}

#[test]
fn test_job_state_terminality() {
    assert!(!JobState::Queued.is_terminal());
    assert!(!JobState::Admitted.is_terminal());
    assert!(!JobState::Running.is_terminal());
    assert!(JobState::Completed.is_terminal());
    assert!(JobState::Failed.is_terminal());
    assert!(JobState::Cancelled.is_terminal());
    assert!(JobState::TimedOut.is_terminal());
}

#[test]
fn test_job_state_serde_names() {
    assert_eq!(
        serde_json::to_string(&JobState::TimedOut).unwrap(),
        "\"timed_out\""
    );
    assert_eq!(JobState::Running.to_string(), "running");
}

#[test]
fn test_now_ms_is_after_2020() {
    assert!(now_ms() > 1_577_836_800_000);
}
