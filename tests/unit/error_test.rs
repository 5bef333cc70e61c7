//! Tests for error types

use std::time::Duration;

use generation_gate::core::{Cancelled, GateError, JobError};
use generation_gate::util::{JobId, RequesterId};

#[test]
fn test_not_found_error() {
    let err = GateError::NotFound(RequesterId::new("alice"));
    assert_eq!(format!("{}", err), "no active job for requester alice");
}

#[test]
fn test_already_registered_error() {
    let err = GateError::AlreadyRegistered {
        requester: RequesterId::new("alice"),
        job: JobId::from(9),
    };
    assert_eq!(format!("{}", err), "job-9 already registered for requester alice");
}

#[test]
fn test_invalid_config_error() {
    let err = GateError::InvalidConfig("global_capacity must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: global_capacity must be greater than 0"
    );
}

#[test]
fn test_job_error_display() {
    let cancelled: JobError<std::io::Error> = JobError::Cancelled;
    assert_eq!(format!("{}", cancelled), "job cancelled");

    let timed_out: JobError<std::io::Error> = JobError::TimedOut(Duration::from_secs(5));
    assert_eq!(format!("{}", timed_out), "job timed out after 5s");

    let work: JobError<std::io::Error> =
        JobError::Work(std::io::Error::new(std::io::ErrorKind::Other, "cuda oom"));
    assert_eq!(format!("{}", work), "work failed: cuda oom");
}

#[test]
fn test_job_error_wraps_gate_error() {
    let err: JobError<std::io::Error> = GateError::Closed.into();
    assert_eq!(format!("{}", err), "gate closed");
    assert!(!err.is_cancelled());
    assert!(JobError::<std::io::Error>::TimedOut(Duration::from_secs(1)).is_cancelled());
}

#[test]
fn test_cancelled_checkpoint_error() {
    assert_eq!(format!("{}", Cancelled), "cancellation requested");
}
