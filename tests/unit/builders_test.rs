//! Tests for builder modules

use std::time::Duration;

use generation_gate::builders::CoordinatorBuilder;
use generation_gate::config::CoordinatorConfig;
use generation_gate::core::{CancelSignal, JobError, JobState};
use generation_gate::util::RequesterId;

#[test]
fn test_builder_keeps_config() {
    let config = CoordinatorConfig {
        global_capacity: 3,
        ..CoordinatorConfig::default()
    };
    let builder = CoordinatorBuilder::new(config.clone());
    assert_eq!(builder.config(), &config);
}

#[test]
fn test_builder_rejects_invalid_config() {
    let config = CoordinatorConfig {
        per_requester_capacity: 0,
        ..CoordinatorConfig::default()
    };
    assert!(CoordinatorBuilder::new(config).build().is_err());
}

#[tokio::test]
async fn test_builder_applies_capacities_and_audit() {
    let config = CoordinatorConfig {
        global_capacity: 2,
        per_requester_capacity: 1,
        job_timeout_secs: None,
        audit_buffer: 16,
    };
    let (builder, audit) = CoordinatorBuilder::new(config).with_memory_audit();
    let coordinator = builder.build().unwrap();

    let stats = coordinator.stats();
    assert_eq!(stats.global_capacity, 2);
    assert_eq!(stats.per_requester_capacity, 1);

    let result: Result<u8, JobError<()>> = coordinator
        .submit(&RequesterId::new("alice"), |_signal: CancelSignal| async { Ok(1) })
        .await;
    assert_eq!(result.unwrap(), 1);

    let states: Vec<JobState> = audit.lock().events().iter().map(|e| e.state).collect();
    assert_eq!(
        states,
        vec![
            JobState::Queued,
            JobState::Admitted,
            JobState::Running,
            JobState::Completed
        ]
    );
}

#[tokio::test]
async fn test_builder_applies_default_timeout() {
    let config = CoordinatorConfig {
        job_timeout_secs: Some(1),
        ..CoordinatorConfig::default()
    };
    let coordinator = CoordinatorBuilder::new(config).build().unwrap();

    let result: Result<(), JobError<()>> = coordinator
        .submit(&RequesterId::new("alice"), |signal: CancelSignal| async move {
            signal.cancelled().await;
            Err(())
        })
        .await;

    assert!(matches!(result, Err(JobError::TimedOut(d)) if d == Duration::from_secs(1)));
}
