//! Tests for configuration validation

use std::collections::HashMap;
use std::time::Duration;

use generation_gate::config::coordinator::{
    ENV_GLOBAL_CAPACITY, ENV_JOB_TIMEOUT_SECS, ENV_PER_REQUESTER_CAPACITY,
};
use generation_gate::config::CoordinatorConfig;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn test_default_config_is_single_slot() {
    let config = CoordinatorConfig::default();
    assert_eq!(config.global_capacity, 1);
    assert_eq!(config.per_requester_capacity, 1);
    assert_eq!(config.job_timeout(), None);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_invalid_global_capacity() {
    let invalid = CoordinatorConfig {
        global_capacity: 0,
        ..CoordinatorConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_invalid_per_requester_capacity() {
    let invalid = CoordinatorConfig {
        per_requester_capacity: 0,
        ..CoordinatorConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_invalid_timeout() {
    let invalid = CoordinatorConfig {
        job_timeout_secs: Some(0),
        ..CoordinatorConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "global_capacity": 2,
        "per_requester_capacity": 1,
        "job_timeout_secs": 300
    }"#;

    let config = CoordinatorConfig::from_json_str(json).unwrap();
    assert_eq!(config.global_capacity, 2);
    assert_eq!(config.job_timeout(), Some(Duration::from_secs(300)));
    assert_eq!(config.audit_buffer, 256);
}

#[test]
fn test_config_from_json_rejects_zero() {
    assert!(CoordinatorConfig::from_json_str(r#"{ "global_capacity": 0 }"#).is_err());
    assert!(CoordinatorConfig::from_json_str("not json").is_err());
}

#[test]
fn test_config_from_lookup() {
    let config = CoordinatorConfig::from_lookup(lookup(&[
        (ENV_GLOBAL_CAPACITY, "5"),
        (ENV_PER_REQUESTER_CAPACITY, " 3 "),
        (ENV_JOB_TIMEOUT_SECS, "120"),
    ]))
    .unwrap();
    assert_eq!(config.global_capacity, 5);
    assert_eq!(config.per_requester_capacity, 3);
    assert_eq!(config.job_timeout_secs, Some(120));
}

#[test]
fn test_config_from_lookup_defaults_when_unset() {
    let config = CoordinatorConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(config, CoordinatorConfig::default());
}

#[test]
fn test_config_from_lookup_rejects_garbage() {
    let err = CoordinatorConfig::from_lookup(lookup(&[(ENV_GLOBAL_CAPACITY, "lots")]))
        .unwrap_err();
    assert!(err.to_string().contains(ENV_GLOBAL_CAPACITY));

    assert!(CoordinatorConfig::from_lookup(lookup(&[(ENV_GLOBAL_CAPACITY, "0")])).is_err());
}
