//! Coordinator configuration: capacities, default timeout, audit buffer.

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::{AppResult, GateError};

/// Environment variable holding the global capacity.
pub const ENV_GLOBAL_CAPACITY: &str = "GENERATION_GLOBAL_CAPACITY";
/// Environment variable holding the per-requester capacity.
pub const ENV_PER_REQUESTER_CAPACITY: &str = "GENERATION_PER_REQUESTER_CAPACITY";
/// Environment variable holding the default job timeout in seconds.
pub const ENV_JOB_TIMEOUT_SECS: &str = "GENERATION_JOB_TIMEOUT_SECS";
/// Environment variable holding the audit buffer size.
pub const ENV_AUDIT_BUFFER: &str = "GENERATION_AUDIT_BUFFER";

const fn default_capacity() -> usize {
    1
}

const fn default_audit_buffer() -> usize {
    256
}

/// Coordinator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Maximum jobs running at once across all requesters.
    #[serde(default = "default_capacity")]
    pub global_capacity: usize,
    /// Maximum jobs in flight per requester.
    #[serde(default = "default_capacity")]
    pub per_requester_capacity: usize,
    /// Cancel jobs that have not finished this many seconds after submission.
    #[serde(default)]
    pub job_timeout_secs: Option<u64>,
    /// Events kept by the in-memory audit sink.
    #[serde(default = "default_audit_buffer")]
    pub audit_buffer: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            global_capacity: default_capacity(),
            per_requester_capacity: default_capacity(),
            job_timeout_secs: None,
            audit_buffer: default_audit_buffer(),
        }
    }
}

impl CoordinatorConfig {
    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// [`GateError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<(), GateError> {
        if self.global_capacity == 0 {
            return Err(GateError::InvalidConfig(
                "global_capacity must be greater than 0".into(),
            ));
        }
        if self.per_requester_capacity == 0 {
            return Err(GateError::InvalidConfig(
                "per_requester_capacity must be greater than 0".into(),
            ));
        }
        if self.job_timeout_secs == Some(0) {
            return Err(GateError::InvalidConfig(
                "job_timeout_secs must be greater than 0 when set".into(),
            ));
        }
        Ok(())
    }

    /// Default job timeout, if configured.
    #[must_use]
    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout_secs.map(Duration::from_secs)
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// [`GateError::InvalidConfig`] on malformed JSON or invalid values.
    pub fn from_json_str(input: &str) -> Result<Self, GateError> {
        let cfg: Self = serde_json::from_str(input)
            .map_err(|e| GateError::InvalidConfig(format!("parse error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the process environment, after reading a
    /// `.env` file if one is present. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Fails if a variable is set but not a number, or the result is invalid.
    pub fn from_env() -> AppResult<Self> {
        // A missing .env file is fine; the real environment still applies.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, using the same
    /// variable names as [`from_env`](Self::from_env).
    ///
    /// # Errors
    ///
    /// Fails if a value is set but not a number, or the result is invalid.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse = |key: &str| -> AppResult<Option<u64>> {
            lookup(key)
                .map(|raw| {
                    raw.trim()
                        .parse::<u64>()
                        .with_context(|| format!("{key} must be an unsigned integer, got `{raw}`"))
                })
                .transpose()
        };

        let mut cfg = Self::default();
        if let Some(v) = parse(ENV_GLOBAL_CAPACITY)? {
            cfg.global_capacity = usize::try_from(v).context(ENV_GLOBAL_CAPACITY)?;
        }
        if let Some(v) = parse(ENV_PER_REQUESTER_CAPACITY)? {
            cfg.per_requester_capacity = usize::try_from(v).context(ENV_PER_REQUESTER_CAPACITY)?;
        }
        if let Some(v) = parse(ENV_JOB_TIMEOUT_SECS)? {
            cfg.job_timeout_secs = Some(v);
        }
        if let Some(v) = parse(ENV_AUDIT_BUFFER)? {
            cfg.audit_buffer = usize::try_from(v).context(ENV_AUDIT_BUFFER)?;
        }
        cfg.validate().context("invalid coordinator configuration")?;
        Ok(cfg)
    }
}
