//! Identifier types for requesters and jobs.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Opaque identity of the user or chat a job runs on behalf of.
///
/// Only equality and hashing are meaningful; the inner string is whatever the
/// command layer uses to tell requesters apart (typically a chat user id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequesterId(String);

impl RequesterId {
    /// Create a requester id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequesterId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RequesterId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i64> for RequesterId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for RequesterId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of one in-flight job, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(u64);

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

impl JobId {
    /// Allocate the next job id from the process-wide counter.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for JobId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}
