//! Error types for admission and cancellation.

use std::time::Duration;

use thiserror::Error;

use crate::util::ids::{JobId, RequesterId};

/// Errors produced by the gates and the cancellation registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// The requester has no active job to cancel.
    #[error("no active job for requester {0}")]
    NotFound(RequesterId),
    /// The specific job is not (or no longer) active for the requester.
    #[error("{job} is not active for requester {requester}")]
    JobNotFound {
        /// Requester that issued the lookup.
        requester: RequesterId,
        /// Job that was looked up.
        job: JobId,
    },
    /// A job id was registered twice; job id generation is broken.
    #[error("{job} already registered for requester {requester}")]
    AlreadyRegistered {
        /// Requester owning the duplicate entry.
        requester: RequesterId,
        /// Duplicated job id.
        job: JobId,
    },
    /// The gate was closed and no longer admits jobs.
    #[error("gate closed")]
    Closed,
    /// Configuration values are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Outcome of a submitted job that did not produce a result.
///
/// `E` is the work routine's own error type and is passed through untouched.
#[derive(Debug, Error)]
pub enum JobError<E> {
    /// The job was cancelled, either while queued or cooperatively while running.
    #[error("job cancelled")]
    Cancelled,
    /// The job's deadline elapsed and its signal was raised.
    #[error("job timed out after {0:?}")]
    TimedOut(Duration),
    /// The work routine failed.
    #[error("work failed: {0}")]
    Work(#[source] E),
    /// Admission bookkeeping failed.
    #[error(transparent)]
    Gate(#[from] GateError),
}

impl<E> JobError<E> {
    /// True for both explicit cancellation and deadline expiry.
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::TimedOut(_))
    }

    /// Return the work routine's error, if that is what this is.
    pub fn into_work_error(self) -> Option<E> {
        match self {
            Self::Work(e) => Some(e),
            _ => None,
        }
    }
}

/// Error returned by [`CancelSignal::checkpoint`](crate::core::CancelSignal::checkpoint)
/// once cancellation has been requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cancellation requested")]
pub struct Cancelled;

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
