//! # Generation Gate
//!
//! Admission control and cooperative cancellation for a single scarce
//! generation resource (one GPU-bound image pipeline) shared by many chat users.
//!
//! Many request flows run concurrently, but the pipeline can only do a small,
//! fixed amount of work at once. Every unit of work goes through a
//! [`JobCoordinator`](core::JobCoordinator), which:
//!
//! - limits how many jobs run system-wide (global gate),
//! - limits how many jobs each requester has in flight (per-requester gate),
//! - registers a [`CancelSignal`](core::CancelSignal) so the requester can
//!   abort their own job, queued or running, without touching anyone else's,
//! - releases both gates and the registry entry on every exit path.
//!
//! Cancellation is cooperative: the work routine checks its signal at safe
//! points. GPU kernels cannot be interrupted safely, so the coordinator never
//! drops running work on the floor.
//!
//! ```rust,ignore
//! use generation_gate::core::{CancelSignal, JobCoordinator, JobError};
//! use generation_gate::util::RequesterId;
//!
//! let coordinator = std::sync::Arc::new(JobCoordinator::new(1, 1)?);
//! let user = RequesterId::from(42_i64);
//!
//! let image = coordinator
//!     .submit(&user, |signal: CancelSignal| async move {
//!         for step in 0..30 {
//!             signal.checkpoint()?;
//!             run_step(step).await;
//!         }
//!         Ok::<_, generation_gate::core::Cancelled>(render())
//!     })
//!     .await;
//!
//! // From another flow handling `/cancel`:
//! coordinator.cancel(&user)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Gates, cancellation registry, and the job coordinator.
pub mod core;
/// Configuration models for capacities and timeouts.
pub mod config;
/// Builders to construct a coordinator from configuration.
pub mod builders;
/// Shared utilities: identifiers, clock, telemetry.
pub mod util;
