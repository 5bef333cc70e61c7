//! Admission gates, cancellation registry, and the job coordinator.

pub mod audit;
pub mod coordinator;
pub mod error;
pub mod gate;
pub mod registry;
pub mod requester_gate;
pub mod signal;
pub mod work;

pub use audit::{build_audit_event, AuditEvent, AuditSink, InMemoryAuditSink};
pub use coordinator::{CoordinatorStats, JobCoordinator};
pub use error::{AppResult, Cancelled, GateError, JobError};
pub use gate::{GatePermit, GateScope, GlobalGate};
pub use registry::{CancellationRegistry, JobState};
pub use requester_gate::RequesterGates;
pub use signal::CancelSignal;
pub use work::GenerationWork;
