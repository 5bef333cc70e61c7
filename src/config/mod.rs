//! Configuration for the job coordinator.

pub mod coordinator;

pub use coordinator::CoordinatorConfig;
