//! Builder turning a [`CoordinatorConfig`] into a ready [`JobCoordinator`].

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::CoordinatorConfig;
use crate::core::{AuditSink, GateError, InMemoryAuditSink, JobCoordinator};

/// Builds a [`JobCoordinator`] from configuration.
pub struct CoordinatorBuilder {
    config: CoordinatorConfig,
    audit: Option<Box<dyn AuditSink>>,
}

impl CoordinatorBuilder {
    /// Start from `config`.
    #[must_use]
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            config,
            audit: None,
        }
    }

    /// Configuration the coordinator will be built with.
    #[must_use]
    pub const fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Attach a custom audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Attach an [`InMemoryAuditSink`] sized by `audit_buffer` and return a
    /// handle for reading it back.
    #[must_use]
    pub fn with_memory_audit(mut self) -> (Self, Arc<Mutex<InMemoryAuditSink>>) {
        let sink = Arc::new(Mutex::new(InMemoryAuditSink::new(self.config.audit_buffer)));
        self.audit = Some(Box::new(Arc::clone(&sink)));
        (self, sink)
    }

    /// Validate the configuration and build the coordinator.
    ///
    /// # Errors
    ///
    /// [`GateError::InvalidConfig`] if the configuration is invalid.
    pub fn build(self) -> Result<JobCoordinator, GateError> {
        self.config.validate()?;
        let coordinator = JobCoordinator::new(
            self.config.global_capacity,
            self.config.per_requester_capacity,
        )?
        .with_default_timeout(self.config.job_timeout());
        tracing::info!(
            global_capacity = self.config.global_capacity,
            per_requester_capacity = self.config.per_requester_capacity,
            job_timeout_secs = ?self.config.job_timeout_secs,
            "job coordinator built"
        );
        Ok(match self.audit {
            Some(audit) => coordinator.with_audit(audit),
            None => coordinator,
        })
    }
}
