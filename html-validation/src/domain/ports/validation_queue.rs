//! Domain port describing queue dispatch semantics for validation jobs.
use async_trait::async_trait;

use super::define_port_error;
use crate::domain::ValidationJob;

define_port_error! {
    /// Errors surfaced by the queue/dispatcher adapter.
    pub enum JobDispatchError {
        /// Queue infrastructure is unavailable.
        Unavailable { message: String } => "validation queue is unavailable: {message}",
        /// The queue is full and the job was dropped.
        Saturated { capacity: usize } =>
            "validation queue is full ({capacity} jobs pending)",
    }
}

/// Hand validation jobs to a background scheduler.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ValidationQueue: Send + Sync {
    /// Enqueue a job for background processing without waiting for it.
    async fn enqueue(&self, job: ValidationJob) -> Result<(), JobDispatchError>;
}
