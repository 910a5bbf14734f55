//! Route validation jobs inline or onto a background queue.

use std::sync::Arc;

use thiserror::Error;

use super::ports::{JobDispatchError, ValidationQueue};
use super::validation_service::{ResponseValidationError, ResponseValidationService};
use super::{JobId, ValidationJob, ValidationOutcome};

/// Result of handing a job to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The job ran before `submit` returned.
    Completed(ValidationOutcome),
    /// The job was accepted by the background queue.
    Queued(JobId),
}

/// Errors returned by [`ValidationDispatcher::submit`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Inline validation failed.
    #[error(transparent)]
    Validation(#[from] ResponseValidationError),
    /// The background queue refused the job.
    #[error(transparent)]
    Queue(#[from] JobDispatchError),
}

/// Decides where validation work runs.
///
/// `Inline` delays the response until the page has been validated;
/// `Background` only waits for the queue to accept the job.
#[derive(Clone)]
pub enum ValidationDispatcher {
    /// Validate within the request.
    Inline(Arc<ResponseValidationService>),
    /// Defer validation to a job queue.
    Background(Arc<dyn ValidationQueue>),
}

impl ValidationDispatcher {
    /// Run or enqueue `job` depending on the dispatch mode.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when inline validation fails or the queue
    /// refuses the job.
    pub async fn submit(&self, job: ValidationJob) -> Result<Submission, DispatchError> {
        match self {
            Self::Inline(service) => {
                let outcome = service.validate(&job).await?;
                Ok(Submission::Completed(outcome))
            }
            Self::Background(queue) => {
                let id = job.id;
                queue.enqueue(job).await?;
                Ok(Submission::Queued(id))
            }
        }
    }

    /// Short label used in logs.
    #[must_use]
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Inline(_) => "inline",
            Self::Background(_) => "background",
        }
    }
}

impl std::fmt::Debug for ValidationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ValidationDispatcher")
            .field(&self.mode())
            .finish()
    }
}
