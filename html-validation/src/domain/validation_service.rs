//! Save, validate, and prune response pages.
//!
//! The service owns the ordering contract: a page is written before the
//! validator sees it, diagnostics are appended whether or not the page has
//! errors, and only pages with zero errors are deleted again. When the
//! validator itself fails the page is left on disk. Jobs for the same slug
//! run one at a time so a page is never overwritten while it is validated.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::page_locks::PageLocks;
use super::ports::{
    DiagnosticsSink, DiagnosticsSinkError, HtmlValidator, HtmlValidatorError, PageStore,
    PageStoreError,
};
use super::{ValidationJob, ValidationOutcome};

/// Errors returned while validating a single page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseValidationError {
    /// Saving or pruning the page failed.
    #[error(transparent)]
    Store(#[from] PageStoreError),
    /// The external validator failed.
    #[error(transparent)]
    Validator(#[from] HtmlValidatorError),
    /// Appending diagnostics failed.
    #[error(transparent)]
    Diagnostics(#[from] DiagnosticsSinkError),
}

/// Port bundle required by [`ResponseValidationService`].
pub struct ResponseValidationPorts {
    /// Where pages are written before validation.
    pub store: Arc<dyn PageStore>,
    /// External HTML5 validator.
    pub validator: Arc<dyn HtmlValidator>,
    /// Aggregate diagnostics log.
    pub sink: Arc<dyn DiagnosticsSink>,
}

/// Domain service validating one buffered response at a time.
pub struct ResponseValidationService {
    store: Arc<dyn PageStore>,
    validator: Arc<dyn HtmlValidator>,
    sink: Arc<dyn DiagnosticsSink>,
    pages: PageLocks,
}

impl ResponseValidationService {
    /// Build the service from its ports.
    #[must_use]
    pub fn new(ports: ResponseValidationPorts) -> Self {
        Self {
            store: ports.store,
            validator: ports.validator,
            sink: ports.sink,
            pages: PageLocks::default(),
        }
    }

    /// Save `job.body`, validate it, record the diagnostics, and delete the
    /// page again when it is valid.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseValidationError`] when any port fails. Failures after
    /// the page was saved leave it on disk.
    pub async fn validate(
        &self,
        job: &ValidationJob,
    ) -> Result<ValidationOutcome, ResponseValidationError> {
        let _page = self.pages.acquire(&job.slug).await;
        let page_path = self.store.save(&job.slug, &job.body).await?;
        debug!(
            job_id = %job.id,
            slug = %job.slug,
            path = %page_path.display(),
            bytes = job.body.len(),
            "page saved for validation"
        );

        let report = match self.validator.validate(&page_path).await {
            Ok(report) => report,
            Err(error) => {
                warn!(
                    %error,
                    job_id = %job.id,
                    path = %page_path.display(),
                    "validator failed; page kept"
                );
                return Err(error.into());
            }
        };

        self.sink.record(&report.diagnostics).await?;

        if report.is_clean() {
            self.store.discard(&job.slug).await?;
            debug!(job_id = %job.id, slug = %job.slug, "page is valid");
            return Ok(ValidationOutcome::Passed);
        }

        info!(
            job_id = %job.id,
            slug = %job.slug,
            error_count = report.error_count,
            path = %page_path.display(),
            "page failed validation"
        );
        Ok(ValidationOutcome::Failed {
            page_path,
            error_count: report.error_count,
        })
    }
}
