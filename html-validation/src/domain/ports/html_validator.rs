//! Port for the external HTML5 conformance checker.

use std::path::Path;

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::ValidationReport;

define_port_error! {
    /// Errors raised by validator adapters.
    pub enum HtmlValidatorError {
        /// The validator could not be started.
        Spawn { message: String } => "html validator could not be started: {message}",
        /// The validator did not finish in time.
        Timeout { millis: u64 } => "html validator timed out after {millis}ms",
        /// The validator ran but did not produce a usable report.
        Failed { message: String } => "html validator failed: {message}",
    }
}

/// Validate a page stored on disk and report its errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HtmlValidator: Send + Sync {
    /// Run the validator against `page` and collect its diagnostics.
    async fn validate(&self, page: &Path) -> Result<ValidationReport, HtmlValidatorError>;
}
