//! Port for the aggregate validator log.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by diagnostics sink adapters.
    pub enum DiagnosticsSinkError {
        /// Appending to the log failed.
        Append { message: String } => "failed to append diagnostics: {message}",
    }
}

/// Append validator diagnostics to a shared log.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiagnosticsSink: Send + Sync {
    /// Append `lines` in order. Lines from one call are never interleaved
    /// with lines from another.
    async fn record(&self, lines: &[String]) -> Result<(), DiagnosticsSinkError>;
}
