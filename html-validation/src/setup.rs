//! Wiring from [`HtmlValidationSettings`] to a ready middleware.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::config::HtmlValidationSettings;
use crate::domain::ports::HtmlValidator;
use crate::domain::{ReportLayout, ResponseValidationPorts, ResponseValidationService};
use crate::middleware::HtmlValidation;
use crate::outbound::filesystem::{CapStdPageStore, ErrorLogFile};
use crate::outbound::queue::{TokioValidationQueue, ValidationWorker};
use crate::outbound::validator::ProcessHtmlValidator;

/// Errors raised while building the validation stack.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The report directories could not be created.
    #[error("failed to create report directory {path}: {source}")]
    Prepare {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The error log could not be opened.
    #[error("failed to open error log {path}: {source}")]
    ErrorLog {
        /// Log location.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The page directory could not be opened.
    #[error("failed to open page directory {path}: {source}")]
    PageStore {
        /// Directory location.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Background mode was requested outside a Tokio runtime.
    #[error("background validation requires a running Tokio runtime")]
    NoRuntime,
}

/// Middleware plus the resources it depends on.
#[derive(Debug)]
pub struct HtmlValidationStack {
    /// Middleware to pass to `App::wrap`.
    pub middleware: HtmlValidation,
    /// Background worker, present in background mode.
    pub worker: Option<ValidationWorker>,
    /// Where reports are written.
    pub layout: ReportLayout,
}

/// Build the middleware described by `settings` using the process validator.
///
/// # Errors
///
/// Returns [`SetupError`] when the report directory, page directory, or log
/// cannot be opened, or when background mode is requested without a Tokio
/// runtime.
///
/// # Examples
/// ```rust,ignore
/// let stack = build_html_validation(&settings)?;
/// let app = App::new().wrap(stack.middleware.clone());
/// ```
pub fn build_html_validation(
    settings: &HtmlValidationSettings,
) -> Result<HtmlValidationStack, SetupError> {
    let validator = ProcessHtmlValidator::new(settings.validator_command());
    build_html_validation_with(settings, Arc::new(validator))
}

/// Build the middleware described by `settings` around `validator`.
///
/// # Errors
///
/// See [`build_html_validation`].
pub fn build_html_validation_with(
    settings: &HtmlValidationSettings,
    validator: Arc<dyn HtmlValidator>,
) -> Result<HtmlValidationStack, SetupError> {
    let layout = ReportLayout::new(settings.output_dir());
    layout.prepare().map_err(|source| SetupError::Prepare {
        path: layout.html_dir().to_path_buf(),
        source,
    })?;
    let sink = ErrorLogFile::open(&layout).map_err(|source| SetupError::ErrorLog {
        path: layout.errors_file().to_path_buf(),
        source,
    })?;
    let store = CapStdPageStore::open(&layout).map_err(|source| SetupError::PageStore {
        path: layout.html_dir().to_path_buf(),
        source,
    })?;
    let service = Arc::new(ResponseValidationService::new(ResponseValidationPorts {
        store: Arc::new(store),
        validator,
        sink: Arc::new(sink),
    }));

    let (middleware, worker) = if settings.background {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(SetupError::NoRuntime);
        }
        let config = settings.queue_config();
        let (queue, worker) = TokioValidationQueue::spawn(service, config);
        info!(
            capacity = config.capacity,
            workers = config.workers,
            "background html validation enabled"
        );
        (HtmlValidation::background(Arc::new(queue)), Some(worker))
    } else {
        (HtmlValidation::inline(service), None)
    };

    info!(
        report_dir = %layout.report_dir().display(),
        mode = middleware.dispatcher().mode(),
        "html validation ready"
    );
    Ok(HtmlValidationStack {
        middleware: middleware
            .with_unique_names(settings.unique_names)
            .with_max_body_bytes(settings.max_body_bytes),
        worker,
        layout,
    })
}
