//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Ports describe how the domain expects to interact with driven adapters
//! (the validator process, the filesystem, the job queue). Each trait exposes
//! strongly typed errors so adapters map their failures into predictable
//! variants.

mod macros;
pub(crate) use macros::define_port_error;

mod diagnostics_sink;
mod html_validator;
mod page_store;
mod validation_queue;

#[cfg(test)]
pub use diagnostics_sink::MockDiagnosticsSink;
pub use diagnostics_sink::{DiagnosticsSink, DiagnosticsSinkError};
#[cfg(test)]
pub use html_validator::MockHtmlValidator;
pub use html_validator::{HtmlValidator, HtmlValidatorError};
#[cfg(test)]
pub use page_store::MockPageStore;
pub use page_store::{PageStore, PageStoreError};
#[cfg(test)]
pub use validation_queue::MockValidationQueue;
pub use validation_queue::{JobDispatchError, ValidationQueue};
