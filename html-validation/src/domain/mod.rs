//! Domain primitives, ports, and services.
//!
//! Purpose: Define the page naming rules, the report layout, and the
//! validation workflow independently of Actix and of any concrete validator
//! or queue.
//!
//! Public surface:
//! - `PageSlug` - filesystem-safe page name derived from a request path.
//! - `ReportLayout` - report, HTML, and error log locations.
//! - `ValidationJob` / `JobId` - unit of work handed to the dispatcher.
//! - `ResponseValidationService` - save, validate, record, prune.
//! - `ValidationDispatcher` - inline or background execution.

pub mod dispatcher;
pub mod job;
mod page_locks;
pub mod page_slug;
pub mod ports;
pub mod report;
pub mod validation_service;

pub use self::dispatcher::{DispatchError, Submission, ValidationDispatcher};
pub use self::job::{JobId, ValidationJob};
pub use self::page_slug::PageSlug;
pub use self::report::{ReportLayout, ValidationOutcome, ValidationReport};
pub use self::validation_service::{
    ResponseValidationError, ResponseValidationPorts, ResponseValidationService,
};
