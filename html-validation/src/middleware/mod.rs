//! Response middleware.
//!
//! Purpose: Capture outgoing HTML responses and hand them to the validation
//! dispatcher without changing what the client receives.

pub mod html_validation;

pub use html_validation::{HtmlValidation, HtmlValidationMiddleware};
