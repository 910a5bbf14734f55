//! Actix Web middleware that validates outgoing HTML responses.
//!
//! Every `text/html` response is written to `<output_dir>/html/<slug>.html`
//! and handed to an external HTML5 validator. The validator's diagnostics
//! are appended to `<output_dir>/errors.txt`. Pages with no errors are
//! deleted again, so the HTML directory only ever holds failing pages.
//! Validation can run inline or on a background job queue.

pub mod config;
pub mod domain;
pub mod middleware;
pub mod outbound;
pub mod setup;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::HtmlValidationSettings;
pub use middleware::HtmlValidation;
pub use setup::{HtmlValidationStack, SetupError, build_html_validation};
