//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **validator**: runs the external HTML5 checker as a child process
//! - **filesystem**: `cap_std` page store and append-only error log
//! - **queue**: Tokio channel and worker for background validation
//!
//! Adapters are thin translators between domain types and the outside world.
//! They contain no validation policy.

pub mod filesystem;
pub mod queue;
pub mod validator;
