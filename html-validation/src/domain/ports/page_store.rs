//! Port for persisting response pages awaiting validation.

use std::path::PathBuf;

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::PageSlug;

define_port_error! {
    /// Errors raised by page store adapters.
    pub enum PageStoreError {
        /// The page could not be written.
        Write { path: PathBuf, message: String } =>
            "failed to write page {path:?}: {message}",
        /// The page could not be removed.
        Remove { path: PathBuf, message: String } =>
            "failed to remove page {path:?}: {message}",
    }
}

/// Store response bodies under their slug so the validator can read them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Write `body` as `<slug>.html`, replacing any earlier page, and return
    /// the path handed to the validator.
    async fn save(&self, slug: &PageSlug, body: &[u8]) -> Result<PathBuf, PageStoreError>;

    /// Delete the page stored for `slug`. A missing page is not an error.
    async fn discard(&self, slug: &PageSlug) -> Result<(), PageStoreError>;
}
