//! Per-slug locks serializing work on one saved page.
//!
//! Two jobs with the same slug share `<slug>.html`; without a lock one job's
//! save can overwrite the page another job is about to validate. Entries are
//! removed once no job holds or waits for them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::PageSlug;

#[derive(Debug, Default)]
pub(crate) struct PageLocks {
    entries: Mutex<HashMap<PageSlug, Arc<AsyncMutex<()>>>>,
}

impl PageLocks {
    /// Wait until no other job holds `slug`, then hold it until the guard
    /// drops.
    pub(crate) async fn acquire(&self, slug: &PageSlug) -> PageGuard<'_> {
        let lock = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(entries.entry(slug.clone()).or_default())
        };
        let guard = lock.lock_owned().await;
        PageGuard {
            locks: self,
            slug: slug.clone(),
            guard: Some(guard),
        }
    }

    fn release(&self, slug: &PageSlug) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries
            .get(slug)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            entries.remove(slug);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

pub(crate) struct PageGuard<'a> {
    locks: &'a PageLocks,
    slug: PageSlug,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for PageGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(&self.slug);
    }
}
