//! Single-slot document cache.
//!
//! Holds at most one open document handle, keyed by source locator, so
//! repeated partial reads against the same source skip the fetch-and-parse
//! cost. Opening a second distinct locator always evicts the first. The
//! swap/evict pair is serialized by a mutex; the lock is held across the
//! open so concurrent callers on a threaded host cannot double-open.

use std::sync::{Arc, Mutex};

use log::debug;

use crate::error::FetchError;
use crate::raster::OpenDocument;

/// An open document plus the locator it was opened from.
pub struct CachedDocument {
    pub locator: String,
    pub doc: Box<dyn OpenDocument>,
    pub page_count: u32,
}

#[derive(Default)]
pub struct DocumentCache {
    slot: Mutex<Option<Arc<CachedDocument>>>,
}

impl DocumentCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached handle if its locator matches, otherwise evict any
    /// existing handle and open a new one with `open`.
    pub fn get_or_open(
        &self,
        locator: &str,
        open: impl FnOnce() -> Result<Box<dyn OpenDocument>, FetchError>,
    ) -> Result<Arc<CachedDocument>, FetchError> {
        let mut slot = self
            .slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(cached) = slot.as_ref() {
            if cached.locator == locator {
                debug!("document cache hit for {locator}");
                return Ok(cached.clone());
            }
            debug!("evicting {} for {locator}", cached.locator);
        }

        // Evict before opening so the old handle's resources are released
        // while the replacement is being fetched.
        *slot = None;

        let doc = open()?;
        let handle = Arc::new(CachedDocument {
            locator: locator.to_string(),
            page_count: doc.page_count(),
            doc,
        });
        *slot = Some(handle.clone());
        Ok(handle)
    }

    /// Drop the cached handle, releasing its resources.
    pub fn evict(&self) {
        let mut slot = self
            .slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *slot = None;
    }

    /// Locator of the currently cached handle, if any.
    #[must_use]
    pub fn cached_locator(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .as_ref()
            .map(|c| c.locator.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeEngine;
    use crate::raster::DocumentEngine;

    fn open_fake(pages: u32) -> impl FnOnce() -> Result<Box<dyn OpenDocument>, FetchError> {
        move || {
            FakeEngine::with_pages(pages)
                .open(&[])
                .map_err(|e| FetchError::unsupported(e.to_string()))
        }
    }

    #[test]
    fn second_open_of_same_locator_hits_cache() {
        let cache = DocumentCache::new();
        let first = cache.get_or_open("https://a/doc.pdf", open_fake(5)).unwrap();
        let second = cache
            .get_or_open("https://a/doc.pdf", || {
                panic!("opener must not run on a cache hit")
            })
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.page_count, 5);
    }

    #[test]
    fn distinct_locator_evicts_previous_handle() {
        let cache = DocumentCache::new();
        cache.get_or_open("https://a/one.pdf", open_fake(3)).unwrap();
        let second = cache.get_or_open("https://a/two.pdf", open_fake(9)).unwrap();
        assert_eq!(second.page_count, 9);
        assert_eq!(cache.cached_locator().as_deref(), Some("https://a/two.pdf"));
    }

    #[test]
    fn evict_clears_the_slot() {
        let cache = DocumentCache::new();
        cache.get_or_open("https://a/doc.pdf", open_fake(2)).unwrap();
        cache.evict();
        assert!(cache.cached_locator().is_none());
    }

    #[test]
    fn failed_open_leaves_cache_empty() {
        let cache = DocumentCache::new();
        let result = cache.get_or_open("https://a/bad.pdf", || {
            Err(FetchError::unsupported("not a pdf"))
        });
        assert!(result.is_err());
        assert!(cache.cached_locator().is_none());
    }
}
