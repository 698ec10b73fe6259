//! In-memory asset store, for dry-run publishing and tests.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use super::{AssetStore, StoredObject};
use crate::error::StoreError;

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    next_revision: AtomicU32,
    /// Paths whose next writes fail transiently, with a remaining-failure
    /// count. Lets tests exercise the retry and fail-fast paths.
    failures: Mutex<BTreeMap<String, u32>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly, bypassing revision bookkeeping.
    pub fn put_raw(&self, path: &str, bytes: Vec<u8>) {
        self.objects
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(
                path.to_string(),
                StoredObject {
                    bytes,
                    revision: "seeded".to_string(),
                },
            );
    }

    /// Make the next `count` writes to `path` fail with a transient error.
    pub fn fail_next_writes(&self, path: &str, count: u32) {
        self.failures
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(path.to_string(), count);
    }

    /// All stored paths, in lexicographic order.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AssetStore for MemoryStore {
    fn read(&self, path: &str) -> Result<StoredObject, StoreError> {
        self.objects
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::not_found(path))
    }

    fn write(&self, path: &str, bytes: &[u8], _message: &str) -> Result<String, StoreError> {
        {
            let mut failures = self
                .failures
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(remaining) = failures.get_mut(path) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(StoreError::transient(format!("injected failure for {path}")));
                }
            }
        }

        let revision = format!("r{}", self.next_revision.fetch_add(1, Ordering::Relaxed));
        self.objects
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(
                path.to_string(),
                StoredObject {
                    bytes: bytes.to_vec(),
                    revision: revision.clone(),
                },
            );
        Ok(revision)
    }

    fn delete(&self, path: &str, _message: &str) -> Result<(), StoreError> {
        self.objects
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(path);
        Ok(())
    }

    fn url_for(&self, path: &str) -> String {
        format!("memory://{path}")
    }
}
