//! Asset store boundary: an HTTP object interface addressed by path.
//!
//! The store supports reading object content with its revision identifier,
//! writing/replacing content (the implementation resolves the current
//! revision when replacing), and deleting. Page assets and manifests live at
//! deterministic paths derived from the document id, so a republish
//! overwrites in place and orphaned assets from an aborted publish are
//! harmless.

pub mod http;
pub mod memory;

pub use http::HttpStore;
pub use memory::MemoryStore;

use crate::error::StoreError;

/// Object content plus the revision identifier the store assigned to it.
#[derive(Clone, Debug)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub revision: String,
}

/// External object store consumed by the publisher and the manifest loader.
pub trait AssetStore {
    /// Read object content and its current revision.
    fn read(&self, path: &str) -> Result<StoredObject, StoreError>;

    /// Write or replace object content, with a human-readable change
    /// description. Returns the new revision identifier.
    fn write(&self, path: &str, bytes: &[u8], message: &str) -> Result<String, StoreError>;

    /// Delete the object at `path`.
    fn delete(&self, path: &str, message: &str) -> Result<(), StoreError>;

    /// Publicly addressable URL for an object path.
    fn url_for(&self, path: &str) -> String;
}

/// Path of the page asset for `index` (1-based), zero-padded so pages sort
/// lexicographically in page order.
#[must_use]
pub fn page_asset_path(collection: &str, document_id: &str, index: u32) -> String {
    format!("{collection}/{document_id}/pages/page-{index:03}.jpg")
}

/// Path of the manifest describing one published document.
#[must_use]
pub fn manifest_path(collection: &str, document_id: &str) -> String {
    format!("{collection}/{document_id}/manifest.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_paths_are_zero_padded() {
        assert_eq!(
            page_asset_path("publications", "catalog-2026", 1),
            "publications/catalog-2026/pages/page-001.jpg"
        );
        assert_eq!(
            page_asset_path("publications", "catalog-2026", 42),
            "publications/catalog-2026/pages/page-042.jpg"
        );
        assert_eq!(
            page_asset_path("publications", "catalog-2026", 120),
            "publications/catalog-2026/pages/page-120.jpg"
        );
    }

    #[test]
    fn manifest_path_is_per_document() {
        assert_eq!(
            manifest_path("publications", "catalog-2026"),
            "publications/catalog-2026/manifest.json"
        );
    }

    #[test]
    fn page_paths_sort_in_page_order() {
        let mut paths: Vec<String> = (1..=12)
            .rev()
            .map(|i| page_asset_path("c", "d", i))
            .collect();
        paths.sort();
        assert!(paths[0].ends_with("page-001.jpg"));
        assert!(paths[11].ends_with("page-012.jpg"));
    }
}
