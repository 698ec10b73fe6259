//! Manifest: the JSON descriptor listing every page-asset URL for one
//! published document.
//!
//! A manifest is only ever written after every page upload has succeeded,
//! so a readable manifest is the "publish succeeded" signal. Loading is
//! deliberately forgiving: any fetch or parse failure yields an empty page
//! list and the caller falls back to the direct read path.

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::{AssetStore, manifest_path};

/// Format tag written into every manifest this pipeline produces.
pub const FORMAT_TAG: &str = "paged-jpeg";
/// Manifest schema version.
pub const MANIFEST_VERSION: &str = "1";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub document_id: String,
    pub title: String,
    pub total_pages: u32,
    /// Index `i` corresponds to page `i + 1`.
    pub page_urls: Vec<String>,
    pub published_at: DateTime<Utc>,
    pub format: String,
    pub version: String,
}

impl Manifest {
    /// Whether the page list matches the declared page count.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.page_urls.len() == self.total_pages as usize
    }

    pub fn to_json(&self) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| StoreError::permanent(format!("manifest serialization: {e}")))
    }
}

/// Load and parse the manifest for `document_id`.
///
/// Returns `None` on any failure; the reason goes to the log, never to the
/// caller.
pub fn load_manifest(
    store: &dyn AssetStore,
    collection: &str,
    document_id: &str,
) -> Option<Manifest> {
    let path = manifest_path(collection, document_id);

    let object = match store.read(&path) {
        Ok(object) => object,
        Err(e) => {
            warn!("manifest unavailable at {path}: {e}");
            return None;
        }
    };

    match serde_json::from_slice::<Manifest>(&object.bytes) {
        Ok(manifest) => {
            if !manifest.is_consistent() {
                warn!(
                    "manifest at {path} declares {} pages but lists {}",
                    manifest.total_pages,
                    manifest.page_urls.len()
                );
            }
            Some(manifest)
        }
        Err(e) => {
            warn!("malformed manifest at {path}: {e}");
            None
        }
    }
}

/// Ordered page-URL list for `document_id`, empty on any failure.
pub fn load_page_urls(store: &dyn AssetStore, collection: &str, document_id: &str) -> Vec<String> {
    load_manifest(store, collection, document_id)
        .map(|m| m.page_urls)
        .unwrap_or_default()
}
