//! Publish pipeline: rasterize every page of a document and upload the
//! results as addressable assets, then write the manifest.
//!
//! Pages are processed strictly sequentially in ascending order. That bounds
//! peak memory to one page's raster buffer and keeps the asset store from
//! seeing concurrent writes. The policy is fail-fast: the first render or
//! upload failure aborts the whole publish with no manifest write. Pages
//! already uploaded are orphaned, which is harmless: a retry overwrites
//! them at the same index-derived paths.

use std::fmt;

use chrono::Utc;
use log::info;

use crate::error::{PublishError, RasterError};
use crate::manifest::{FORMAT_TAG, MANIFEST_VERSION, Manifest};
use crate::raster::DocumentEngine;
use crate::resilience::{CancelFlag, RetryPolicy, with_retry};
use crate::store::{AssetStore, manifest_path, page_asset_path};

/// Where the pipeline currently is, for progress display and error context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishStage {
    Opening,
    /// Rendering page `n` of `total` (1-based).
    RenderingPage(u32),
    UploadingPage(u32),
    WritingManifest,
    Done,
}

impl fmt::Display for PublishStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opening => write!(f, "opening document"),
            Self::RenderingPage(n) => write!(f, "rendering page {n}"),
            Self::UploadingPage(n) => write!(f, "uploading page {n}"),
            Self::WritingManifest => write!(f, "writing manifest"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Progress report delivered after every suspension point.
#[derive(Clone, Copy, Debug)]
pub struct PublishProgress {
    pub stage: PublishStage,
    /// Overall fraction in `[base, base + range]`.
    pub fraction: f32,
}

#[derive(Clone, Debug)]
pub struct PublishOptions {
    pub collection: String,
    /// Rasterization scale; high, since published assets are the archival
    /// rendition.
    pub scale: f32,
    /// JPEG quality (1-100).
    pub quality: u8,
    pub retry: RetryPolicy,
    /// Progress window, for callers embedding the publish in a larger flow.
    pub progress_base: f32,
    pub progress_range: f32,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            collection: "publications".to_string(),
            scale: 2.0,
            quality: 90,
            retry: RetryPolicy::default(),
            progress_base: 0.0,
            progress_range: 1.0,
        }
    }
}

pub struct Publisher<'a, S: AssetStore, E: DocumentEngine> {
    store: &'a S,
    engine: &'a E,
    opts: PublishOptions,
}

impl<'a, S: AssetStore, E: DocumentEngine> Publisher<'a, S, E> {
    #[must_use]
    pub fn new(store: &'a S, engine: &'a E, opts: PublishOptions) -> Self {
        Self {
            store,
            engine,
            opts,
        }
    }

    /// Publish `bytes` as `document_id`: N page assets plus one manifest.
    ///
    /// The document is opened fresh rather than through the shared cache;
    /// publishing is a one-shot batch operation. The manifest is uploaded
    /// last, only after every page upload succeeded.
    pub fn publish(
        &self,
        bytes: &[u8],
        document_id: &str,
        title: &str,
        cancel: &CancelFlag,
        progress: &mut dyn FnMut(PublishProgress),
    ) -> Result<Manifest, PublishError> {
        let report = |stage: PublishStage, done: u32, total: u32, progress: &mut dyn FnMut(PublishProgress)| {
            let fraction = if total == 0 {
                self.opts.progress_base
            } else {
                self.opts.progress_base
                    + (done as f32 / total as f32) * self.opts.progress_range
            };
            progress(PublishProgress { stage, fraction });
        };

        report(PublishStage::Opening, 0, 1, progress);
        let doc = self.engine.open(bytes).map_err(PublishError::Open)?;
        let total = doc.page_count();
        if total == 0 {
            return Err(PublishError::Open(RasterError::unsupported(
                "document has no pages",
            )));
        }

        let mut page_urls = Vec::with_capacity(total as usize);

        for page in 1..=total {
            self.check_cancel(cancel, PublishStage::RenderingPage(page))?;
            report(PublishStage::RenderingPage(page), page - 1, total, progress);

            let jpeg = doc
                .rasterize_page(page, self.opts.scale, self.opts.quality)
                .map_err(|source| PublishError::Render { page, source })?;

            self.check_cancel(cancel, PublishStage::UploadingPage(page))?;
            report(PublishStage::UploadingPage(page), page - 1, total, progress);

            let path = page_asset_path(&self.opts.collection, document_id, page);
            let message = format!("publish {document_id}: page {page}/{total}");
            with_retry(
                &self.opts.retry,
                "page asset upload",
                crate::error::StoreError::is_transient,
                || self.store.write(&path, &jpeg, &message),
            )
            .map_err(|source| PublishError::Upload { page, source })?;

            page_urls.push(self.store.url_for(&path));
            report(PublishStage::UploadingPage(page), page, total, progress);
        }

        self.check_cancel(cancel, PublishStage::WritingManifest)?;
        report(PublishStage::WritingManifest, total, total, progress);
        let manifest = self.write_manifest(document_id, title, page_urls)?;

        report(PublishStage::Done, total, total, progress);
        info!(
            "published {document_id}: {} pages under {}",
            manifest.total_pages, self.opts.collection
        );
        Ok(manifest)
    }

    /// Rebuild and upload only the manifest for an already-uploaded page
    /// set. Safe to retry when a publish failed at the manifest step.
    pub fn publish_manifest_only(
        &self,
        document_id: &str,
        title: &str,
        total_pages: u32,
    ) -> Result<Manifest, PublishError> {
        let page_urls = (1..=total_pages)
            .map(|page| {
                self.store
                    .url_for(&page_asset_path(&self.opts.collection, document_id, page))
            })
            .collect();
        self.write_manifest(document_id, title, page_urls)
    }

    fn write_manifest(
        &self,
        document_id: &str,
        title: &str,
        page_urls: Vec<String>,
    ) -> Result<Manifest, PublishError> {
        let manifest = Manifest {
            document_id: document_id.to_string(),
            title: title.to_string(),
            total_pages: page_urls.len() as u32,
            page_urls,
            published_at: Utc::now(),
            format: FORMAT_TAG.to_string(),
            version: MANIFEST_VERSION.to_string(),
        };

        let bytes = manifest.to_json().map_err(PublishError::Manifest)?;
        let path = manifest_path(&self.opts.collection, document_id);
        let message = format!("publish {document_id}: manifest");
        with_retry(
            &self.opts.retry,
            "manifest upload",
            crate::error::StoreError::is_transient,
            || self.store.write(&path, &bytes, &message),
        )
        .map_err(PublishError::Manifest)?;

        Ok(manifest)
    }

    fn check_cancel(&self, cancel: &CancelFlag, stage: PublishStage) -> Result<(), PublishError> {
        if cancel.is_cancelled() {
            Err(PublishError::Cancelled {
                stage: stage.to_string(),
            })
        } else {
            Ok(())
        }
    }
}
