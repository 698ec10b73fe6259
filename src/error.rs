//! Error taxonomy for the publish pipeline and reader runtime.
//!
//! Each subsystem gets its own error enum so callers can apply the right
//! policy: raster/document errors are terminal and never retried, store
//! errors split into transient (retryable) and permanent, manifest load
//! failures never propagate at all, and analytics failures only ever reach
//! the log.

use thiserror::Error;

/// Failure opening or rasterizing a document.
#[derive(Debug, Error)]
pub enum RasterError {
    /// The source bytes are not a readable paginated document.
    #[error("unsupported document: {detail}")]
    Unsupported { detail: String },

    /// Render or encode failure scoped to a single page (1-based).
    #[error("page {page}: {detail}")]
    Page { page: u32, detail: String },
}

impl RasterError {
    pub fn unsupported(detail: impl Into<String>) -> Self {
        Self::Unsupported {
            detail: detail.into(),
        }
    }

    pub fn page(page: u32, detail: impl Into<String>) -> Self {
        Self::Page {
            page,
            detail: detail.into(),
        }
    }
}

/// Failure talking to the asset store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Network trouble or a server-side hiccup; safe to retry.
    #[error("transient store failure: {detail}")]
    Transient { detail: String },

    /// The store rejected the request; retrying will not help.
    #[error("store rejected request: {detail}")]
    Permanent { detail: String },

    /// The object does not exist at the given path.
    #[error("object not found: {path}")]
    NotFound { path: String },
}

impl StoreError {
    pub fn transient(detail: impl Into<String>) -> Self {
        Self::Transient {
            detail: detail.into(),
        }
    }

    pub fn permanent(detail: impl Into<String>) -> Self {
        Self::Permanent {
            detail: detail.into(),
        }
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Whether a bounded retry with backoff is worth attempting.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Failure reading a remote document over byte-range requests.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("remote read failed: {detail}")]
    Io { detail: String },

    /// The remote object is not a document we can open.
    #[error("source is not a readable document: {detail}")]
    Unsupported { detail: String },

    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn io(detail: impl Into<String>) -> Self {
        Self::Io {
            detail: detail.into(),
        }
    }

    pub fn unsupported(detail: impl Into<String>) -> Self {
        Self::Unsupported {
            detail: detail.into(),
        }
    }

    /// Unsupported sources abort immediately; IO trouble may be retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

/// Terminal publish failure, with enough context to name the offending step.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("opening document: {0}")]
    Open(#[source] RasterError),

    #[error("rendering page {page}: {source}")]
    Render {
        page: u32,
        #[source]
        source: RasterError,
    },

    #[error("uploading page {page}: {source}")]
    Upload {
        page: u32,
        #[source]
        source: StoreError,
    },

    /// All pages exist; only the manifest write failed. Retrying just the
    /// manifest step is safe and idempotent.
    #[error("writing manifest: {0}")]
    Manifest(#[source] StoreError),

    #[error("publish cancelled during {stage}")]
    Cancelled { stage: String },
}

/// Analytics delivery failure. Always caught and logged, never surfaced.
#[derive(Debug, Error)]
#[error("analytics delivery failed: {detail}")]
pub struct AnalyticsError {
    pub detail: String,
}

impl AnalyticsError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Audio cue playback failure. Logged and ignored; never blocks navigation.
#[derive(Debug, Error)]
#[error("cue playback failed: {detail}")]
pub struct CueError {
    pub detail: String,
}

impl CueError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
