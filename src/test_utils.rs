//! Shared test doubles: a scriptable document engine, a document source
//! with open-counting, a recording analytics sink, and a counting cue sink.
//!
//! Kept in the library (like `store::MemoryStore`) so both unit tests and
//! integration tests can drive the pipeline without a PDF backend or a
//! network.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::analytics::{AnalyticsSink, PageReadEvent, SessionSummaryEvent};
use crate::error::{AnalyticsError, CueError, FetchError, RasterError};
use crate::range_reader::DocumentSource;
use crate::raster::{DocumentEngine, OpenDocument};
use crate::resilience::CancelFlag;
use crate::viewer::cue::{Cue, CueSink};

/// Document engine producing deterministic fake JPEG bytes.
#[derive(Clone)]
pub struct FakeEngine {
    pages: u32,
    fail_pages: HashSet<u32>,
    rendered: Arc<Mutex<Vec<u32>>>,
}

impl FakeEngine {
    #[must_use]
    pub fn with_pages(pages: u32) -> Self {
        Self {
            pages,
            fail_pages: HashSet::new(),
            rendered: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make rasterization fail for the given 1-based pages.
    #[must_use]
    pub fn failing_on(mut self, pages: &[u32]) -> Self {
        self.fail_pages.extend(pages.iter().copied());
        self
    }

    /// Pages rasterized so far, in request order.
    #[must_use]
    pub fn rendered_pages(&self) -> Vec<u32> {
        self.rendered
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl DocumentEngine for FakeEngine {
    fn open(&self, _bytes: &[u8]) -> Result<Box<dyn OpenDocument>, RasterError> {
        if self.pages == 0 {
            return Err(RasterError::unsupported("document has no pages"));
        }
        Ok(Box::new(FakeDocument {
            pages: self.pages,
            fail_pages: self.fail_pages.clone(),
            rendered: self.rendered.clone(),
        }))
    }
}

struct FakeDocument {
    pages: u32,
    fail_pages: HashSet<u32>,
    rendered: Arc<Mutex<Vec<u32>>>,
}

impl OpenDocument for FakeDocument {
    fn page_count(&self) -> u32 {
        self.pages
    }

    fn title(&self) -> Option<String> {
        Some("Fake Document".to_string())
    }

    fn cover_aspect(&self) -> Option<f32> {
        Some(0.75)
    }

    fn rasterize_page(&self, page: u32, scale: f32, quality: u8) -> Result<Vec<u8>, RasterError> {
        if page == 0 || page > self.pages {
            return Err(RasterError::page(page, "page out of range"));
        }
        if self.fail_pages.contains(&page) {
            return Err(RasterError::page(page, "scripted rasterization failure"));
        }
        self.rendered
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(page);
        Ok(format!("jpeg:{page}@{scale}x{quality}").into_bytes())
    }
}

/// Document source over a [`FakeEngine`], counting opens so tests can prove
/// the cache avoids re-opening.
pub struct FakeSource {
    engine: FakeEngine,
    opens: AtomicU32,
}

impl FakeSource {
    #[must_use]
    pub fn new(engine: FakeEngine) -> Self {
        Self {
            engine,
            opens: AtomicU32::new(0),
        }
    }

    #[must_use]
    pub fn opens(&self) -> u32 {
        self.opens.load(Ordering::Relaxed)
    }
}

impl DocumentSource for FakeSource {
    fn open(
        &self,
        _locator: &str,
        _cancel: &CancelFlag,
    ) -> Result<Box<dyn OpenDocument>, FetchError> {
        self.opens.fetch_add(1, Ordering::Relaxed);
        self.engine
            .open(&[])
            .map_err(|e| FetchError::unsupported(e.to_string()))
    }
}

/// Analytics sink recording every delivered event.
#[derive(Default)]
pub struct RecordingSink {
    page_reads: Mutex<Vec<PageReadEvent>>,
    summaries: Mutex<Vec<SessionSummaryEvent>>,
    fail: bool,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose deliveries all fail.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    #[must_use]
    pub fn page_reads(&self) -> Vec<PageReadEvent> {
        self.page_reads
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn summaries(&self) -> Vec<SessionSummaryEvent> {
        self.summaries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl AnalyticsSink for RecordingSink {
    fn record_page_read(&self, event: &PageReadEvent) -> Result<(), AnalyticsError> {
        if self.fail {
            return Err(AnalyticsError::new("scripted sink failure"));
        }
        self.page_reads
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }

    fn record_session_summary(&self, event: &SessionSummaryEvent) -> Result<(), AnalyticsError> {
        if self.fail {
            return Err(AnalyticsError::new("scripted sink failure"));
        }
        self.summaries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}

/// Cue sink counting playback attempts.
#[derive(Default)]
pub struct CountingCue {
    plays: AtomicU32,
    fail: bool,
}

impl CountingCue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose playback always fails, as when autoplay is denied.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    #[must_use]
    pub fn plays(&self) -> u32 {
        self.plays.load(Ordering::Relaxed)
    }
}

impl CueSink for CountingCue {
    fn play(&self, _cue: Cue) -> Result<(), CueError> {
        self.plays.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            return Err(CueError::new("playback denied"));
        }
        Ok(())
    }
}
