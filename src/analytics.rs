//! Reading analytics: per-page dwell time and session duration, delivered
//! best-effort to the backend data service.
//!
//! Delivery failures are caught and logged, never surfaced, and never block
//! navigation or closing. The session summary is guarded against the
//! explicit-close and unload paths both firing for one session.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use log::{debug, warn};
use rand::Rng as _;
use serde::Serialize;

use crate::error::AnalyticsError;

/// Pages viewed for less than this emit no page-read event.
pub const MIN_DWELL: Duration = Duration::from_millis(2000);

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReadEvent {
    pub document_id: String,
    pub page_number: u32,
    pub dwell_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummaryEvent {
    pub document_id: String,
    pub session_id: String,
    pub duration_ms: u64,
    pub pages_read: u32,
    pub completed: bool,
}

/// Backend data service boundary. Fire-and-forget: callers log failures and
/// move on; nothing is retried or deduplicated here.
pub trait AnalyticsSink {
    fn record_page_read(&self, event: &PageReadEvent) -> Result<(), AnalyticsError>;

    fn record_session_summary(&self, event: &SessionSummaryEvent) -> Result<(), AnalyticsError>;

    /// Best-effort delivery that must be able to complete even while the
    /// hosting context tears down. The default just records synchronously;
    /// network sinks override with a detached send.
    fn send_beacon(&self, event: &SessionSummaryEvent) {
        if let Err(e) = self.record_session_summary(event) {
            warn!("session summary beacon failed: {e}");
        }
    }
}

fn new_session_id() -> String {
    format!("{:032x}", rand::thread_rng().r#gen::<u128>())
}

/// Tracks one reading session for the lifetime of one viewer.
pub struct ReadingRecorder<'a> {
    session_id: String,
    document_id: String,
    total_pages: u32,
    started_at: Instant,
    page_entered_at: Instant,
    current_page: u32,
    pages_visited: HashSet<u32>,
    summary_sent: bool,
    sink: &'a dyn AnalyticsSink,
}

impl<'a> ReadingRecorder<'a> {
    pub fn start(document_id: impl Into<String>, total_pages: u32, sink: &'a dyn AnalyticsSink) -> Self {
        Self::start_at(document_id, total_pages, sink, Instant::now())
    }

    pub fn start_at(
        document_id: impl Into<String>,
        total_pages: u32,
        sink: &'a dyn AnalyticsSink,
        now: Instant,
    ) -> Self {
        let mut pages_visited = HashSet::new();
        pages_visited.insert(1);

        Self {
            session_id: new_session_id(),
            document_id: document_id.into(),
            total_pages,
            started_at: now,
            page_entered_at: now,
            current_page: 1,
            pages_visited,
            summary_sent: false,
            sink,
        }
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn page_changed(&mut self, page: u32) {
        self.page_changed_at(page, Instant::now());
    }

    /// Record leaving the current page for `page`. Emits a page-read event
    /// for the page being left when its dwell reached the threshold.
    pub fn page_changed_at(&mut self, page: u32, now: Instant) {
        if self.summary_sent || page == self.current_page {
            return;
        }

        let dwell = now.saturating_duration_since(self.page_entered_at);
        if dwell >= MIN_DWELL {
            let event = PageReadEvent {
                document_id: self.document_id.clone(),
                page_number: self.current_page,
                dwell_ms: dwell.as_millis() as u64,
            };
            if let Err(e) = self.sink.record_page_read(&event) {
                warn!("page-read event dropped: {e}");
            }
        } else {
            debug!(
                "page {} dwell {}ms below threshold, not recorded",
                self.current_page,
                dwell.as_millis()
            );
        }

        self.current_page = page;
        self.page_entered_at = now;
        self.pages_visited.insert(page);
    }

    pub fn end_session(&mut self) {
        self.end_session_at(Instant::now());
    }

    /// Submit the session summary via the beacon path. Idempotent: the
    /// explicit-close and unload paths may both call this, only the first
    /// submits.
    pub fn end_session_at(&mut self, now: Instant) {
        if self.summary_sent {
            debug!("session {} summary already sent", self.session_id);
            return;
        }
        self.summary_sent = true;

        let duration = now.saturating_duration_since(self.started_at);
        let event = SessionSummaryEvent {
            document_id: self.document_id.clone(),
            session_id: self.session_id.clone(),
            duration_ms: duration.as_millis() as u64,
            pages_read: self.pages_visited.len() as u32,
            completed: self.total_pages > 0
                && self.pages_visited.len() as u32 >= self.total_pages,
        };
        self.sink.send_beacon(&event);
    }
}

/// HTTP sink posting events to the backend data service.
pub struct HttpAnalyticsSink {
    agent: ureq::Agent,
    endpoint: String,
    timeout: Duration,
}

impl HttpAnalyticsSink {
    #[must_use]
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn post(&self, path: &str, body: impl Serialize) -> Result<(), AnalyticsError> {
        let url = format!("{}/{path}", self.endpoint);
        self.agent
            .post(&url)
            .send_json(body)
            .map_err(|e| AnalyticsError::new(e.to_string()))?;
        Ok(())
    }
}

impl AnalyticsSink for HttpAnalyticsSink {
    fn record_page_read(&self, event: &PageReadEvent) -> Result<(), AnalyticsError> {
        self.post("page-reads", event)
    }

    fn record_session_summary(&self, event: &SessionSummaryEvent) -> Result<(), AnalyticsError> {
        self.post("session-summaries", event)
    }

    /// Detached send on its own thread with its own short-lived agent, so
    /// delivery can complete while the host tears down. Never joined.
    fn send_beacon(&self, event: &SessionSummaryEvent) {
        let url = format!("{}/session-summaries", self.endpoint);
        let body = event.clone();
        let timeout = self.timeout;

        std::thread::spawn(move || {
            let agent = ureq::AgentBuilder::new().timeout(timeout).build();
            if let Err(e) = agent.post(&url).send_json(&body) {
                warn!("session summary beacon failed: {e}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingSink;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn short_dwell_emits_no_event() {
        let sink = RecordingSink::new();
        let t0 = Instant::now();
        let mut recorder = ReadingRecorder::start_at("doc", 10, &sink, t0);

        recorder.page_changed_at(2, t0 + ms(1500));
        assert!(sink.page_reads().is_empty());
    }

    #[test]
    fn qualifying_dwell_emits_exactly_one_event() {
        let sink = RecordingSink::new();
        let t0 = Instant::now();
        let mut recorder = ReadingRecorder::start_at("doc", 10, &sink, t0);

        recorder.page_changed_at(2, t0 + ms(2500));

        let events = sink.page_reads();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].page_number, 1);
        assert_eq!(events[0].dwell_ms, 2500);
    }

    #[test]
    fn dwell_clock_resets_on_each_page() {
        let sink = RecordingSink::new();
        let t0 = Instant::now();
        let mut recorder = ReadingRecorder::start_at("doc", 10, &sink, t0);

        recorder.page_changed_at(2, t0 + ms(2100)); // page 1 read
        recorder.page_changed_at(3, t0 + ms(3000)); // page 2: 900ms, dropped
        recorder.page_changed_at(4, t0 + ms(5200)); // page 3: 2200ms, read

        let events = sink.page_reads();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].page_number, 1);
        assert_eq!(events[1].page_number, 3);
        assert_eq!(events[1].dwell_ms, 2200);
    }

    #[test]
    fn sink_failure_never_propagates() {
        let sink = RecordingSink::new().failing();
        let t0 = Instant::now();
        let mut recorder = ReadingRecorder::start_at("doc", 10, &sink, t0);

        recorder.page_changed_at(2, t0 + ms(3000));
        recorder.end_session_at(t0 + ms(4000));
        // Nothing recorded, nothing panicked.
        assert!(sink.page_reads().is_empty());
    }

    #[test]
    fn session_summary_fires_once() {
        let sink = RecordingSink::new();
        let t0 = Instant::now();
        let mut recorder = ReadingRecorder::start_at("doc", 3, &sink, t0);

        recorder.end_session_at(t0 + ms(60_000));
        // Unload handler fires after the explicit close.
        recorder.end_session_at(t0 + ms(60_050));

        let summaries = sink.summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].duration_ms, 60_000);
    }

    #[test]
    fn summary_reports_completion() {
        let sink = RecordingSink::new();
        let t0 = Instant::now();
        let mut recorder = ReadingRecorder::start_at("doc", 3, &sink, t0);

        recorder.page_changed_at(2, t0 + ms(100));
        recorder.page_changed_at(3, t0 + ms(200));
        recorder.end_session_at(t0 + ms(300));

        let summaries = sink.summaries();
        assert_eq!(summaries[0].pages_read, 3);
        assert!(summaries[0].completed);
    }

    #[test]
    fn incomplete_session_is_not_completed() {
        let sink = RecordingSink::new();
        let t0 = Instant::now();
        let mut recorder = ReadingRecorder::start_at("doc", 12, &sink, t0);

        recorder.page_changed_at(2, t0 + ms(100));
        recorder.end_session_at(t0 + ms(200));

        let summaries = sink.summaries();
        assert_eq!(summaries[0].pages_read, 2);
        assert!(!summaries[0].completed);
    }

    #[test]
    fn page_changes_after_session_end_are_ignored() {
        let sink = RecordingSink::new();
        let t0 = Instant::now();
        let mut recorder = ReadingRecorder::start_at("doc", 5, &sink, t0);

        recorder.end_session_at(t0 + ms(100));
        recorder.page_changed_at(2, t0 + ms(10_000));
        assert!(sink.page_reads().is_empty());
    }

    #[test]
    fn session_ids_are_unique() {
        let sink = RecordingSink::new();
        let a = ReadingRecorder::start("doc", 1, &sink);
        let b = ReadingRecorder::start("doc", 1, &sink);
        assert_ne!(a.session_id(), b.session_id());
        assert_eq!(a.session_id().len(), 32);
    }
}
