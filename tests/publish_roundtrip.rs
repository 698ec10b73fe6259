//! End-to-end: publish a document into a store, load the manifest back,
//! and read it in the viewer with analytics attached.

use std::time::{Duration, Instant};

use flipbook::manifest::{load_manifest, load_page_urls};
use flipbook::publish::{PublishOptions, Publisher};
use flipbook::resilience::{CancelFlag, RetryPolicy};
use flipbook::store::MemoryStore;
use flipbook::test_utils::{CountingCue, FakeEngine, RecordingSink};
use flipbook::viewer::{Command, Phase, Viewer};

fn quick_opts() -> PublishOptions {
    PublishOptions {
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        },
        ..PublishOptions::default()
    }
}

#[test]
fn publish_then_read_a_full_session() {
    let store = MemoryStore::new();
    let engine = FakeEngine::with_pages(12);
    let publisher = Publisher::new(&store, &engine, quick_opts());

    let published = publisher
        .publish(b"doc", "spring-catalog", "Spring Catalog", &CancelFlag::new(), &mut |_| {})
        .unwrap();
    assert_eq!(store.len(), 13); // 12 page assets plus the manifest

    let manifest = load_manifest(&store, "publications", "spring-catalog").unwrap();
    assert!(manifest.is_consistent());
    assert_eq!(manifest.page_urls, published.page_urls);

    // Open the viewer on the manifest and read the first three pages,
    // lingering long enough on each for the dwell to count.
    let cue = CountingCue::new();
    let sink = RecordingSink::new();
    let t0 = Instant::now();
    let mut viewer = Viewer::open_at(
        &manifest.document_id,
        &manifest.title,
        manifest.page_urls.clone(),
        manifest.total_pages,
        None,
        &cue,
        &sink,
        t0,
    );
    assert_eq!(viewer.state.phase, Phase::Ready);
    assert_eq!(viewer.state.total_pages, 12);

    let mut now = t0;
    for _ in 0..2 {
        now += Duration::from_millis(2500);
        viewer.command_at(Command::FlipNext, now);
        viewer.command_at(Command::AnimationDone, now);
    }
    assert_eq!(viewer.state.current_page, 3);
    assert_eq!(cue.plays(), 2);

    now += Duration::from_secs(5);
    viewer.command_at(Command::Close, now);

    let reads = sink.page_reads();
    assert_eq!(reads.len(), 2);
    assert_eq!(reads[0].page_number, 1);
    assert_eq!(reads[1].page_number, 2);
    assert_eq!(reads[0].dwell_ms, 2500);

    let summaries = sink.summaries();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].document_id, "spring-catalog");
    assert_eq!(summaries[0].pages_read, 3);
    assert!(!summaries[0].completed);
    assert_eq!(summaries[0].duration_ms, 10_000);
}

#[test]
fn missing_manifest_opens_the_viewer_in_loading() {
    let store = MemoryStore::new();
    let urls = load_page_urls(&store, "publications", "never-published");
    assert!(urls.is_empty());

    let cue = CountingCue::new();
    let sink = RecordingSink::new();
    let mut viewer = Viewer::open("never-published", "Untitled", urls, 0, None, &cue, &sink);
    assert_eq!(viewer.state.phase, Phase::Loading);

    // Page flips are ignored until the page list resolves.
    viewer.command(Command::FlipNext);
    assert_eq!(viewer.state.current_page, 1);
    assert_eq!(cue.plays(), 0);

    let resolved = (1..=4).map(|i| format!("u/page-{i:03}.jpg")).collect();
    viewer.command(Command::PagesResolved { page_urls: resolved });
    assert_eq!(viewer.state.phase, Phase::Ready);
    assert_eq!(viewer.state.total_pages, 4);
}

#[test]
fn malformed_manifest_degrades_to_an_empty_page_list() {
    let store = MemoryStore::new();
    store.put_raw(
        "publications/broken/manifest.json",
        b"{ not json".to_vec(),
    );

    assert!(load_manifest(&store, "publications", "broken").is_none());
    assert!(load_page_urls(&store, "publications", "broken").is_empty());
}

#[test]
fn republish_after_manifest_failure_recovers() {
    let store = MemoryStore::new();
    let engine = FakeEngine::with_pages(3);
    let publisher = Publisher::new(&store, &engine, quick_opts());

    // The manifest write fails for the whole retry budget; pages are
    // uploaded but no manifest lands.
    store.fail_next_writes("publications/doc/manifest.json", 3);
    let err = publisher
        .publish(b"doc", "doc", "T", &CancelFlag::new(), &mut |_| {})
        .unwrap_err();
    assert!(matches!(err, flipbook::error::PublishError::Manifest(_)));
    assert!(load_manifest(&store, "publications", "doc").is_none());

    // The manifest-only retry reuses the already-uploaded page assets.
    let manifest = publisher.publish_manifest_only("doc", "T", 3).unwrap();
    let loaded = load_manifest(&store, "publications", "doc").unwrap();
    assert_eq!(loaded.page_urls, manifest.page_urls);
    assert_eq!(loaded.total_pages, 3);
}
