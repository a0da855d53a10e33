//! End-to-end workflow tests against mock components.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use coin_herald::content::generator::{ContentGenerator, FALLBACK_RESPONSE};
use coin_herald::engine::Orchestrator;
use coin_herald::types::{PostOutcome, RespondMode, RespondOutcome};

use crate::mocks::*;

fn orchestrator(
    feed: Arc<MockFeed>,
    backend: MockBackend,
    enricher: Arc<MockEnricher>,
    platform: Arc<MockPlatform>,
    source: Arc<MockSource>,
    enrichment_enabled: bool,
) -> Orchestrator {
    Orchestrator::new(
        feed,
        ContentGenerator::new(Box::new(backend), 260, 8),
        enricher,
        platform,
        source,
        vec!["gaming".into()],
        vec!["GameFi".into()],
        enrichment_enabled,
        5,
    )
}

// ---------------------------------------------------------------------------
// generate-and-publish
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_post_workflow_publishes_with_artifact() {
    let enricher = Arc::new(MockEnricher::producing());
    let platform = Arc::new(MockPlatform::working());
    let engine = orchestrator(
        Arc::new(MockFeed::with_snapshot(sample_snapshot())),
        MockBackend::replying("GameFi volume is surging today 🎮 #GameFi"),
        Arc::clone(&enricher),
        Arc::clone(&platform),
        Arc::new(MockSource::with_candidates(vec![])),
        true,
    );

    let outcome = engine.run_post_workflow(false).await;
    match outcome {
        PostOutcome::Published {
            artifact_attached, ..
        } => assert!(artifact_attached),
        other => panic!("expected published outcome, got {other:?}"),
    }

    let records = platform.records();
    assert_eq!(records.len(), 1);
    assert!(matches!(
        &records[0],
        PublishedRecord::Post { with_artifact: true, .. }
    ));

    // The produced artifact was released exactly once.
    assert_eq!(enricher.produce_calls.load(Ordering::SeqCst), 1);
    assert_eq!(enricher.released.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_enrichment_failure_does_not_abort() {
    let enricher = Arc::new(MockEnricher::failing());
    let platform = Arc::new(MockPlatform::working());
    let engine = orchestrator(
        Arc::new(MockFeed::with_snapshot(sample_snapshot())),
        MockBackend::replying("Pixels leading the gaming board"),
        Arc::clone(&enricher),
        Arc::clone(&platform),
        Arc::new(MockSource::with_candidates(vec![])),
        true,
    );

    let outcome = engine.run_post_workflow(false).await;
    match outcome {
        PostOutcome::Published {
            artifact_attached, ..
        } => assert!(!artifact_attached),
        other => panic!("expected published outcome, got {other:?}"),
    }

    let records = platform.records();
    assert!(matches!(
        &records[0],
        PublishedRecord::Post { with_artifact: false, .. }
    ));
}

#[tokio::test]
async fn test_enrichment_skipped_unless_enabled_or_forced() {
    let enricher = Arc::new(MockEnricher::producing());
    let engine = orchestrator(
        Arc::new(MockFeed::with_snapshot(sample_snapshot())),
        MockBackend::replying("quiet day"),
        Arc::clone(&enricher),
        Arc::new(MockPlatform::working()),
        Arc::new(MockSource::with_candidates(vec![])),
        false,
    );

    engine.run_post_workflow(false).await;
    assert_eq!(enricher.produce_calls.load(Ordering::SeqCst), 0);

    engine.run_post_workflow(true).await;
    assert_eq!(enricher.produce_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_no_data_aborts_before_generation() {
    let backend = MockBackend::replying("should never run");
    let backend_calls = backend.call_counter();
    let platform = Arc::new(MockPlatform::working());
    let engine = orchestrator(
        Arc::new(MockFeed::empty()),
        backend,
        Arc::new(MockEnricher::producing()),
        Arc::clone(&platform),
        Arc::new(MockSource::with_candidates(vec![])),
        true,
    );

    let outcome = engine.run_post_workflow(false).await;
    match outcome {
        PostOutcome::Aborted { reason } => assert_eq!(reason, "no data"),
        other => panic!("expected aborted outcome, got {other:?}"),
    }

    // The generation backend was never consulted and nothing published.
    assert_eq!(backend_calls.load(Ordering::SeqCst), 0);
    assert!(platform.records().is_empty());
}

#[tokio::test]
async fn test_long_generation_published_within_platform_ceiling() {
    let long_post = "🎮 GameFi update ".repeat(30); // well past 280 chars
    let platform = Arc::new(MockPlatform::working());
    let engine = orchestrator(
        Arc::new(MockFeed::with_snapshot(sample_snapshot())),
        MockBackend::replying(&long_post),
        Arc::new(MockEnricher::failing()),
        Arc::clone(&platform),
        Arc::new(MockSource::with_candidates(vec![])),
        false,
    );

    let outcome = engine.run_post_workflow(false).await;
    assert!(outcome.is_published());

    let records = platform.records();
    let PublishedRecord::Post { text, .. } = &records[0] else {
        panic!("expected a post record");
    };
    assert!(text.chars().count() <= 280);
    assert!(text.ends_with("..."));
}

#[tokio::test]
async fn test_missing_post_id_is_publish_failure() {
    let enricher = Arc::new(MockEnricher::producing());
    let engine = orchestrator(
        Arc::new(MockFeed::with_snapshot(sample_snapshot())),
        MockBackend::replying("a fine post"),
        Arc::clone(&enricher),
        Arc::new(MockPlatform::swallowing_ids()),
        Arc::new(MockSource::with_candidates(vec![])),
        true,
    );

    let outcome = engine.run_post_workflow(false).await;
    match outcome {
        PostOutcome::Aborted { reason } => assert!(reason.starts_with("publish failed")),
        other => panic!("expected aborted outcome, got {other:?}"),
    }

    // Cleanup still happened on the abort path.
    assert_eq!(enricher.released.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_platform_error_aborts_and_releases_artifact() {
    let enricher = Arc::new(MockEnricher::producing());
    let engine = orchestrator(
        Arc::new(MockFeed::with_snapshot(sample_snapshot())),
        MockBackend::replying("a fine post"),
        Arc::clone(&enricher),
        Arc::new(MockPlatform::failing()),
        Arc::new(MockSource::with_candidates(vec![])),
        true,
    );

    let outcome = engine.run_post_workflow(false).await;
    assert!(!outcome.is_published());
    assert_eq!(enricher.released.lock().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// select-and-respond
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_respond_workflow_quotes_selected_candidate() {
    let source = Arc::new(MockSource::with_candidates(sample_candidates(3)));
    let platform = Arc::new(MockPlatform::working());
    let engine = orchestrator(
        Arc::new(MockFeed::empty()),
        MockBackend::replying(r#"{"selected_index": 1, "response": "Great insight on P2E!"}"#),
        Arc::new(MockEnricher::failing()),
        Arc::clone(&platform),
        Arc::clone(&source),
        false,
    );

    let outcome = engine.run_respond_workflow(RespondMode::Quote, None).await;
    match &outcome {
        RespondOutcome::Published {
            candidate,
            response,
            ..
        } => {
            assert_eq!(candidate.id, "tweet-1");
            assert_eq!(response, "Great insight on P2E!");
        }
        other => panic!("expected published outcome, got {other:?}"),
    }

    let records = platform.records();
    assert_eq!(
        records[0],
        PublishedRecord::Quote {
            target_id: "tweet-1".into(),
            text: "Great insight on P2E!".into(),
        }
    );

    // Session lifecycle: one init, one teardown.
    assert_eq!(source.init_calls.load(Ordering::SeqCst), 1);
    assert_eq!(source.teardown_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_respond_workflow_reply_mode_uses_reply_call() {
    let platform = Arc::new(MockPlatform::working());
    let engine = orchestrator(
        Arc::new(MockFeed::empty()),
        MockBackend::replying(r#"{"selected_index": 0, "response": "Agreed!"}"#),
        Arc::new(MockEnricher::failing()),
        Arc::clone(&platform),
        Arc::new(MockSource::with_candidates(sample_candidates(2))),
        false,
    );

    let outcome = engine.run_respond_workflow(RespondMode::Reply, None).await;
    assert!(outcome.is_published());
    assert!(matches!(
        &platform.records()[0],
        PublishedRecord::Reply { target_id, .. } if target_id == "tweet-0"
    ));
}

#[tokio::test]
async fn test_unparsable_selection_falls_back_to_random_candidate() {
    let candidates = sample_candidates(3);
    let ids: Vec<String> = candidates.iter().map(|c| c.id.clone()).collect();
    let platform = Arc::new(MockPlatform::working());
    let engine = orchestrator(
        Arc::new(MockFeed::empty()),
        MockBackend::replying("hmm, I like the second one best"),
        Arc::new(MockEnricher::failing()),
        Arc::clone(&platform),
        Arc::new(MockSource::with_candidates(candidates)),
        false,
    );

    let outcome = engine.run_respond_workflow(RespondMode::Quote, None).await;
    match &outcome {
        RespondOutcome::Published {
            candidate,
            response,
            ..
        } => {
            assert!(ids.contains(&candidate.id));
            assert_eq!(response, FALLBACK_RESPONSE);
        }
        other => panic!("expected published outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn test_no_candidates_aborts_with_teardown() {
    let source = Arc::new(MockSource::with_candidates(vec![]));
    let backend = MockBackend::replying("unused");
    let backend_calls = backend.call_counter();
    let engine = orchestrator(
        Arc::new(MockFeed::empty()),
        backend,
        Arc::new(MockEnricher::failing()),
        Arc::new(MockPlatform::working()),
        Arc::clone(&source),
        false,
    );

    let outcome = engine.run_respond_workflow(RespondMode::Reply, None).await;
    match outcome {
        RespondOutcome::Aborted { reason } => assert_eq!(reason, "no candidates"),
        other => panic!("expected aborted outcome, got {other:?}"),
    }

    assert_eq!(backend_calls.load(Ordering::SeqCst), 0);
    assert_eq!(source.teardown_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_fetch_failure_still_tears_down() {
    let source = Arc::new(MockSource::failing_fetch());
    let engine = orchestrator(
        Arc::new(MockFeed::empty()),
        MockBackend::replying("unused"),
        Arc::new(MockEnricher::failing()),
        Arc::new(MockPlatform::working()),
        Arc::clone(&source),
        false,
    );

    let outcome = engine.run_respond_workflow(RespondMode::Quote, None).await;
    assert!(!outcome.is_published());
    assert_eq!(source.init_calls.load(Ordering::SeqCst), 1);
    assert_eq!(source.teardown_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_init_failure_aborts_without_fetch() {
    let source = Arc::new(MockSource::failing_init());
    let engine = orchestrator(
        Arc::new(MockFeed::empty()),
        MockBackend::replying("unused"),
        Arc::new(MockEnricher::failing()),
        Arc::new(MockPlatform::working()),
        Arc::clone(&source),
        false,
    );

    let outcome = engine.run_respond_workflow(RespondMode::Quote, None).await;
    assert!(!outcome.is_published());
    assert_eq!(source.fetch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_respond_limit_bounds_candidate_list() {
    let source = Arc::new(MockSource::with_candidates(sample_candidates(5)));
    let engine = orchestrator(
        Arc::new(MockFeed::empty()),
        MockBackend::replying(r#"{"selected_index": 0, "response": "nice"}"#),
        Arc::new(MockEnricher::failing()),
        Arc::new(MockPlatform::working()),
        Arc::clone(&source),
        false,
    );

    let outcome = engine.run_respond_workflow(RespondMode::Reply, Some(2)).await;
    match outcome {
        RespondOutcome::Published { candidate, .. } => {
            // Index 0 of the truncated list is still the first candidate.
            assert_eq!(candidate.id, "tweet-0");
        }
        other => panic!("expected published outcome, got {other:?}"),
    }
}
