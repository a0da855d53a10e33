//! Mock components for integration testing.
//!
//! Deterministic implementations of every trait seam the orchestrator
//! depends on. All state is in-memory and inspectable from test code;
//! failure modes are switchable per instance.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use coin_herald::candidates::CandidateSource;
use coin_herald::enrich::{Artifact, EnrichmentStage};
use coin_herald::market::MarketFeed;
use coin_herald::publish::{PublishLimits, SocialPlatform};
use coin_herald::types::{
    CandidatePost, CategorySummary, GeneratedContent, HeraldError, MarketItem, MarketSnapshot,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn sample_snapshot() -> MarketSnapshot {
    let items = vec![
        MarketItem {
            id: "pixl".into(),
            name: "Pixels".into(),
            symbol: "PIXL".into(),
            category: "gaming".into(),
            rank: 120,
            price: 0.17,
            change_24h: 14.2,
            volume_24h: 52_000_000.0,
            market_cap: 130_000_000.0,
            last_updated: Some(Utc::now()),
        },
        MarketItem {
            id: "axs".into(),
            name: "Axie Infinity".into(),
            symbol: "AXS".into(),
            category: "gaming".into(),
            rank: 80,
            price: 6.45,
            change_24h: -2.1,
            volume_24h: 41_000_000.0,
            market_cap: 980_000_000.0,
            last_updated: Some(Utc::now()),
        },
    ];
    let mut summaries = HashMap::new();
    summaries.insert(
        "gaming".to_string(),
        CategorySummary {
            category: "gaming".into(),
            market_cap: 18_000_000_000.0,
            volume_24h: 900_000_000.0,
            market_cap_change_24h: 3.4,
            volume_change_24h: 1.1,
            top_items: vec!["Pixels".into(), "Axie Infinity".into()],
        },
    );
    MarketSnapshot {
        items,
        summaries,
        fetched_at: Utc::now(),
    }
}

pub fn sample_candidates(n: usize) -> Vec<CandidatePost> {
    (0..n)
        .map(|i| CandidatePost {
            id: format!("tweet-{i}"),
            text: format!("Hot take #{i} on play-to-earn economies"),
            author_id: format!("user-{i}"),
            author_name: format!("Gamer {i}"),
            author_handle: format!("gamer{i}"),
            follower_count: 10_000 * (n - i) as u64,
            verified: i == 0,
            matched_query: "GameFi".into(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Market feed
// ---------------------------------------------------------------------------

pub struct MockFeed {
    snapshot: Option<MarketSnapshot>,
    pub calls: AtomicUsize,
}

impl MockFeed {
    pub fn with_snapshot(snapshot: MarketSnapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
            calls: AtomicUsize::new(0),
        }
    }

    /// A feed whose every category comes back empty.
    pub fn empty() -> Self {
        Self {
            snapshot: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MarketFeed for MockFeed {
    async fn fetch_snapshot(&self, categories: &[String]) -> Result<MarketSnapshot, HeraldError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.snapshot {
            Some(snapshot) => Ok(snapshot.clone()),
            None => Err(HeraldError::NoData(categories.join(","))),
        }
    }
}

// ---------------------------------------------------------------------------
// Completion backend
// ---------------------------------------------------------------------------

pub struct MockBackend {
    reply: String,
    fail: bool,
    calls: std::sync::Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            fail: false,
            calls: std::sync::Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: String::new(),
            fail: true,
            calls: std::sync::Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared call counter, usable after the backend is boxed away.
    pub fn call_counter(&self) -> std::sync::Arc<AtomicUsize> {
        std::sync::Arc::clone(&self.calls)
    }
}

#[async_trait]
impl coin_herald::content::CompletionBackend for MockBackend {
    async fn complete(&self, _prompt: &str) -> Result<String, HeraldError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(HeraldError::Generation("mock outage".into()));
        }
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// Enrichment stage
// ---------------------------------------------------------------------------

pub struct MockEnricher {
    produce_artifact: bool,
    pub produce_calls: AtomicUsize,
    /// Paths passed to `release` with a live artifact.
    pub released: Mutex<Vec<PathBuf>>,
    /// Count of `release(None)` calls.
    pub released_none: AtomicUsize,
}

impl MockEnricher {
    pub fn producing() -> Self {
        Self {
            produce_artifact: true,
            produce_calls: AtomicUsize::new(0),
            released: Mutex::new(Vec::new()),
            released_none: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            produce_artifact: false,
            produce_calls: AtomicUsize::new(0),
            released: Mutex::new(Vec::new()),
            released_none: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EnrichmentStage for MockEnricher {
    async fn produce(&self, _content: &GeneratedContent) -> Option<Artifact> {
        let n = self.produce_calls.fetch_add(1, Ordering::SeqCst);
        if self.produce_artifact {
            Some(Artifact {
                path: PathBuf::from(format!("/tmp/mock-artifact-{n}.png")),
            })
        } else {
            None
        }
    }

    async fn release(&self, artifact: Option<&Artifact>) {
        match artifact {
            Some(artifact) => self
                .released
                .lock()
                .unwrap()
                .push(artifact.path.clone()),
            None => {
                self.released_none.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Social platform
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum PublishedRecord {
    Post { text: String, with_artifact: bool },
    Quote { target_id: String, text: String },
    Reply { target_id: String, text: String },
}

pub struct MockPlatform {
    limits: PublishLimits,
    /// If true, calls succeed but return no post id.
    swallow_ids: bool,
    fail: bool,
    pub published: Mutex<Vec<PublishedRecord>>,
    next_id: AtomicUsize,
}

impl MockPlatform {
    pub fn working() -> Self {
        Self {
            limits: PublishLimits::default(),
            swallow_ids: false,
            fail: false,
            published: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
        }
    }

    pub fn swallowing_ids() -> Self {
        Self {
            swallow_ids: true,
            ..Self::working()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::working()
        }
    }

    fn record(&self, record: PublishedRecord) -> Result<Option<String>, HeraldError> {
        if self.fail {
            return Err(HeraldError::Publish("mock platform down".into()));
        }
        self.published.lock().unwrap().push(record);
        if self.swallow_ids {
            return Ok(None);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(Some(format!("post-{id}")))
    }

    pub fn records(&self) -> Vec<PublishedRecord> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl SocialPlatform for MockPlatform {
    async fn publish(
        &self,
        text: &str,
        artifact: Option<&Artifact>,
    ) -> Result<Option<String>, HeraldError> {
        self.record(PublishedRecord::Post {
            text: self.limits.normalize_post(text),
            with_artifact: artifact.is_some(),
        })
    }

    async fn publish_quoted(
        &self,
        target_id: &str,
        text: &str,
    ) -> Result<Option<String>, HeraldError> {
        self.record(PublishedRecord::Quote {
            target_id: target_id.to_string(),
            text: self.limits.normalize_quote(text),
        })
    }

    async fn publish_reply(
        &self,
        target_id: &str,
        text: &str,
    ) -> Result<Option<String>, HeraldError> {
        self.record(PublishedRecord::Reply {
            target_id: target_id.to_string(),
            text: self.limits.normalize_reply(text),
        })
    }
}

// ---------------------------------------------------------------------------
// Candidate source
// ---------------------------------------------------------------------------

pub struct MockSource {
    candidates: Vec<CandidatePost>,
    fail_init: bool,
    fail_fetch: bool,
    pub init_calls: AtomicUsize,
    pub teardown_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
}

impl MockSource {
    pub fn with_candidates(candidates: Vec<CandidatePost>) -> Self {
        Self {
            candidates,
            fail_init: false,
            fail_fetch: false,
            init_calls: AtomicUsize::new(0),
            teardown_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_init() -> Self {
        Self {
            fail_init: true,
            ..Self::with_candidates(Vec::new())
        }
    }

    pub fn failing_fetch() -> Self {
        Self {
            fail_fetch: true,
            ..Self::with_candidates(Vec::new())
        }
    }
}

#[async_trait]
impl CandidateSource for MockSource {
    async fn init(&self) -> Result<(), HeraldError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_init {
            return Err(HeraldError::Upstream {
                endpoint: "mock".into(),
                message: "init refused".into(),
            });
        }
        Ok(())
    }

    async fn teardown(&self) {
        self.teardown_calls.fetch_add(1, Ordering::SeqCst);
    }

    async fn fetch_trending(
        &self,
        _queries: &[String],
        limit: usize,
    ) -> Result<Vec<CandidatePost>, HeraldError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch {
            return Err(HeraldError::Upstream {
                endpoint: "mock".into(),
                message: "search down".into(),
            });
        }
        let mut out = self.candidates.clone();
        out.truncate(limit);
        Ok(out)
    }
}
