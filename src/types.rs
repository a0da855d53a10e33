//! Shared types for the Coin Herald agent.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that market, content, and engine
//! modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

/// A single tracked coin as observed in one aggregation cycle.
/// Immutable snapshot record; created per fetch and discarded after use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketItem {
    pub id: String,
    pub name: String,
    pub symbol: String,
    /// Category tag this item was fetched under ("gaming", "ai", ...).
    pub category: String,
    pub rank: u32,
    /// Current price in USD.
    pub price: f64,
    /// 24-hour percent change.
    pub change_24h: f64,
    /// 24-hour volume in USD.
    pub volume_24h: f64,
    pub market_cap: f64,
    pub last_updated: Option<DateTime<Utc>>,
}

impl fmt::Display for MarketItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) {} | {:+.1}% | vol ${:.0}",
            self.name,
            self.symbol,
            self.price_label(),
            self.change_24h,
            self.volume_24h,
        )
    }
}

impl MarketItem {
    /// Human-readable price string. Sub-cent coins get more precision
    /// so a $0.005 token doesn't render as "$0.00".
    pub fn price_label(&self) -> String {
        if self.price < 0.01 {
            format!("${:.6}", self.price)
        } else {
            format!("${:.2}", self.price)
        }
    }
}

/// Aggregate metrics for one tracked category in one aggregation cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    pub market_cap: f64,
    pub volume_24h: f64,
    pub market_cap_change_24h: f64,
    pub volume_change_24h: f64,
    /// Names of the top items in this category, listing order.
    pub top_items: Vec<String>,
}

impl fmt::Display for CategorySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] cap ${:.0} | vol ${:.0} | {:+.1}%",
            self.category, self.market_cap, self.volume_24h, self.market_cap_change_24h,
        )
    }
}

/// A consistent, point-in-time aggregation of market items and category
/// summaries — the unit of input to content generation.
///
/// Invariant: every item's category key exists in `summaries`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Ordered item sequence (listing order within each category).
    pub items: Vec<MarketItem>,
    pub summaries: HashMap<String, CategorySummary>,
    pub fetched_at: DateTime<Utc>,
}

impl MarketSnapshot {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The first `n` items in listing order.
    pub fn top_items(&self, n: usize) -> &[MarketItem] {
        &self.items[..self.items.len().min(n)]
    }

    /// Check the snapshot invariant: the summary key set covers every
    /// category present among the items.
    pub fn summaries_cover_items(&self) -> bool {
        self.items
            .iter()
            .all(|item| self.summaries.contains_key(&item.category))
    }
}

// ---------------------------------------------------------------------------
// Candidate posts (respond workflows)
// ---------------------------------------------------------------------------

/// A third-party post eligible for a quote/reply interaction.
/// Deduplicated by `id`; presentation order is follower count descending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatePost {
    pub id: String,
    pub text: String,
    pub author_id: String,
    pub author_name: String,
    pub author_handle: String,
    pub follower_count: u64,
    pub verified: bool,
    /// The search query that surfaced this post.
    pub matched_query: String,
}

impl fmt::Display for CandidatePost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@{} ({} followers{}): {}",
            self.author_handle,
            self.follower_count,
            if self.verified { ", verified" } else { "" },
            self.text,
        )
    }
}

// ---------------------------------------------------------------------------
// Generated content
// ---------------------------------------------------------------------------

/// Hard truncation to a character ceiling with a 3-character ellipsis
/// marker. Idempotent: text already within the ceiling passes through
/// untouched, so re-normalizing is a no-op.
pub fn truncate_to(text: &str, ceiling: usize) -> String {
    if text.chars().count() <= ceiling {
        return text.to_string();
    }
    let kept: String = text.chars().take(ceiling.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Text produced by the generation stage, already normalized to the
/// generation-stage ceiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub text: String,
    /// Style hint the prompt asked for, when one was chosen.
    pub style: Option<String>,
}

impl GeneratedContent {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// How to respond to a selected candidate post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RespondMode {
    Quote,
    Reply,
}

impl RespondMode {
    /// Character ceiling asked of the generation backend for the
    /// response text. Quotes are kept short; replies get more room.
    pub fn response_ceiling(&self) -> usize {
        match self {
            RespondMode::Quote => 100,
            RespondMode::Reply => 180,
        }
    }
}

impl fmt::Display for RespondMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespondMode::Quote => write!(f, "quote"),
            RespondMode::Reply => write!(f, "reply"),
        }
    }
}

impl std::str::FromStr for RespondMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quote" | "retweet" => Ok(RespondMode::Quote),
            "reply" | "comment" => Ok(RespondMode::Reply),
            _ => Err(anyhow::anyhow!("Unknown respond mode: {s}")),
        }
    }
}

/// Outcome of candidate-based generation: which candidate was chosen
/// (by index into the input list) and the response text to publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionResult {
    pub index: usize,
    pub response: String,
}

// ---------------------------------------------------------------------------
// Workflow outcome envelopes
// ---------------------------------------------------------------------------

/// Terminal outcome of one generate-and-publish workflow invocation.
/// Callers may treat anything other than `Published` as "nothing was
/// published".
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PostOutcome {
    Published {
        post_id: String,
        artifact_attached: bool,
    },
    Aborted {
        reason: String,
    },
}

impl PostOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, PostOutcome::Published { .. })
    }
}

/// Terminal outcome of one select-and-respond workflow invocation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RespondOutcome {
    Published {
        post_id: String,
        candidate: CandidatePost,
        response: String,
    },
    Aborted {
        reason: String,
    },
}

impl RespondOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, RespondOutcome::Published { .. })
    }
}

/// Scheduler health as reported to the host.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerHealth {
    pub running: bool,
    pub job_count: usize,
    pub next_fire_time: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error taxonomy for Coin Herald.
///
/// Lower-level components raise these; the engine is the single place
/// that catches them and maps them to outcome envelopes. Recoverable
/// conditions (malformed generation output, a fallback-able selection)
/// are modeled as values, not errors.
#[derive(Debug, thiserror::Error)]
pub enum HeraldError {
    /// Transport/auth/protocol failure from an external call.
    #[error("upstream error ({endpoint}): {message}")]
    Upstream { endpoint: String, message: String },

    /// The upstream responded, but the body could not be parsed as expected.
    #[error("malformed upstream data ({endpoint}): {message}")]
    UpstreamData { endpoint: String, message: String },

    /// Every category query returned an empty listing.
    #[error("no data")]
    NoData(String),

    /// The candidate fetch succeeded but matched nothing.
    #[error("no candidates")]
    NoCandidates,

    /// Non-recoverable generation-backend failure (timeout, auth, transport).
    /// Malformed-but-received output is handled by the fallback policy and
    /// never surfaces as this variant.
    #[error("generation backend failure: {0}")]
    Generation(String),

    /// The publish call failed, or the platform accepted it but created
    /// no record.
    #[error("publish failed: {0}")]
    Publish(String),

    /// Malformed time-of-day input to the scheduler.
    #[error("invalid time of day '{0}': expected HH:MM")]
    InvalidTime(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
