//! Trending candidate posts for respond workflows.
//!
//! A `CandidateSource` hands back third-party posts worth engaging
//! with. Sources may hold a session (init/teardown); the engine calls
//! `init` before fetching and `teardown` unconditionally afterwards.

pub mod twitter_search;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::types::{CandidatePost, HeraldError};

#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Prepare the source for fetching. Idempotent: calling on an
    /// already-initialized source is a no-op.
    async fn init(&self) -> Result<(), HeraldError>;

    /// Tear the source down. Idempotent and infallible; safe to call
    /// whether or not `init` succeeded.
    async fn teardown(&self);

    /// Fetch up to `limit` trending posts matching any of the queries.
    async fn fetch_trending(
        &self,
        queries: &[String],
        limit: usize,
    ) -> Result<Vec<CandidatePost>, HeraldError>;
}

/// Merge results across queries: dedup by post id, rank by author
/// follower count descending, keep the top `limit`.
pub fn dedup_and_rank(posts: Vec<CandidatePost>, limit: usize) -> Vec<CandidatePost> {
    let mut by_id: HashMap<String, CandidatePost> = HashMap::new();
    for post in posts {
        by_id.entry(post.id.clone()).or_insert(post);
    }

    let mut ranked: Vec<CandidatePost> = by_id.into_values().collect();
    ranked.sort_by(|a, b| b.follower_count.cmp(&a.follower_count));
    ranked.truncate(limit);
    ranked
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
