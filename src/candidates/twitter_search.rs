//! Twitter/X v2 recent-search candidate source.
//!
//! Each configured query runs through `GET /2/tweets/search/recent`
//! with author expansion so candidates carry follower counts. Retweets
//! are excluded at the query level.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{dedup_and_rank, CandidateSource};
use crate::types::{CandidatePost, HeraldError};

const SEARCH_URL: &str = "https://api.twitter.com/2/tweets/search/recent";

/// Per-query result cap asked of the API before cross-query merging.
const PER_QUERY_RESULTS: usize = 10;

// ---------------------------------------------------------------------------
// API types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<TweetEntry>,
    #[serde(default)]
    includes: Includes,
}

#[derive(Debug, Deserialize)]
struct TweetEntry {
    id: String,
    text: String,
    author_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<UserEntry>,
}

#[derive(Debug, Deserialize)]
struct UserEntry {
    id: String,
    name: String,
    username: String,
    #[serde(default)]
    verified: bool,
    #[serde(default)]
    public_metrics: PublicMetrics,
}

#[derive(Debug, Default, Deserialize)]
struct PublicMetrics {
    #[serde(default)]
    followers_count: u64,
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

pub struct TwitterSearchSource {
    http: Client,
    bearer_token: String,
    ready: AtomicBool,
}

impl TwitterSearchSource {
    pub fn new(bearer_token: String) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build search HTTP client: {e}"))?;

        Ok(Self {
            http,
            bearer_token,
            ready: AtomicBool::new(false),
        })
    }

    async fn search(&self, query: &str) -> Result<Vec<CandidatePost>, HeraldError> {
        let full_query = format!("{query} -is:retweet lang:en");
        let params = [
            ("query", full_query),
            ("max_results", PER_QUERY_RESULTS.to_string()),
            ("expansions", "author_id".to_string()),
            ("tweet.fields", "author_id".to_string()),
            ("user.fields", "public_metrics,verified".to_string()),
        ];

        let resp = self
            .http
            .get(SEARCH_URL)
            .bearer_auth(&self.bearer_token)
            .query(&params)
            .send()
            .await
            .map_err(|e| HeraldError::Upstream {
                endpoint: "/2/tweets/search/recent".to_string(),
                message: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(HeraldError::Upstream {
                endpoint: "/2/tweets/search/recent".to_string(),
                message: format!("HTTP {status}: {body}"),
            });
        }

        let body: SearchResponse = resp.json().await.map_err(|e| HeraldError::UpstreamData {
            endpoint: "/2/tweets/search/recent".to_string(),
            message: e.to_string(),
        })?;

        Ok(assemble_candidates(body, query))
    }
}

/// Join tweets with their expanded authors. Tweets whose author is
/// missing from the expansion are dropped.
fn assemble_candidates(body: SearchResponse, query: &str) -> Vec<CandidatePost> {
    let users: HashMap<&str, &UserEntry> = body
        .includes
        .users
        .iter()
        .map(|u| (u.id.as_str(), u))
        .collect();

    body.data
        .iter()
        .filter_map(|tweet| {
            let user = users.get(tweet.author_id.as_str())?;
            Some(CandidatePost {
                id: tweet.id.clone(),
                text: tweet.text.clone(),
                author_id: tweet.author_id.clone(),
                author_name: user.name.clone(),
                author_handle: user.username.clone(),
                follower_count: user.public_metrics.followers_count,
                verified: user.verified,
                matched_query: query.to_string(),
            })
        })
        .collect()
}

#[async_trait]
impl CandidateSource for TwitterSearchSource {
    async fn init(&self) -> Result<(), HeraldError> {
        if self.ready.swap(true, Ordering::SeqCst) {
            debug!("Candidate source already initialized");
            return Ok(());
        }
        if self.bearer_token.is_empty() {
            self.ready.store(false, Ordering::SeqCst);
            return Err(HeraldError::Upstream {
                endpoint: "/2/tweets/search/recent".to_string(),
                message: "empty bearer token".to_string(),
            });
        }
        info!("Candidate source initialized");
        Ok(())
    }

    async fn teardown(&self) {
        self.ready.store(false, Ordering::SeqCst);
        debug!("Candidate source torn down");
    }

    async fn fetch_trending(
        &self,
        queries: &[String],
        limit: usize,
    ) -> Result<Vec<CandidatePost>, HeraldError> {
        let mut all = Vec::new();
        for query in queries {
            match self.search(query).await {
                Ok(mut posts) => {
                    debug!(query, hits = posts.len(), "Query complete");
                    all.append(&mut posts);
                }
                // One failing query does not sink the fetch.
                Err(e) => warn!(query, error = %e, "Candidate query failed, skipping"),
            }
        }

        let ranked = dedup_and_rank(all, limit);
        info!(candidates = ranked.len(), "Trending candidates assembled");
        Ok(ranked)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
