//! Market data layer.
//!
//! `client` wraps the upstream coin API with rate-limit pacing;
//! `aggregator` merges category-scoped queries into a `MarketSnapshot`.

pub mod aggregator;
pub mod client;

use async_trait::async_trait;

use crate::types::{HeraldError, MarketSnapshot};

/// Abstraction over the snapshot supplier consumed by the engine.
///
/// The production implementation is `aggregator::MarketDataAggregator`;
/// tests substitute deterministic in-memory feeds.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// Aggregate one snapshot across the given category tags.
    ///
    /// Fails with `HeraldError::NoData` when every category listing
    /// comes back empty.
    async fn fetch_snapshot(&self, categories: &[String]) -> Result<MarketSnapshot, HeraldError>;
}
