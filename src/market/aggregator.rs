//! Multi-category market aggregation.
//!
//! For each tracked category the aggregator issues one listing query
//! (`/coins/markets`) and one summary query (`/coins/categories/{tag}`)
//! through the rate-limited client, then merges the results into a
//! single `MarketSnapshot`.
//!
//! Numeric fields the provider omits default to zero — snapshots never
//! carry nulls into the generation stage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::client::RateLimitedClient;
use super::MarketFeed;
use crate::types::{CategorySummary, HeraldError, MarketItem, MarketSnapshot};

/// How many item names to surface in each category summary.
const TOP_ITEMS_PER_CATEGORY: usize = 3;

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

/// One row of `/coins/markets`. Only the fields we use are listed.
/// The provider sends explicit nulls as well as missing keys for
/// numerics (newly listed coins have no 24h change, delisted coins no
/// market cap), so every numeric is an `Option` zeroed at conversion.
#[derive(Debug, Deserialize)]
struct ListingEntry {
    id: String,
    name: String,
    symbol: String,
    #[serde(default)]
    market_cap_rank: Option<u32>,
    #[serde(default)]
    current_price: Option<f64>,
    #[serde(default)]
    price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    total_volume: Option<f64>,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
}

/// Body of `/coins/categories/{tag}`. Same null tolerance as the
/// listing rows.
#[derive(Debug, Default, Deserialize)]
struct CategoryEntry {
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    volume_24h: Option<f64>,
    #[serde(default)]
    market_cap_change_24h: Option<f64>,
    #[serde(default)]
    volume_change_24h: Option<f64>,
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

pub struct MarketDataAggregator {
    client: RateLimitedClient,
    item_limit: u32,
}

impl MarketDataAggregator {
    pub fn new(client: RateLimitedClient, item_limit: u32) -> Self {
        Self { client, item_limit }
    }

    /// Listing query for one category, ordered by 24h volume.
    async fn fetch_listing(&self, category: &str) -> Result<Vec<ListingEntry>, HeraldError> {
        let params = [
            ("vs_currency", "usd".to_string()),
            ("category", category.to_string()),
            ("order", "volume_desc".to_string()),
            ("per_page", self.item_limit.to_string()),
            ("page", "1".to_string()),
            ("sparkline", "false".to_string()),
            ("price_change_percentage", "24h".to_string()),
        ];

        let body = self.client.request("/coins/markets", &params).await?;
        serde_json::from_value(body).map_err(|e| HeraldError::UpstreamData {
            endpoint: "/coins/markets".to_string(),
            message: e.to_string(),
        })
    }

    /// Summary query for one category. A failure here degrades to a
    /// zeroed summary rather than aborting the cycle — the listing is
    /// the load-bearing half.
    async fn fetch_summary(&self, category: &str) -> CategoryEntry {
        let endpoint = format!("/coins/categories/{}", urlencoding::encode(category));
        let params = [("vs_currency", "usd".to_string())];

        match self.client.request(&endpoint, &params).await {
            Ok(body) => serde_json::from_value(body).unwrap_or_else(|e| {
                warn!(category, error = %e, "Unparsable category summary, using zeros");
                CategoryEntry::default()
            }),
            Err(e) => {
                warn!(category, error = %e, "Category summary fetch failed, using zeros");
                CategoryEntry::default()
            }
        }
    }

    fn to_item(entry: ListingEntry, category: &str) -> MarketItem {
        MarketItem {
            id: entry.id,
            name: entry.name,
            symbol: entry.symbol.to_uppercase(),
            category: category.to_string(),
            rank: entry.market_cap_rank.unwrap_or(0),
            price: entry.current_price.unwrap_or(0.0),
            change_24h: entry.price_change_percentage_24h.unwrap_or(0.0),
            volume_24h: entry.total_volume.unwrap_or(0.0),
            market_cap: entry.market_cap.unwrap_or(0.0),
            last_updated: entry.last_updated,
        }
    }

    /// Merge per-category results into one snapshot.
    ///
    /// Categories with an empty listing are skipped entirely, so the
    /// summary key set always covers the categories present among the
    /// items. Errors with `NoData` if nothing survives.
    fn build_snapshot(
        per_category: Vec<(String, Vec<ListingEntry>, CategoryEntry)>,
    ) -> Result<MarketSnapshot, HeraldError> {
        let requested: Vec<String> = per_category.iter().map(|(c, _, _)| c.clone()).collect();

        let mut items = Vec::new();
        let mut summaries = std::collections::HashMap::new();

        for (category, listing, summary) in per_category {
            if listing.is_empty() {
                debug!(category, "Empty listing, category skipped");
                continue;
            }

            let top_items: Vec<String> = listing
                .iter()
                .take(TOP_ITEMS_PER_CATEGORY)
                .map(|e| e.name.clone())
                .collect();

            summaries.insert(
                category.clone(),
                CategorySummary {
                    category: category.clone(),
                    market_cap: summary.market_cap.unwrap_or(0.0),
                    volume_24h: summary.volume_24h.unwrap_or(0.0),
                    market_cap_change_24h: summary.market_cap_change_24h.unwrap_or(0.0),
                    volume_change_24h: summary.volume_change_24h.unwrap_or(0.0),
                    top_items,
                },
            );

            items.extend(listing.into_iter().map(|e| Self::to_item(e, &category)));
        }

        if items.is_empty() {
            return Err(HeraldError::NoData(requested.join(",")));
        }

        Ok(MarketSnapshot {
            items,
            summaries,
            fetched_at: Utc::now(),
        })
    }
}

#[async_trait]
impl MarketFeed for MarketDataAggregator {
    async fn fetch_snapshot(&self, categories: &[String]) -> Result<MarketSnapshot, HeraldError> {
        info!(categories = ?categories, "Aggregating market snapshot");

        let mut per_category = Vec::with_capacity(categories.len());
        for category in categories {
            let listing = self.fetch_listing(category).await?;
            let summary = if listing.is_empty() {
                CategoryEntry::default()
            } else {
                self.fetch_summary(category).await
            };
            debug!(category, items = listing.len(), "Category fetched");
            per_category.push((category.clone(), listing, summary));
        }

        let snapshot = Self::build_snapshot(per_category)?;
        info!(
            items = snapshot.items.len(),
            categories = snapshot.summaries.len(),
            "Snapshot complete"
        );
        Ok(snapshot)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
