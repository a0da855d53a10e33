//! Prompt construction, response validation, and the fallback policy.
//!
//! Two entry points: snapshot-based post generation and candidate-based
//! selection. Both submit exactly one completion call; a malformed
//! completion is repaired locally (truncation, fallback selection) and
//! never triggers a re-request.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{debug, warn};

use super::CompletionBackend;
use crate::types::{
    truncate_to, CandidatePost, GeneratedContent, HeraldError, MarketSnapshot, RespondMode,
    SelectionResult,
};

/// Fixed acknowledgement used when a selection response cannot be
/// parsed or validated.
pub const FALLBACK_RESPONSE: &str =
    "Interesting perspective on GameFi! 🎮 The gaming ecosystem keeps evolving. #GameFi #P2E";

/// How many snapshot items make it into the prompt context.
const CONTEXT_TOP_N: usize = 10;

const POST_STYLES: &[&str] = &[
    "Breaking news style",
    "Market insight",
    "Community focus",
    "Trend analysis",
];

const HOOK_PATTERNS: &[&str] = &[
    "Breaking: {coin} just...",
    "🚨 {coin} Alert:",
    "Trending Now:",
    "Market Move:",
    "Who spotted {trend}?",
    "Tech Update:",
    "Whale Alert:",
    "New Milestone:",
];

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

pub struct ContentGenerator {
    backend: Box<dyn CompletionBackend>,
    /// Hard ceiling applied to generated post text.
    char_ceiling: usize,
    /// Size bound on the recent-output window.
    history_window: usize,
    /// Recent assistant outputs, oldest first. Used only to bias future
    /// generations away from repeating content.
    history: Mutex<VecDeque<String>>,
}

impl ContentGenerator {
    pub fn new(
        backend: Box<dyn CompletionBackend>,
        char_ceiling: usize,
        history_window: usize,
    ) -> Self {
        Self {
            backend,
            char_ceiling,
            history_window,
            history: Mutex::new(VecDeque::new()),
        }
    }

    // -- Snapshot-based generation ----------------------------------------

    /// Generate one post from a market snapshot.
    ///
    /// The completion is trimmed to the configured ceiling by hard
    /// truncation; the backend is never asked to try again.
    pub async fn generate_from_snapshot(
        &self,
        snapshot: &MarketSnapshot,
    ) -> Result<GeneratedContent, HeraldError> {
        let style = POST_STYLES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("Market insight");

        let prompt = self.build_post_prompt(snapshot, style);
        debug!(model = %self.backend.model_name(), style, "Generating post");

        let raw = self.backend.complete(&prompt).await?;
        let text = truncate_to(raw.trim(), self.char_ceiling);

        self.remember(&text);

        Ok(GeneratedContent {
            text,
            style: Some(style.to_string()),
        })
    }

    /// Structured market context for the prompt: items grouped by
    /// category, plus the per-category overview.
    fn build_snapshot_context(snapshot: &MarketSnapshot) -> serde_json::Value {
        let mut buckets: std::collections::BTreeMap<String, Vec<serde_json::Value>> =
            std::collections::BTreeMap::new();
        for item in snapshot.top_items(CONTEXT_TOP_N) {
            buckets.entry(item.category.clone()).or_default().push(serde_json::json!({
                "name": item.name,
                "price": item.price_label(),
                "change_24h": format!("{:.1}%", item.change_24h),
                "volume": format!("${:.0}", item.volume_24h),
                "market_cap_rank": item.rank,
            }));
        }
        let by_category: serde_json::Map<String, serde_json::Value> = buckets
            .into_iter()
            .map(|(category, entries)| (category, serde_json::Value::Array(entries)))
            .collect();

        let overview: serde_json::Map<String, serde_json::Value> = snapshot
            .summaries
            .iter()
            .map(|(category, s)| {
                (
                    category.clone(),
                    serde_json::json!({
                        "total_market_cap": format!("${:.0}", s.market_cap),
                        "total_volume": format!("${:.0}", s.volume_24h),
                        "market_cap_change": format!("{:.1}%", s.market_cap_change_24h),
                        "top_coins": s.top_items,
                    }),
                )
            })
            .collect();

        serde_json::json!({
            "trending_coins": by_category,
            "market_overview": overview,
        })
    }

    fn build_post_prompt(&self, snapshot: &MarketSnapshot, style: &str) -> String {
        let context = Self::build_snapshot_context(snapshot);
        let recent = self
            .recent_outputs()
            .iter()
            .map(|t| format!("- {t}"))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are a crypto expert writing viral posts about GameFi and AI tokens.\n\
             Market data: {context}\n\n\
             Recent posts (avoid similar content):\n{recent}\n\n\
             Hook examples:\n{hooks}\n\n\
             Core requirements:\n\
             - Max {ceiling} characters\n\
             - Focus on significant market movements or interesting data points\n\
             - Include relevant emojis and hashtags based on category\n\
             - Add a sense of humor or curiosity if possible\n\
             - Avoid data points or coins already used in recent posts\n\
             - Avoid using too many numbers\n\
             - No formatting (bold/italic)\n\n\
             Style for this post: {style}\n\n\
             Write a post that crypto enthusiasts want to engage with:",
            context = serde_json::to_string_pretty(&context).unwrap_or_default(),
            recent = if recent.is_empty() { "- (none yet)".to_string() } else { recent },
            hooks = HOOK_PATTERNS.join("\n"),
            ceiling = self.char_ceiling,
            style = style,
        )
    }

    // -- Candidate-based selection ----------------------------------------

    /// Select one candidate post and generate a response for it.
    ///
    /// The completion is parsed as `{"selected_index": n, "response":
    /// "..."}`. A malformed payload, missing field, or out-of-range
    /// index triggers the fallback policy: a uniformly random candidate
    /// paired with a fixed acknowledgement. For a non-empty candidate
    /// list this method only fails on a non-recoverable backend error.
    pub async fn generate_from_candidates(
        &self,
        candidates: &[CandidatePost],
        mode: RespondMode,
    ) -> Result<SelectionResult, HeraldError> {
        if candidates.is_empty() {
            return Err(HeraldError::NoCandidates);
        }

        let prompt = Self::build_selection_prompt(candidates, mode);
        debug!(
            model = %self.backend.model_name(),
            candidates = candidates.len(),
            mode = %mode,
            "Generating selection"
        );

        let raw = self.backend.complete(&prompt).await?;

        match Self::parse_selection(&raw, candidates.len(), mode.response_ceiling()) {
            Some(selection) => Ok(selection),
            None => {
                warn!(mode = %mode, "Unusable selection response, applying fallback policy");
                let index = rand::thread_rng().gen_range(0..candidates.len());
                Ok(SelectionResult {
                    index,
                    response: FALLBACK_RESPONSE.to_string(),
                })
            }
        }
    }

    fn build_selection_prompt(candidates: &[CandidatePost], mode: RespondMode) -> String {
        let context: Vec<serde_json::Value> = candidates
            .iter()
            .map(|c| {
                serde_json::json!({
                    "text": c.text,
                    "author": c.author_handle,
                    "followers": c.follower_count,
                    "is_verified": c.verified,
                    "query": c.matched_query,
                })
            })
            .collect();

        format!(
            "You are a knowledgeable crypto gaming expert managing a social account.\n\
             Review these trending posts and select ONE to {mode} to:\n\n{context}\n\n\
             Selection tips:\n\
             - Pick posts about game features, updates, or community topics\n\
             - Prefer verified accounts or engaging discussions\n\
             - Look for topics you can add value to\n\n\
             Writing style:\n\
             - Keep it under {ceiling} characters\n\
             - Be genuine and conversational\n\
             - Use light humor when it fits naturally\n\
             - Add your unique gaming perspective\n\n\
             Return your response as JSON:\n\
             {{\"selected_index\": <index of chosen post>, \"response\": \"<your response>\"}}",
            mode = mode,
            context = serde_json::to_string_pretty(&context).unwrap_or_default(),
            ceiling = mode.response_ceiling(),
        )
    }

    /// Parse and validate a selection completion. Returns `None` on any
    /// shape problem so the caller can apply the fallback policy.
    fn parse_selection(raw: &str, candidate_count: usize, ceiling: usize) -> Option<SelectionResult> {
        #[derive(Deserialize)]
        struct Payload {
            selected_index: usize,
            response: String,
        }

        let cleaned = strip_code_fences(raw);
        let payload: Payload = serde_json::from_str(cleaned.trim()).ok()?;

        if payload.selected_index >= candidate_count {
            return None;
        }
        let response = payload.response.trim();
        if response.is_empty() {
            return None;
        }

        Some(SelectionResult {
            index: payload.selected_index,
            response: truncate_to(response, ceiling),
        })
    }

    // -- Rolling history ---------------------------------------------------

    /// Record an assistant output, evicting oldest-first past the
    /// window bound.
    fn remember(&self, text: &str) {
        let mut history = self.history.lock().expect("history lock poisoned");
        history.push_back(text.to_string());
        while history.len() > self.history_window {
            history.pop_front();
        }
    }

    fn recent_outputs(&self) -> Vec<String> {
        self.history
            .lock()
            .expect("history lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    #[cfg(test)]
    fn history_len(&self) -> usize {
        self.history.lock().unwrap().len()
    }
}

/// Strip a Markdown code fence (```json ... ```) if the backend wrapped
/// its JSON in one.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(stripped) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let stripped = stripped.strip_prefix("json").unwrap_or(stripped);
    stripped.strip_suffix("```").unwrap_or(stripped)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
