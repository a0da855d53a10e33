//! Workflow orchestration.
//!
//! The orchestrator wires the trait seams together and runs the two
//! workflows end to end:
//!
//! - generate-and-publish: snapshot → content → optional enrichment →
//!   post. Enrichment failure never aborts; the artifact is released on
//!   every exit path.
//! - select-and-respond: candidate fetch → selection → quote or reply.
//!   The candidate source is torn down on every exit path.
//!
//! Components raise `HeraldError`; this is the single place that
//! catches them and maps them to outcome envelopes. No error escapes a
//! workflow entry point.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::candidates::CandidateSource;
use crate::content::generator::ContentGenerator;
use crate::enrich::{Artifact, EnrichmentStage};
use crate::market::MarketFeed;
use crate::publish::SocialPlatform;
use crate::types::{HeraldError, PostOutcome, RespondMode, RespondOutcome};

pub struct Orchestrator {
    feed: Arc<dyn MarketFeed>,
    generator: ContentGenerator,
    enricher: Arc<dyn EnrichmentStage>,
    publisher: Arc<dyn SocialPlatform>,
    candidates: Arc<dyn CandidateSource>,
    categories: Vec<String>,
    queries: Vec<String>,
    enrichment_enabled: bool,
    default_candidate_limit: usize,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        feed: Arc<dyn MarketFeed>,
        generator: ContentGenerator,
        enricher: Arc<dyn EnrichmentStage>,
        publisher: Arc<dyn SocialPlatform>,
        candidates: Arc<dyn CandidateSource>,
        categories: Vec<String>,
        queries: Vec<String>,
        enrichment_enabled: bool,
        default_candidate_limit: usize,
    ) -> Self {
        Self {
            feed,
            generator,
            enricher,
            publisher,
            candidates,
            categories,
            queries,
            enrichment_enabled,
            default_candidate_limit,
        }
    }

    // -- generate-and-publish ---------------------------------------------

    /// Run one generate-and-publish cycle. Infallible at this boundary:
    /// failures map to `PostOutcome::Aborted` with a readable reason.
    pub async fn run_post_workflow(&self, force_enrichment: bool) -> PostOutcome {
        info!(force_enrichment, "Post workflow started");

        let mut artifact: Option<Artifact> = None;
        let result = self.post_inner(force_enrichment, &mut artifact).await;

        // Every exit path releases the artifact exactly once.
        self.enricher.release(artifact.as_ref()).await;

        match result {
            Ok((post_id, artifact_attached)) => {
                info!(post_id = %post_id, artifact_attached, "Post workflow complete");
                PostOutcome::Published {
                    post_id,
                    artifact_attached,
                }
            }
            Err(e) => {
                error!(error = %e, "Post workflow aborted");
                PostOutcome::Aborted {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn post_inner(
        &self,
        force_enrichment: bool,
        artifact: &mut Option<Artifact>,
    ) -> Result<(String, bool), HeraldError> {
        info!(stage = "FETCHING", categories = ?self.categories);
        let snapshot = self.feed.fetch_snapshot(&self.categories).await?;

        info!(stage = "GENERATING", items = snapshot.items.len());
        let content = self.generator.generate_from_snapshot(&snapshot).await?;

        if self.enrichment_enabled || force_enrichment {
            info!(stage = "ENRICHING");
            *artifact = self.enricher.produce(&content).await;
            if artifact.is_none() {
                warn!("No artifact produced, publishing text-only");
            }
        }

        info!(stage = "PUBLISHING", chars = content.char_count());
        let post_id = self
            .publisher
            .publish(&content.text, artifact.as_ref())
            .await?
            .ok_or_else(|| HeraldError::Publish("platform returned no post id".to_string()))?;

        Ok((post_id, artifact.is_some()))
    }

    // -- select-and-respond -----------------------------------------------

    /// Run one select-and-respond cycle. Infallible at this boundary:
    /// failures map to `RespondOutcome::Aborted`.
    pub async fn run_respond_workflow(
        &self,
        mode: RespondMode,
        limit: Option<usize>,
    ) -> RespondOutcome {
        let limit = limit.unwrap_or(self.default_candidate_limit);
        info!(mode = %mode, limit, "Respond workflow started");

        if let Err(e) = self.candidates.init().await {
            error!(error = %e, "Candidate source init failed");
            return RespondOutcome::Aborted {
                reason: e.to_string(),
            };
        }

        let result = self.respond_inner(mode, limit).await;

        // Teardown runs whether the workflow succeeded or not.
        self.candidates.teardown().await;

        match result {
            Ok(outcome) => {
                if let RespondOutcome::Published { post_id, .. } = &outcome {
                    info!(post_id = %post_id, mode = %mode, "Respond workflow complete");
                }
                outcome
            }
            Err(e) => {
                error!(error = %e, "Respond workflow aborted");
                RespondOutcome::Aborted {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn respond_inner(
        &self,
        mode: RespondMode,
        limit: usize,
    ) -> Result<RespondOutcome, HeraldError> {
        info!(stage = "FETCHING", queries = ?self.queries);
        let candidates = self.candidates.fetch_trending(&self.queries, limit).await?;
        if candidates.is_empty() {
            return Err(HeraldError::NoCandidates);
        }

        info!(stage = "GENERATING", candidates = candidates.len());
        let selection = self
            .generator
            .generate_from_candidates(&candidates, mode)
            .await?;
        let chosen = candidates[selection.index].clone();

        info!(
            stage = "PUBLISHING",
            target = %chosen.id,
            author = %chosen.author_handle,
            mode = %mode,
        );
        let published = match mode {
            RespondMode::Quote => {
                self.publisher
                    .publish_quoted(&chosen.id, &selection.response)
                    .await?
            }
            RespondMode::Reply => {
                self.publisher
                    .publish_reply(&chosen.id, &selection.response)
                    .await?
            }
        };

        let post_id = published
            .ok_or_else(|| HeraldError::Publish("platform returned no post id".to_string()))?;

        Ok(RespondOutcome::Published {
            post_id,
            candidate: chosen,
            response: selection.response,
        })
    }
}
