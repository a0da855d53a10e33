//! Best-effort content enrichment.
//!
//! An enrichment stage may attach a media artifact to a post. The stage
//! is strictly optional: any internal failure degrades to "no artifact"
//! and the workflow carries on text-only. The caller owns the artifact
//! lifecycle and must call `release` on every exit path.

pub mod image;

use async_trait::async_trait;
use std::path::PathBuf;

use crate::types::GeneratedContent;

/// A produced media artifact, held as a temp-file path until released.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
}

#[async_trait]
pub trait EnrichmentStage: Send + Sync {
    /// Try to produce an artifact for the content. Never fails: any
    /// internal error is logged and collapses to `None`.
    async fn produce(&self, content: &GeneratedContent) -> Option<Artifact>;

    /// Dispose of an artifact's backing resources. Idempotent, tolerates
    /// an already-missing file, and accepts `None` as a no-op so callers
    /// can release unconditionally.
    async fn release(&self, artifact: Option<&Artifact>);
}
