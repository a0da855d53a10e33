//! Publishing to the social platform.
//!
//! The `SocialPlatform` trait covers the three write operations: a new
//! post, a quote of an existing post, and a reply. Per-stage character
//! ceilings are normalized here, immediately before the network call,
//! so no caller can push over-length text onto the wire.

pub mod twitter;

use async_trait::async_trait;

use crate::enrich::Artifact;
use crate::types::{truncate_to, HeraldError};

#[async_trait]
pub trait SocialPlatform: Send + Sync {
    /// Publish a new post, optionally with a media artifact attached.
    /// `Ok(None)` means the platform accepted the request but created no
    /// identifiable record; callers treat that as failure.
    async fn publish(
        &self,
        text: &str,
        artifact: Option<&Artifact>,
    ) -> Result<Option<String>, HeraldError>;

    /// Publish a post quoting `target_id`.
    async fn publish_quoted(
        &self,
        target_id: &str,
        text: &str,
    ) -> Result<Option<String>, HeraldError>;

    /// Publish a reply to `target_id`.
    async fn publish_reply(
        &self,
        target_id: &str,
        text: &str,
    ) -> Result<Option<String>, HeraldError>;
}

// ---------------------------------------------------------------------------
// Ceilings
// ---------------------------------------------------------------------------

/// Hard character ceilings per publish stage.
#[derive(Debug, Clone, Copy)]
pub struct PublishLimits {
    pub post: usize,
    pub quote: usize,
    pub reply: usize,
}

impl Default for PublishLimits {
    fn default() -> Self {
        Self {
            post: 280,
            quote: 280,
            reply: 270,
        }
    }
}

impl PublishLimits {
    pub fn normalize_post(&self, text: &str) -> String {
        truncate_to(text, self.post)
    }

    pub fn normalize_quote(&self, text: &str) -> String {
        truncate_to(text, self.quote)
    }

    pub fn normalize_reply(&self, text: &str) -> String {
        truncate_to(text, self.reply)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
