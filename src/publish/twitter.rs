//! Twitter/X v2 publisher.
//!
//! Posts, quotes, and replies go through `POST /2/tweets`; media is
//! uploaded separately and referenced by id. Authentication is a bearer
//! token resolved from the environment at startup.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{PublishLimits, SocialPlatform};
use crate::enrich::Artifact;
use crate::types::HeraldError;

const TWEETS_URL: &str = "https://api.twitter.com/2/tweets";
const MEDIA_UPLOAD_URL: &str = "https://upload.twitter.com/1.1/media/upload.json";

// ---------------------------------------------------------------------------
// API types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct CreateRequest {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<MediaRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quote_tweet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<ReplyRef>,
}

#[derive(Debug, Serialize)]
struct MediaRef {
    media_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ReplyRef {
    in_reply_to_tweet_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(default)]
    data: Option<CreatedPost>,
}

#[derive(Debug, Deserialize)]
struct CreatedPost {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MediaUploadResponse {
    media_id_string: String,
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

pub struct TwitterPublisher {
    http: Client,
    bearer_token: String,
    limits: PublishLimits,
}

impl TwitterPublisher {
    pub fn new(bearer_token: String, limits: PublishLimits) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build publisher HTTP client: {e}"))?;

        Ok(Self {
            http,
            bearer_token,
            limits,
        })
    }

    async fn create(&self, request: CreateRequest) -> Result<Option<String>, HeraldError> {
        debug!(chars = request.text.chars().count(), "Creating post");

        let resp = self
            .http
            .post(TWEETS_URL)
            .bearer_auth(&self.bearer_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| HeraldError::Publish(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(HeraldError::Publish(format!("HTTP {status}: {body}")));
        }

        let body: CreateResponse = resp
            .json()
            .await
            .map_err(|e| HeraldError::Publish(format!("unreadable response: {e}")))?;

        match &body.data {
            Some(created) => info!(post_id = %created.id, "Post published"),
            None => warn!("Platform accepted request but returned no post id"),
        }
        Ok(body.data.map(|d| d.id))
    }

    /// Upload the artifact and return its media id. A failed upload
    /// degrades to a text-only post rather than failing the publish.
    async fn upload_media(&self, artifact: &Artifact) -> Option<String> {
        let bytes = match tokio::fs::read(&artifact.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %artifact.path.display(), error = %e, "Artifact unreadable, posting text-only");
                return None;
            }
        };

        let part = reqwest::multipart::Part::bytes(bytes).file_name("media.png");
        let form = reqwest::multipart::Form::new().part("media", part);

        let result = self
            .http
            .post(MEDIA_UPLOAD_URL)
            .bearer_auth(&self.bearer_token)
            .multipart(form)
            .send()
            .await;

        let resp = match result {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                warn!(status = %resp.status(), "Media upload rejected, posting text-only");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Media upload failed, posting text-only");
                return None;
            }
        };

        match resp.json::<MediaUploadResponse>().await {
            Ok(body) => Some(body.media_id_string),
            Err(e) => {
                warn!(error = %e, "Unreadable media upload response, posting text-only");
                None
            }
        }
    }
}

#[async_trait]
impl SocialPlatform for TwitterPublisher {
    async fn publish(
        &self,
        text: &str,
        artifact: Option<&Artifact>,
    ) -> Result<Option<String>, HeraldError> {
        let media = match artifact {
            Some(artifact) => self.upload_media(artifact).await.map(|id| MediaRef {
                media_ids: vec![id],
            }),
            None => None,
        };

        self.create(CreateRequest {
            text: self.limits.normalize_post(text),
            media,
            quote_tweet_id: None,
            reply: None,
        })
        .await
    }

    async fn publish_quoted(
        &self,
        target_id: &str,
        text: &str,
    ) -> Result<Option<String>, HeraldError> {
        self.create(CreateRequest {
            text: self.limits.normalize_quote(text),
            media: None,
            quote_tweet_id: Some(target_id.to_string()),
            reply: None,
        })
        .await
    }

    async fn publish_reply(
        &self,
        target_id: &str,
        text: &str,
    ) -> Result<Option<String>, HeraldError> {
        self.create(CreateRequest {
            text: self.limits.normalize_reply(text),
            media: None,
            quote_tweet_id: None,
            reply: Some(ReplyRef {
                in_reply_to_tweet_id: target_id.to_string(),
            }),
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
