//! DALL-E image enrichment.
//!
//! Generates a themed image for a post, downloads it to a temp file,
//! and hands the path back as an artifact. Every failure mode is
//! swallowed into `None` so the publishing pipeline never stalls on
//! decoration.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{Artifact, EnrichmentStage};
use crate::types::GeneratedContent;

const IMAGES_API_URL: &str = "https://api.openai.com/v1/images/generations";
const IMAGE_MODEL: &str = "dall-e-3";
const IMAGE_SIZE: &str = "1024x1024";

const IMAGE_STYLES: &[&str] = &[
    "pixel-art",
    "cyberpunk",
    "cartoon",
    "vaporwave",
    "abstract",
    "isometric",
    "tech_blueprint",
];

// ---------------------------------------------------------------------------
// API types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ImageRequest {
    model: String,
    prompt: String,
    n: u32,
    size: String,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    #[serde(default)]
    url: Option<String>,
}

// ---------------------------------------------------------------------------
// Enricher
// ---------------------------------------------------------------------------

pub struct ImageEnricher {
    http: Client,
    api_key: String,
    temp_dir: PathBuf,
}

impl ImageEnricher {
    pub fn new(api_key: String, temp_dir: PathBuf) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build image HTTP client: {e}"))?;

        Ok(Self {
            http,
            api_key,
            temp_dir,
        })
    }

    fn build_prompt(content: &GeneratedContent, style: &str) -> String {
        format!(
            "An eye-catching {style} illustration for a crypto gaming social post. \
             Post text: \"{text}\". \
             Vivid colors, no text or letters in the image, social-media friendly.",
            style = style,
            text = content.text,
        )
    }

    /// The fallible inner path. `produce` wraps this so errors collapse
    /// to `None` at the trait boundary.
    async fn try_produce(&self, content: &GeneratedContent) -> anyhow::Result<Artifact> {
        let style = IMAGE_STYLES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("abstract");

        let request = ImageRequest {
            model: IMAGE_MODEL.to_string(),
            prompt: Self::build_prompt(content, style),
            n: 1,
            size: IMAGE_SIZE.to_string(),
        };

        debug!(style, "Requesting enrichment image");

        let resp = self
            .http
            .post(IMAGES_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("image generation failed: HTTP {status}: {body}");
        }

        let body: ImageResponse = resp.json().await?;
        let url = body
            .data
            .first()
            .and_then(|d| d.url.as_deref())
            .ok_or_else(|| anyhow::anyhow!("image response carried no url"))?;

        let path = self.download(url).await?;
        info!(path = %path.display(), style, "Enrichment artifact ready");
        Ok(Artifact { path })
    }

    async fn download(&self, url: &str) -> anyhow::Result<PathBuf> {
        let resp = self.http.get(url).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("image download failed: HTTP {}", resp.status());
        }
        let bytes = resp.bytes().await?;

        tokio::fs::create_dir_all(&self.temp_dir).await?;
        let path = self.temp_dir.join(format!("herald_{}.png", Uuid::new_v4()));
        tokio::fs::write(&path, &bytes).await?;
        Ok(path)
    }
}

#[async_trait]
impl EnrichmentStage for ImageEnricher {
    async fn produce(&self, content: &GeneratedContent) -> Option<Artifact> {
        match self.try_produce(content).await {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                warn!(error = %e, "Enrichment failed, continuing without artifact");
                None
            }
        }
    }

    async fn release(&self, artifact: Option<&Artifact>) {
        let Some(artifact) = artifact else {
            return;
        };
        if let Err(e) = remove_if_present(&artifact.path).await {
            warn!(path = %artifact.path.display(), error = %e, "Artifact cleanup failed");
        }
    }
}

/// Delete a file, treating "already gone" as success.
async fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
