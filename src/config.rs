//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API keys) are referenced by env-var name in the config and
//! resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub market: MarketConfig,
    pub generation: GenerationConfig,
    pub enrichment: EnrichmentConfig,
    pub publish: PublishConfig,
    pub candidates: CandidatesConfig,
    pub control: ControlConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    pub name: String,
    /// Daily posting slots as "HH:MM" wall-clock times in `author_timezone`.
    pub schedule_times: Vec<String>,
    /// IANA zone the schedule times are authored in.
    pub author_timezone: String,
    /// IANA zone the trigger instants are converted to for publishing.
    pub publish_timezone: String,
    /// What to do when the same recurring time is scheduled twice.
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}

/// Policy for re-scheduling an already-registered recurring time.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    #[default]
    Replace,
    Ignore,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MarketConfig {
    pub base_url: String,
    pub api_key_env: Option<String>,
    /// Category tags to aggregate ("gaming", "artificial-intelligence", ...).
    pub categories: Vec<String>,
    /// Items per category listing query.
    pub item_limit: u32,
    /// Minimum gap between upstream requests, milliseconds.
    pub min_request_interval_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    pub model: String,
    pub api_key_env: String,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Hard character ceiling applied to generated post text.
    pub char_ceiling: usize,
    /// How many recent outputs to keep for de-duplication hints.
    pub history_window: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EnrichmentConfig {
    pub enabled: bool,
    pub api_key_env: String,
    /// Directory for transient image artifacts.
    pub temp_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PublishConfig {
    pub api_key_env: String,
    /// Per-stage hard ceilings. The platform limit is 280; replies are
    /// held slightly under it to leave room for the handle prefix.
    #[serde(default = "default_post_ceiling")]
    pub post_ceiling: usize,
    #[serde(default = "default_post_ceiling")]
    pub quote_ceiling: usize,
    #[serde(default = "default_reply_ceiling")]
    pub reply_ceiling: usize,
}

fn default_post_ceiling() -> usize {
    280
}

fn default_reply_ceiling() -> usize {
    270
}

#[derive(Debug, Deserialize, Clone)]
pub struct CandidatesConfig {
    pub api_key_env: String,
    /// Topical search queries for trending candidate posts.
    pub queries: Vec<String>,
    /// Bound on the returned candidate list.
    pub limit: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ControlConfig {
    pub enabled: bool,
    pub port: u16,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
