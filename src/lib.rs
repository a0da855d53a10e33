//! Coin Herald — scheduled market-post orchestration agent.
//!
//! Aggregates category market data, generates social posts with an LLM
//! backend, optionally enriches them with a generated image, and
//! publishes on a timezone-aware schedule. A second workflow selects a
//! trending third-party post and responds to it.
//!
//! Module map:
//! - [`market`] — rate-limited provider client and snapshot aggregation
//! - [`content`] — prompt construction and the completion backend seam
//! - [`enrich`] — best-effort image artifacts with guaranteed cleanup
//! - [`publish`] — platform write operations with hard ceilings
//! - [`candidates`] — trending-post sourcing for respond workflows
//! - [`engine`] — the two workflows and their outcome envelopes
//! - [`scheduler`] — wall-clock times across two timezones
//! - [`control`] — host-facing JSON API

pub mod candidates;
pub mod config;
pub mod content;
pub mod control;
pub mod engine;
pub mod enrich;
pub mod market;
pub mod publish;
pub mod scheduler;
pub mod types;
