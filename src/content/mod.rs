//! Content generation.
//!
//! Defines the `CompletionBackend` trait for single-shot text
//! completion and the `ContentGenerator` that builds prompts, validates
//! responses, and applies the fallback policy.

pub mod generator;
pub mod openai;

use async_trait::async_trait;

use crate::types::HeraldError;

/// Abstraction over the text-generation backend.
///
/// The backend is not trusted to obey formatting instructions — callers
/// enforce their own character ceilings and structured-output parsing.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Submit one prompt and return the raw completion text.
    ///
    /// Fails with `HeraldError::Generation` only for non-recoverable
    /// backend failures (transport, timeout, auth). A received-but-odd
    /// completion is returned as-is for the caller to validate.
    async fn complete(&self, prompt: &str) -> Result<String, HeraldError>;

    /// Model identifier string.
    fn model_name(&self) -> &str;
}
