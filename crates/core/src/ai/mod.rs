//! AI summary client.
//!
//! [`SummaryClient`] turns a consultation's symptoms and diagnosis into a free-text clinical
//! summary. Every failure is normalised into [`AiServiceError`]; retrying is the caller's job.

mod mock;
mod openai;
mod prompt;

pub use mock::MockSummaryClient;
pub use openai::ChatCompletionsClient;
pub use prompt::{build_messages, ChatMessage, SYSTEM_PROMPT};

use crate::config::{AiConfig, AiProvider};
use crate::ConsultResult;
use async_trait::async_trait;
use std::sync::Arc;

/// The single failure kind of an AI provider call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("AI service is temporarily unavailable: {0}")]
pub struct AiServiceError(pub String);

/// Produces a clinical summary from consultation text.
#[async_trait]
pub trait SummaryClient: Send + Sync {
    /// Generate a summary. `symptoms` is non-empty; callers check this beforehand.
    ///
    /// Returns the provider's text verbatim.
    async fn generate_summary(&self, symptoms: &str, diagnosis: &str) -> Result<String, AiServiceError>;
}

/// Build the client for the configured provider.
pub fn build_summary_client(cfg: &AiConfig) -> ConsultResult<Arc<dyn SummaryClient>> {
    match cfg.provider {
        AiProvider::OpenAi => {
            if cfg.api_key.is_none() {
                tracing::warn!("AI_PROVIDER=openai but OPENAI_API_KEY is not set; summary requests will fail");
            }
            Ok(Arc::new(ChatCompletionsClient::new(cfg)?))
        }
        AiProvider::Ollama => Ok(Arc::new(ChatCompletionsClient::new(cfg)?)),
        AiProvider::Mock => Ok(Arc::new(MockSummaryClient)),
    }
}
