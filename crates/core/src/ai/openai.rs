//! OpenAI-compatible chat-completions client.
//!
//! Serves both the hosted OpenAI API and a local Ollama server, which exposes the same
//! wire format under `/v1`.

use super::prompt::{build_messages, ChatMessage};
use super::{AiServiceError, SummaryClient};
use crate::config::{AiConfig, AiProvider};
use crate::{ConsultError, ConsultResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 500;

/// Chat-completions request body.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ProviderError,
}

pub struct ChatCompletionsClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    // Hosted providers reject unauthenticated calls, so fail before the round trip.
    requires_key: bool,
}

impl ChatCompletionsClient {
    pub fn new(cfg: &AiConfig) -> ConsultResult<Self> {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(ConsultError::HttpClient)?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", cfg.base_url.trim_end_matches('/')),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            requires_key: cfg.provider == AiProvider::OpenAi,
        })
    }
}

#[async_trait]
impl SummaryClient for ChatCompletionsClient {
    async fn generate_summary(&self, symptoms: &str, diagnosis: &str) -> Result<String, AiServiceError> {
        if self.requires_key && self.api_key.is_none() {
            return Err(AiServiceError("OPENAI_API_KEY is not configured".into()));
        }

        let request = ChatRequest {
            model: &self.model,
            messages: build_messages(symptoms, diagnosis),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        debug!(model = %self.model, endpoint = %self.endpoint, "requesting summary");
        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| AiServiceError(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|env| env.error.message)
                .unwrap_or(body);
            return Err(AiServiceError(format!("HTTP {status}: {reason}")));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| AiServiceError(format!("malformed response: {e}")))?;

        if let Some(error) = parsed.error {
            return Err(AiServiceError(error.message));
        }

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AiServiceError("provider returned no summary".into()))
    }
}
