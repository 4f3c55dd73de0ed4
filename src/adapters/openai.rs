//! OpenAI-compatible chat completions adapter.
//!
//! Works against api.openai.com as well as any server exposing the same
//! `/chat/completions` endpoint (set `baseUrl`).

use super::{ProviderAdapter, SamplingParams, read_response};
use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::providers::Provider;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Endpoint used when no base URL is configured
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Adapter for OpenAI and OpenAI-compatible servers
#[derive(Debug, Clone, Default)]
pub struct OpenAiAdapter {
    client: Client,
}

impl OpenAiAdapter {
    /// Creates a new adapter that shares the given HTTP client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn completions_url(config: &LlmConfig) -> String {
        let base = config
            .openai
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_OPENAI_BASE_URL);
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn provider(&self) -> Provider {
        Provider::OpenAI
    }

    async fn request_completion(
        &self,
        config: &LlmConfig,
        prompt: &str,
        params: SamplingParams,
    ) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &config.openai.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let response = self
            .client
            .post(Self::completions_url(config))
            .bearer_auth(&config.openai.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        read_response(response).await
    }

    fn extract_text(&self, body: &str) -> Result<String, LlmError> {
        let response: ChatResponse = serde_json::from_str(body)
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyCompletion)?;

        choice.message.content.ok_or_else(|| {
            LlmError::MalformedResponse("choice has no message content".to_string())
        })
    }
}
