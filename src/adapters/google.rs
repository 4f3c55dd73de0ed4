use super::{ProviderAdapter, SamplingParams, read_response};
use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::providers::Provider;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Public Gemini API endpoint
pub const DEFAULT_GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

// The response format is:
// { "candidates": [ { "content": { "parts": [ { "text": "..." } ] } } ] }
#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Adapter for the Google Gemini `generateContent` API
#[derive(Debug, Clone)]
pub struct GoogleAdapter {
    client: Client,
    base_url: String,
}

impl GoogleAdapter {
    /// Creates a new adapter against the public Gemini endpoint
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, DEFAULT_GOOGLE_BASE_URL)
    }

    /// Creates a new adapter against a custom endpoint (proxies, tests)
    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn generate_url(&self, model: &str) -> String {
        // Model is specified in the URL, not in the body
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        )
    }
}

impl Default for GoogleAdapter {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

#[async_trait]
impl ProviderAdapter for GoogleAdapter {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    async fn request_completion(
        &self,
        config: &LlmConfig,
        prompt: &str,
        params: SamplingParams,
    ) -> Result<String, LlmError> {
        let request = GenerateContentRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: params.temperature,
                max_output_tokens: params.max_tokens,
            },
        };

        // The API key travels as a query parameter, not a header
        let response = self
            .client
            .post(self.generate_url(&config.google.model))
            .query(&[("key", config.google.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        read_response(response).await
    }

    fn extract_text(&self, body: &str) -> Result<String, LlmError> {
        let response: GenerateContentResponse = serde_json::from_str(body)
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyCompletion)?;

        candidate
            .content
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .ok_or_else(|| {
                LlmError::MalformedResponse(
                    "Failed to extract content from Gemini API response".to_string(),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_url() {
        let adapter = GoogleAdapter::with_base_url(Client::new(), "http://127.0.0.1:9000/");
        assert_eq!(
            adapter.generate_url("gemini-1.5-flash"),
            "http://127.0.0.1:9000/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_extract_text() {
        let adapter = GoogleAdapter::default();
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"hello"}],"role":"model"},"finishReason":"STOP"}]}"#;
        assert_eq!(adapter.extract_text(body), Ok("hello".to_string()));
    }

    #[test]
    fn test_empty_candidates() {
        let adapter = GoogleAdapter::default();
        assert_eq!(
            adapter.extract_text(r#"{"candidates":[]}"#),
            Err(LlmError::EmptyCompletion)
        );
        assert_eq!(
            adapter.extract_text(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#),
            Err(LlmError::EmptyCompletion)
        );
    }

    #[test]
    fn test_candidate_without_text() {
        let adapter = GoogleAdapter::default();
        assert!(matches!(
            adapter.extract_text(r#"{"candidates":[{"finishReason":"MAX_TOKENS"}]}"#),
            Err(LlmError::MalformedResponse(_))
        ));
        assert!(matches!(
            adapter.extract_text(r#"{"candidates":[{"content":{"parts":[]}}]}"#),
            Err(LlmError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_request_wire_shape() {
        let request = GenerateContentRequest {
            contents: [Content {
                parts: [Part { text: "hi" }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.25,
                max_output_tokens: 100,
            },
        };
        let json = serde_json::to_value(&request).expect("serializable");
        assert_eq!(
            json,
            serde_json::json!({
                "contents": [{"parts": [{"text": "hi"}]}],
                "generationConfig": {"temperature": 0.25, "maxOutputTokens": 100}
            })
        );
    }
}
