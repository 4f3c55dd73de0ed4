//! Provider adapters.
//!
//! Each adapter translates the uniform generation contract into one provider's wire
//! format. Variants only implement the two wire-level steps (sending a completion
//! request and pulling the text out of a successful body); key checks, token
//! resolution, error attribution and the connection test are shared.
//!
//! Adapters expect an *effective* configuration, i.e. one that already went through
//! [`crate::resolver::resolve_effective_config`]. The gateway takes care of that.

pub mod google;
pub mod openai;

pub use google::GoogleAdapter;
pub use openai::OpenAiAdapter;

use crate::config::LlmConfig;
use crate::error::{LlmError, MissingField, ProviderFailure};
use crate::providers::Provider;
use crate::resolver::resolve_effective_max_tokens;
use crate::{log_debug, log_error, log_warn};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Sampling temperature when the caller does not pass one
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Token ceiling for the connectivity probe
pub const CONNECTION_TEST_MAX_TOKENS: u32 = 5;
/// Prompt sent by the connectivity probe
pub const CONNECTION_TEST_PROMPT: &str = "Hello, this is a test.";
/// Longest raw body excerpt surfaced when an error body is not structured
pub const ERROR_EXCERPT_LIMIT: usize = 100;

/// A single text generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub config: LlmConfig,
    /// Defaults to [`DEFAULT_TEMPERATURE`]
    pub temperature: Option<f32>,
    /// Overrides every configured ceiling when set
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, config: LlmConfig) -> Self {
        Self {
            prompt: prompt.into(),
            config,
            temperature: None,
            max_tokens: None,
        }
    }

    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Successful generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
}

/// Outcome of a connectivity probe
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionTestResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionTestResult {
    pub fn connected(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

/// Sampling parameters after defaults and precedence have been applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider this adapter speaks to
    fn provider(&self) -> Provider;

    /// Issue exactly one completion request and return the body of a 2xx response
    async fn request_completion(
        &self,
        config: &LlmConfig,
        prompt: &str,
        params: SamplingParams,
    ) -> Result<String, LlmError>;

    /// Extract the first candidate's text from a successful response body
    fn extract_text(&self, body: &str) -> Result<String, LlmError>;

    /// Probe connectivity with a minimal, cheap request
    ///
    /// Never fails: every problem is reported through the returned result.
    async fn test_connection(&self, config: &LlmConfig) -> ConnectionTestResult {
        let provider = self.provider();
        if let Err(e) = ensure_ready(config, provider) {
            return ConnectionTestResult::failed(e.to_string());
        }

        let params = SamplingParams {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: CONNECTION_TEST_MAX_TOKENS,
        };
        match self
            .request_completion(config, CONNECTION_TEST_PROMPT, params)
            .await
        {
            Ok(_) => ConnectionTestResult::connected(format!(
                "Successfully connected to {} API",
                provider.display_name()
            )),
            Err(e) => {
                log_warn!("{} connection test failed: {}", provider.display_name(), e);
                ConnectionTestResult::failed(e.to_string())
            }
        }
    }

    /// Generate text for a prompt
    async fn generate_text(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, ProviderFailure> {
        let provider = self.provider();
        let config = &request.config;
        let fail = |kind: LlmError| {
            log_error!("{} text generation error: {}", provider.display_name(), kind);
            ProviderFailure::new(provider, kind)
        };

        ensure_ready(config, provider).map_err(fail)?;
        if request.prompt.trim().is_empty() {
            return Err(fail(LlmError::EmptyPrompt));
        }

        let params = SamplingParams {
            temperature: request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: resolve_effective_max_tokens(config, provider, request.max_tokens),
        };
        log_debug!(
            "Generating with {} model={} max_tokens={} temperature={}",
            provider.display_name(),
            config.model(provider),
            params.max_tokens,
            params.temperature
        );

        let body = self
            .request_completion(config, &request.prompt, params)
            .await
            .map_err(fail)?;
        let text = self.extract_text(&body).map_err(fail)?;
        Ok(GenerationResult { text })
    }
}

/// Check the settings a request cannot be made without
pub fn ensure_ready(config: &LlmConfig, provider: Provider) -> Result<(), LlmError> {
    let missing = if config.api_key(provider).is_empty() {
        MissingField::ApiKey
    } else if config.model(provider).is_empty() {
        MissingField::Model
    } else {
        return Ok(());
    };
    Err(LlmError::ConfigurationIncomplete {
        provider,
        field: missing,
    })
}

/// Turn an HTTP response into its body, mapping non-2xx statuses to provider errors
pub(crate) async fn read_response(response: reqwest::Response) -> Result<String, LlmError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| LlmError::Transport(e.to_string()))?;

    if status.is_success() {
        return Ok(body);
    }

    log_debug!("Provider returned HTTP {}", status);
    Err(LlmError::Provider {
        status: status.as_u16(),
        message: decode_error_body(status.as_u16(), &body),
    })
}

/// Human-readable message for an error response body
///
/// Structured `{"error": {"message": ...}}` bodies yield their message; other JSON
/// yields `HTTP error <status>`; anything else yields a bounded excerpt of the raw text.
pub fn decode_error_body(status: u16, body: &str) -> String {
    let fallback = || format!("HTTP error {status}");

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        return value
            .pointer("/error/message")
            .and_then(serde_json::Value::as_str)
            .filter(|message| !message.is_empty())
            .map_or_else(fallback, str::to_string);
    }

    let excerpt: String = body.trim().chars().take(ERROR_EXCERPT_LIMIT).collect();
    if excerpt.is_empty() {
        fallback()
    } else {
        excerpt
    }
}
