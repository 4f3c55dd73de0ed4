//! Error types shared by the provider adapters and the gateway.

use crate::providers::Provider;

/// Setting that must be present before a provider can be called
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    ApiKey,
    Model,
}

impl MissingField {
    const fn label(self) -> &'static str {
        match self {
            Self::ApiKey => "API key",
            Self::Model => "model",
        }
    }
}

/// Failure classes of a single provider call
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LlmError {
    /// Key or model missing after resolution; no request was made
    #[error(
        "{} {} is not configured. Please provide it in settings or via environment variables.",
        .provider.display_name(),
        .field.label()
    )]
    ConfigurationIncomplete {
        provider: Provider,
        field: MissingField,
    },
    #[error("Prompt must not be empty")]
    EmptyPrompt,
    /// Network, DNS or connection failure before any response arrived
    #[error("{0}")]
    Transport(String),
    /// Non-2xx response; `message` is already decoded from the body
    #[error("{message}")]
    Provider { status: u16, message: String },
    #[error("No response generated from the model")]
    EmptyCompletion,
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

/// A [`LlmError`] attributed to the provider that produced it
///
/// Displays as `"<provider label>: <message>"`, e.g. `OpenAI error: ...`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{}: {kind}", .provider.error_label())]
pub struct ProviderFailure {
    pub provider: Provider,
    #[source]
    pub kind: LlmError,
}

impl ProviderFailure {
    pub fn new(provider: Provider, kind: LlmError) -> Self {
        Self { provider, kind }
    }
}

/// Errors surfaced by the gateway
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    /// No adapter is registered for the provider
    #[error("Unsupported LLM provider: {0}")]
    UnsupportedProvider(Provider),
    #[error("Failed to generate text: {0}")]
    Generation(#[from] ProviderFailure),
}

impl GatewayError {
    /// Underlying failure class, if the error came from an adapter
    pub fn kind(&self) -> Option<&LlmError> {
        match self {
            Self::UnsupportedProvider(_) => None,
            Self::Generation(failure) => Some(&failure.kind),
        }
    }
}
