//! LLM Provider definitions.
//!
//! Single source of truth for supported providers, their display names and the
//! environment variables that feed their configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAI,
    Google,
}

impl Provider {
    /// All available providers, in their stable listing order
    pub const ALL: &'static [Provider] = &[Provider::OpenAI, Provider::Google];

    /// Provider name as used in settings files, env vars and the CLI
    pub const fn name(self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Google => "google",
        }
    }

    /// Human-readable name used in messages
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Google => "Google",
        }
    }

    /// Prefix applied to every generation failure from this provider
    pub const fn error_label(self) -> &'static str {
        match self {
            Self::OpenAI => "OpenAI error",
            Self::Google => "Google API error",
        }
    }

    /// Default model when neither settings nor environment name one
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::OpenAI => "gpt-4o",
            Self::Google => "gemini-1.5-flash",
        }
    }

    /// Environment variable name for the API key
    pub const fn api_key_env(self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Google => "GOOGLE_API_KEY",
        }
    }

    /// Environment variable name for the model
    pub const fn model_env(self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_MODEL",
            Self::Google => "GOOGLE_MODEL",
        }
    }

    /// Environment variable name for the provider-specific token ceiling
    pub const fn max_tokens_env(self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_MAX_TOKENS",
            Self::Google => "GOOGLE_MAX_TOKENS",
        }
    }

    /// Get all provider names as strings
    pub fn all_names() -> Vec<&'static str> {
        Self::ALL.iter().map(|p| p.name()).collect()
    }
}

impl FromStr for Provider {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();

        Self::ALL
            .iter()
            .find(|p| p.name() == normalized)
            .copied()
            .ok_or_else(|| ProviderError::Unknown(s.to_string()))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Provider lookup error
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Unsupported LLM provider: {0}. Supported: openai, google")]
    Unknown(String),
}
