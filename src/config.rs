use crate::env::{DEFAULT_PROVIDER_ENV, EnvSnapshot, GLOBAL_MAX_TOKENS_ENV, OPENAI_BASE_URL_ENV};
use crate::log_debug;
use crate::providers::Provider;
use crate::settings::SettingsError;

use serde::{Deserialize, Serialize};

/// LLM configuration for a single call site
///
/// Both provider sections may be filled in, only the one named by `provider` is used.
/// Resolution never mutates a configuration in place, it derives a new one.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmConfig {
    /// Active provider
    pub provider: Provider,
    /// Whether environment values may override the persisted provider fields
    pub use_environment_overrides: bool,
    /// Fallback token ceiling for every provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_max_tokens: Option<u32>,
    pub openai: OpenAiConfig,
    pub google: GoogleConfig,
}

/// OpenAI-compatible provider settings
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenAiConfig {
    pub api_key: String,
    /// Custom endpoint for OpenAI-compatible servers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Google Gemini provider settings
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct GoogleConfig {
    pub api_key: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl LlmConfig {
    /// Build the initial configuration from environment values and provider defaults
    ///
    /// This is what a fresh installation starts with before any settings are saved.
    pub fn from_env(env: &EnvSnapshot) -> Self {
        let provider = env
            .get(DEFAULT_PROVIDER_ENV)
            .and_then(|name| match name.parse::<Provider>() {
                Ok(provider) => Some(provider),
                Err(e) => {
                    log_debug!("Ignoring {}: {}", DEFAULT_PROVIDER_ENV, e);
                    None
                }
            })
            .unwrap_or_default();

        let string_or = |name: &str, fallback: &str| {
            env.get(name).map_or_else(|| fallback.to_string(), str::to_string)
        };

        Self {
            provider,
            use_environment_overrides: true,
            global_max_tokens: env.get_positive(GLOBAL_MAX_TOKENS_ENV),
            openai: OpenAiConfig {
                api_key: string_or(Provider::OpenAI.api_key_env(), ""),
                base_url: env.get(OPENAI_BASE_URL_ENV).map(str::to_string),
                model: string_or(
                    Provider::OpenAI.model_env(),
                    Provider::OpenAI.default_model(),
                ),
                max_tokens: env.get_positive(Provider::OpenAI.max_tokens_env()),
            },
            google: GoogleConfig {
                api_key: string_or(Provider::Google.api_key_env(), ""),
                model: string_or(
                    Provider::Google.model_env(),
                    Provider::Google.default_model(),
                ),
                max_tokens: env.get_positive(Provider::Google.max_tokens_env()),
            },
        }
    }

    /// Deep-merge a saved settings document over this configuration
    ///
    /// Tables merge key by key; anything the saved document leaves out keeps its
    /// current value.
    pub fn merge_saved(&self, saved: toml::Table) -> Result<Self, SettingsError> {
        let mut base: toml::Table = toml::from_str(&toml::to_string(self)?)?;
        merge_tables(&mut base, saved);
        let merged = toml::Value::Table(base).try_into()?;
        Ok(merged)
    }

    /// Copy of this configuration with another provider active
    #[must_use]
    pub fn with_provider(&self, provider: Provider) -> Self {
        Self {
            provider,
            ..self.clone()
        }
    }

    /// API key configured for a provider
    pub fn api_key(&self, provider: Provider) -> &str {
        match provider {
            Provider::OpenAI => &self.openai.api_key,
            Provider::Google => &self.google.api_key,
        }
    }

    /// Model configured for a provider
    pub fn model(&self, provider: Provider) -> &str {
        match provider {
            Provider::OpenAI => &self.openai.model,
            Provider::Google => &self.google.model,
        }
    }

    /// Provider-specific token ceiling, if one is set
    pub fn provider_max_tokens(&self, provider: Provider) -> Option<u32> {
        match provider {
            Provider::OpenAI => self.openai.max_tokens,
            Provider::Google => self.google.max_tokens,
        }
    }

    /// Copy safe to print: API keys reduced to their last four characters
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.openai.api_key = mask_secret(&copy.openai.api_key);
        copy.google.api_key = mask_secret(&copy.google.api_key);
        copy
    }
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{tail}", "*".repeat(chars.len() - 4))
}
