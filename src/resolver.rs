//! Configuration resolution and readiness checks.
//!
//! Everything here is pure: the same configuration and environment snapshot always
//! resolve to the same result, and missing configuration is reported as `false` or an
//! empty list rather than an error.

use crate::config::LlmConfig;
use crate::env::{EnvSnapshot, GLOBAL_MAX_TOKENS_ENV, OPENAI_BASE_URL_ENV};
use crate::providers::Provider;

/// Token ceiling used when neither the call, the provider nor the global setting has one
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// Overlay environment values onto the active provider's settings
///
/// With overrides disabled the configuration comes back unchanged. Otherwise every
/// non-empty environment value for the active provider replaces the persisted one, and
/// `LLM_MAX_TOKENS` replaces the global ceiling. The inactive provider is left alone.
pub fn resolve_effective_config(config: &LlmConfig, env: &EnvSnapshot) -> LlmConfig {
    let mut effective = config.clone();
    if !config.use_environment_overrides {
        return effective;
    }

    if let Some(max_tokens) = env.get_positive(GLOBAL_MAX_TOKENS_ENV) {
        effective.global_max_tokens = Some(max_tokens);
    }

    let provider = config.provider;
    let api_key = env.get(provider.api_key_env()).map(str::to_string);
    let model = env.get(provider.model_env()).map(str::to_string);
    let max_tokens = env.get_positive(provider.max_tokens_env());

    match provider {
        Provider::OpenAI => {
            let openai = &mut effective.openai;
            if let Some(api_key) = api_key {
                openai.api_key = api_key;
            }
            if let Some(base_url) = env.get(OPENAI_BASE_URL_ENV) {
                openai.base_url = Some(base_url.to_string());
            }
            if let Some(model) = model {
                openai.model = model;
            }
            if max_tokens.is_some() {
                openai.max_tokens = max_tokens;
            }
        }
        Provider::Google => {
            let google = &mut effective.google;
            if let Some(api_key) = api_key {
                google.api_key = api_key;
            }
            if let Some(model) = model {
                google.model = model;
            }
            if max_tokens.is_some() {
                google.max_tokens = max_tokens;
            }
        }
    }

    effective
}

/// Whether a provider has both an API key and a model
///
/// Evaluated on the configuration as given, without the environment overlay, so
/// callers can warn before anything is resolved.
pub fn is_provider_configuration_complete(config: &LlmConfig, provider: Provider) -> bool {
    !config.api_key(provider).is_empty() && !config.model(provider).is_empty()
}

/// Providers whose configuration is complete, in stable order
pub fn list_available_providers(config: &LlmConfig) -> Vec<Provider> {
    Provider::ALL
        .iter()
        .copied()
        .filter(|provider| is_provider_configuration_complete(config, *provider))
        .collect()
}

/// Token ceiling for a call
///
/// Precedence: per-call value, then the provider's own setting, then the global
/// setting, then [`DEFAULT_MAX_TOKENS`]. Zero counts as unset at every level.
pub fn resolve_effective_max_tokens(
    config: &LlmConfig,
    provider: Provider,
    per_call: Option<u32>,
) -> u32 {
    [
        per_call,
        config.provider_max_tokens(provider),
        config.global_max_tokens,
    ]
    .into_iter()
    .flatten()
    .find(|tokens| *tokens > 0)
    .unwrap_or(DEFAULT_MAX_TOKENS)
}

/// Switch to the first complete provider when the active one is incomplete
///
/// The configuration is returned unchanged if the active provider is ready or if no
/// provider is.
pub fn select_available_provider(config: &LlmConfig) -> LlmConfig {
    if is_provider_configuration_complete(config, config.provider) {
        return config.clone();
    }
    match list_available_providers(config).first() {
        Some(provider) => config.with_provider(*provider),
        None => config.clone(),
    }
}

/// Pre-flight message for a provider missing its key or model
pub fn incomplete_configuration_message(provider: Provider) -> String {
    format!(
        "{} is not fully configured. Please check your settings.",
        provider.display_name()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GoogleConfig, OpenAiConfig};

    fn persisted() -> LlmConfig {
        LlmConfig {
            provider: Provider::OpenAI,
            use_environment_overrides: true,
            global_max_tokens: None,
            openai: OpenAiConfig {
                api_key: "persisted-openai".to_string(),
                base_url: Some("https://proxy.example.com/v1".to_string()),
                model: "gpt-4o".to_string(),
                max_tokens: Some(1000),
            },
            google: GoogleConfig {
                api_key: "persisted-google".to_string(),
                model: "gemini-1.5-flash".to_string(),
                max_tokens: None,
            },
        }
    }

    fn full_env() -> EnvSnapshot {
        [
            ("OPENAI_API_KEY", "env-openai"),
            ("OPENAI_BASE_URL", "http://localhost:8080/v1"),
            ("OPENAI_MODEL", "gpt-4o-mini"),
            ("OPENAI_MAX_TOKENS", "2500"),
            ("GOOGLE_API_KEY", "env-google"),
            ("GOOGLE_MODEL", "gemini-2.0-flash"),
            ("GOOGLE_MAX_TOKENS", "3500"),
            ("LLM_MAX_TOKENS", "6000"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_overrides_disabled_returns_input() {
        let mut config = persisted();
        config.use_environment_overrides = false;

        assert_eq!(resolve_effective_config(&config, &full_env()), config);
    }

    #[test]
    fn test_env_values_win_for_active_provider() {
        let resolved = resolve_effective_config(&persisted(), &full_env());

        assert_eq!(resolved.openai.api_key, "env-openai");
        assert_eq!(
            resolved.openai.base_url.as_deref(),
            Some("http://localhost:8080/v1")
        );
        assert_eq!(resolved.openai.model, "gpt-4o-mini");
        assert_eq!(resolved.openai.max_tokens, Some(2500));
        assert_eq!(resolved.global_max_tokens, Some(6000));
        // inactive provider untouched
        assert_eq!(resolved.google, persisted().google);
    }

    #[test]
    fn test_google_overlay() {
        let config = persisted().with_provider(Provider::Google);
        let resolved = resolve_effective_config(&config, &full_env());

        assert_eq!(resolved.google.api_key, "env-google");
        assert_eq!(resolved.google.model, "gemini-2.0-flash");
        assert_eq!(resolved.google.max_tokens, Some(3500));
        assert_eq!(resolved.openai, persisted().openai);
    }

    #[test]
    fn test_empty_env_values_preserve_persisted() {
        let env: EnvSnapshot = [
            ("OPENAI_API_KEY", ""),
            ("OPENAI_MODEL", ""),
            ("OPENAI_MAX_TOKENS", "not-a-number"),
            ("LLM_MAX_TOKENS", ""),
        ]
        .into_iter()
        .collect();

        let resolved = resolve_effective_config(&persisted(), &env);
        assert_eq!(resolved, persisted());
    }

    #[test]
    fn test_resolution_does_not_mutate_input() {
        let config = persisted();
        let before = config.clone();
        let _ = resolve_effective_config(&config, &full_env());
        assert_eq!(config, before);
    }

    #[test]
    fn test_completeness() {
        let mut config = persisted();
        assert!(is_provider_configuration_complete(&config, Provider::OpenAI));

        config.openai.api_key.clear();
        assert!(!is_provider_configuration_complete(&config, Provider::OpenAI));

        config.google.model.clear();
        assert!(!is_provider_configuration_complete(&config, Provider::Google));
        assert!(list_available_providers(&config).is_empty());
    }

    #[test]
    fn test_completeness_ignores_environment() {
        let mut config = persisted();
        config.openai.api_key.clear();
        // resolving would fill the key in, but the raw check must still say no
        assert!(!is_provider_configuration_complete(&config, Provider::OpenAI));
        assert!(is_provider_configuration_complete(
            &resolve_effective_config(&config, &full_env()),
            Provider::OpenAI
        ));
    }

    #[test]
    fn test_available_providers_order() {
        assert_eq!(
            list_available_providers(&persisted()),
            vec![Provider::OpenAI, Provider::Google]
        );

        let mut config = persisted();
        config.openai.model.clear();
        assert_eq!(list_available_providers(&config), vec![Provider::Google]);
    }

    #[test]
    fn test_max_tokens_precedence() {
        let mut config = persisted();
        config.openai.max_tokens = Some(200);
        config.global_max_tokens = Some(300);

        assert_eq!(
            resolve_effective_max_tokens(&config, Provider::OpenAI, Some(100)),
            100
        );
        assert_eq!(
            resolve_effective_max_tokens(&config, Provider::OpenAI, None),
            200
        );

        config.openai.max_tokens = None;
        assert_eq!(
            resolve_effective_max_tokens(&config, Provider::OpenAI, None),
            300
        );

        config.global_max_tokens = None;
        assert_eq!(
            resolve_effective_max_tokens(&config, Provider::OpenAI, None),
            DEFAULT_MAX_TOKENS
        );
    }

    #[test]
    fn test_max_tokens_zero_is_unset() {
        let mut config = persisted();
        config.openai.max_tokens = Some(0);
        config.global_max_tokens = Some(700);

        assert_eq!(
            resolve_effective_max_tokens(&config, Provider::OpenAI, Some(0)),
            700
        );
    }

    #[test]
    fn test_max_tokens_uses_requested_provider() {
        let config = persisted();
        assert_eq!(
            resolve_effective_max_tokens(&config, Provider::Google, None),
            DEFAULT_MAX_TOKENS
        );
    }

    #[test]
    fn test_select_available_provider() {
        let mut config = persisted();
        config.openai.api_key.clear();
        assert_eq!(select_available_provider(&config).provider, Provider::Google);

        config.google.api_key.clear();
        assert_eq!(select_available_provider(&config).provider, Provider::OpenAI);

        assert_eq!(select_available_provider(&persisted()), persisted());
    }

    #[test]
    fn test_incomplete_message_names_provider() {
        assert_eq!(
            incomplete_configuration_message(Provider::Google),
            "Google is not fully configured. Please check your settings."
        );
    }
}
