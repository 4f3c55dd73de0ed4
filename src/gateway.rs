//! Single entry point for LLM calls.
//!
//! The gateway resolves the effective configuration against its environment
//! snapshot, picks the adapter registered for the active provider and gives callers
//! one error shape regardless of which provider answered.

use crate::adapters::{
    ConnectionTestResult, GenerationRequest, GenerationResult, GoogleAdapter, OpenAiAdapter,
    ProviderAdapter,
};
use crate::config::LlmConfig;
use crate::env::EnvSnapshot;
use crate::error::GatewayError;
use crate::log_debug;
use crate::providers::Provider;
use crate::resolver::resolve_effective_config;

use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;

/// Adapter registry plus the environment used for resolution
///
/// Holds no per-call state, so one gateway can serve concurrent calls with
/// different configurations.
#[derive(Clone)]
pub struct LlmGateway {
    adapters: HashMap<Provider, Arc<dyn ProviderAdapter>>,
    env: EnvSnapshot,
}

impl LlmGateway {
    /// Gateway with both built-in adapters sharing one HTTP client
    pub fn new(env: EnvSnapshot) -> Self {
        Self::builder(env).with_default_adapters(Client::new()).build()
    }

    pub fn builder(env: EnvSnapshot) -> LlmGatewayBuilder {
        LlmGatewayBuilder {
            adapters: HashMap::new(),
            env,
        }
    }

    pub fn env(&self) -> &EnvSnapshot {
        &self.env
    }

    /// Configuration as the adapters will see it
    pub fn effective_config(&self, config: &LlmConfig) -> LlmConfig {
        resolve_effective_config(config, &self.env)
    }

    /// Adapter registered for a provider
    pub fn select_adapter(
        &self,
        provider: Provider,
    ) -> Result<Arc<dyn ProviderAdapter>, GatewayError> {
        self.adapters
            .get(&provider)
            .cloned()
            .ok_or(GatewayError::UnsupportedProvider(provider))
    }

    /// Generate text with the request's active provider
    #[tracing::instrument(skip_all, fields(provider = %request.config.provider))]
    pub async fn generate_text(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResult, GatewayError> {
        let provider = request.config.provider;
        let adapter = self.select_adapter(provider)?;
        log_debug!("Generating text using provider: {}", provider);

        let request = GenerationRequest {
            config: self.effective_config(&request.config),
            ..request
        };
        Ok(adapter.generate_text(&request).await?)
    }

    /// Probe the active provider; failures come back inside the result
    #[tracing::instrument(skip_all, fields(provider = %config.provider))]
    pub async fn test_connection(&self, config: &LlmConfig) -> ConnectionTestResult {
        let adapter = match self.select_adapter(config.provider) {
            Ok(adapter) => adapter,
            Err(e) => return ConnectionTestResult::failed(e.to_string()),
        };
        log_debug!("Testing connection for provider: {}", config.provider);

        adapter
            .test_connection(&self.effective_config(config))
            .await
    }
}

impl std::fmt::Debug for LlmGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut providers: Vec<&str> = self.adapters.keys().map(|p| p.name()).collect();
        providers.sort_unstable();
        f.debug_struct("LlmGateway")
            .field("providers", &providers)
            .finish_non_exhaustive()
    }
}

/// Builder for [`LlmGateway`]
pub struct LlmGatewayBuilder {
    adapters: HashMap<Provider, Arc<dyn ProviderAdapter>>,
    env: EnvSnapshot,
}

impl LlmGatewayBuilder {
    /// Register the built-in OpenAI and Google adapters
    #[must_use]
    pub fn with_default_adapters(self, client: Client) -> Self {
        self.with_adapter(OpenAiAdapter::new(client.clone()))
            .with_adapter(GoogleAdapter::new(client))
    }

    /// Register an adapter under the provider it reports, replacing any previous one
    #[must_use]
    pub fn with_adapter(mut self, adapter: impl ProviderAdapter + 'static) -> Self {
        self.adapters.insert(adapter.provider(), Arc::new(adapter));
        self
    }

    pub fn build(self) -> LlmGateway {
        LlmGateway {
            adapters: self.adapters,
            env: self.env,
        }
    }
}
