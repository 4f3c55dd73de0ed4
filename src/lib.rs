//! Specsmith - LLM-backed feature specification writer
//!
//! The library side is a small provider abstraction: configuration resolution
//! against an environment snapshot, adapters for OpenAI-compatible and Google
//! Gemini endpoints, and a gateway that routes calls to the active provider.

// Allow certain clippy warnings that are stylistic
#![allow(clippy::uninlined_format_args)] // Style preference
#![allow(clippy::format_push_string)] // Prompt builders read better this way
#![allow(clippy::return_self_not_must_use)] // Builder pattern is clear enough
#![allow(clippy::missing_errors_doc)]

pub mod adapters;
pub mod cli;
pub mod commands;
pub mod config;
pub mod env;
pub mod error;
pub mod gateway;
pub mod logger;
pub mod providers;
pub mod resolver;
pub mod settings;
pub mod specgen;

// Re-export important structs and functions for easier testing
pub use adapters::{ConnectionTestResult, GenerationRequest, GenerationResult, ProviderAdapter};
pub use config::{GoogleConfig, LlmConfig, OpenAiConfig};
pub use env::EnvSnapshot;
pub use error::{GatewayError, LlmError, MissingField, ProviderFailure};
pub use gateway::{LlmGateway, LlmGatewayBuilder};
pub use providers::Provider;
pub use resolver::{
    is_provider_configuration_complete, list_available_providers, resolve_effective_config,
    resolve_effective_max_tokens,
};
