use crate::adapters::GenerationRequest;
use crate::config::LlmConfig;
use crate::env::EnvSnapshot;
use crate::gateway::LlmGateway;
use crate::providers::Provider;
use crate::resolver::{
    incomplete_configuration_message, is_provider_configuration_complete,
    list_available_providers, resolve_effective_max_tokens, select_available_provider,
};
use crate::settings::SettingsStore;
use crate::specgen::{QuestionKind, SpecGenerator};
use crate::{log_debug, log_info, log_warn};

use anyhow::{Context, Result, bail};
use colored::Colorize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything a command needs: where settings live, what they say, and a gateway
pub struct Session {
    pub store: SettingsStore,
    /// Saved settings over built-in defaults, with no environment values mixed in
    pub saved: LlmConfig,
    /// Configuration used for LLM calls in this run
    pub config: LlmConfig,
    pub gateway: LlmGateway,
    provider_override: Option<Provider>,
}

impl Session {
    pub fn open(settings: Option<PathBuf>, provider: Option<Provider>) -> Result<Self> {
        let store = match settings {
            Some(path) => SettingsStore::at(path),
            None => SettingsStore::default_location()?,
        };
        Self::with_env(store, EnvSnapshot::from_process(), provider)
    }

    /// Session over an explicit environment snapshot
    pub fn with_env(
        store: SettingsStore,
        env: EnvSnapshot,
        provider: Option<Provider>,
    ) -> Result<Self> {
        let saved = match store.load_raw()? {
            Some(raw) => LlmConfig::from_env(&EnvSnapshot::empty()).merge_saved(raw)?,
            None => LlmConfig::from_env(&EnvSnapshot::empty()),
        };

        let mut config = store
            .load(&env)
            .with_context(|| format!("Failed to load settings from {}", store.path().display()))?;
        match provider {
            Some(provider) => config = config.with_provider(provider),
            None => {
                let selected = select_available_provider(&config);
                if selected.provider != config.provider {
                    log_warn!(
                        "{} is not configured, using {} instead",
                        config.provider.display_name(),
                        selected.provider.display_name()
                    );
                }
                config = selected;
            }
        }

        Ok(Self {
            store,
            saved,
            config,
            gateway: LlmGateway::new(env),
            provider_override: provider,
        })
    }

    /// Provider whose saved settings a command edits
    ///
    /// The fallback picked for LLM calls never applies here: without `--provider`
    /// this is the saved active provider.
    pub fn target_provider(&self) -> Provider {
        self.provider_override.unwrap_or(self.saved.provider)
    }
}

/// Requested changes from the `config` command
#[derive(Debug, Default)]
pub struct ConfigChanges {
    pub activate: bool,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub global_max_tokens: Option<u32>,
    pub use_env: Option<bool>,
}

/// Apply configuration changes for one provider
/// Returns true if any changes were made
pub fn apply_config_changes(
    config: &mut LlmConfig,
    provider: Provider,
    changes: &ConfigChanges,
) -> Result<bool> {
    let mut changes_made = false;

    if changes.activate && config.provider != provider {
        config.provider = provider;
        changes_made = true;
    }

    if let Some(use_env) = changes.use_env
        && config.use_environment_overrides != use_env
    {
        config.use_environment_overrides = use_env;
        changes_made = true;
    }

    if let Some(limit) = changes.global_max_tokens {
        let limit = (limit > 0).then_some(limit);
        if config.global_max_tokens != limit {
            config.global_max_tokens = limit;
            changes_made = true;
        }
    }

    if changes.base_url.is_some() && provider != Provider::OpenAI {
        bail!(
            "A base URL can only be set for {}",
            Provider::OpenAI.display_name()
        );
    }

    let max_tokens = changes.max_tokens.map(|limit| (limit > 0).then_some(limit));

    match provider {
        Provider::OpenAI => {
            let section = &mut config.openai;
            changes_made |= replace_if_changed(&mut section.api_key, changes.api_key.as_ref());
            changes_made |= replace_if_changed(&mut section.model, changes.model.as_ref());
            if let Some(url) = &changes.base_url {
                let url = (!url.is_empty()).then(|| url.clone());
                if section.base_url != url {
                    section.base_url = url;
                    changes_made = true;
                }
            }
            if let Some(limit) = max_tokens
                && section.max_tokens != limit
            {
                section.max_tokens = limit;
                changes_made = true;
            }
        }
        Provider::Google => {
            let section = &mut config.google;
            changes_made |= replace_if_changed(&mut section.api_key, changes.api_key.as_ref());
            changes_made |= replace_if_changed(&mut section.model, changes.model.as_ref());
            if let Some(limit) = max_tokens
                && section.max_tokens != limit
            {
                section.max_tokens = limit;
                changes_made = true;
            }
        }
    }

    Ok(changes_made)
}

fn replace_if_changed(field: &mut String, value: Option<&String>) -> bool {
    match value {
        Some(value) if field != value => {
            field.clone_from(value);
            true
        }
        _ => false,
    }
}

/// Handle the 'config' command
pub fn handle_config_command(session: &Session, changes: &ConfigChanges) -> Result<()> {
    let provider = session.target_provider();
    log_debug!("Starting 'config' command for provider: {}", provider);
    let mut saved = session.saved.clone();

    if apply_config_changes(&mut saved, provider, changes)? {
        session.store.save(&saved)?;
        println!(
            "{}",
            format!("Settings saved to {}", session.store.path().display()).green()
        );
    }

    print_config(&saved)
}

fn print_config(config: &LlmConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(&config.redacted())?;
    println!("\n{}", "LLM Settings".bright_magenta().bold());
    println!("{}", "─".repeat(40).bright_black());
    print!("{rendered}");
    Ok(())
}

/// Handle the 'providers' command
pub fn handle_providers_command(session: &Session) {
    let config = &session.config;
    let available = list_available_providers(config);

    println!("{}", "LLM Providers".bright_magenta().bold());
    for provider in Provider::ALL {
        let marker = if *provider == config.provider {
            "●".bright_cyan()
        } else {
            "○".bright_black()
        };
        let status = if available.contains(provider) {
            "ready".green()
        } else {
            "not configured".yellow()
        };
        let model = config.model(*provider);
        let model = if model.is_empty() { "-" } else { model };
        println!(
            "  {marker} {:<8} {:<24} {:>5} tokens  {status}",
            provider.display_name().bold(),
            model,
            resolve_effective_max_tokens(config, *provider, None),
        );
    }
}

/// Handle the 'test' command
pub async fn handle_test_command(session: &Session) -> Result<()> {
    let config = &session.config;
    if !is_provider_configuration_complete(config, config.provider) {
        bail!(incomplete_configuration_message(config.provider));
    }

    log_info!("Testing connection to {}", config.provider);
    let result = session.gateway.test_connection(config).await;
    if result.success {
        println!(
            "{} {}",
            "✓".green(),
            result.message.unwrap_or_default().green()
        );
        Ok(())
    } else {
        bail!(
            "Connection test failed: {}",
            result.error.unwrap_or_else(|| "unknown error".to_string())
        )
    }
}

/// Handle the 'generate' command
pub async fn handle_generate_command(
    session: &Session,
    prompt: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
) -> Result<()> {
    let mut request = GenerationRequest::new(prompt, session.config.clone());
    if let Some(temperature) = temperature {
        request = request.temperature(temperature);
    }
    if let Some(max_tokens) = max_tokens {
        request = request.max_tokens(max_tokens);
    }

    let result = session.gateway.generate_text(request).await?;
    println!("{}", result.text);
    Ok(())
}

/// Handle the 'questions' command
pub async fn handle_questions_command(
    session: &Session,
    feature: &str,
    context_file: Option<&Path>,
) -> Result<()> {
    let repo_context = read_context(context_file)?;
    let generator = SpecGenerator::new(&session.gateway, session.config.clone());
    let questions = generator
        .follow_up_questions(feature, repo_context.as_deref())
        .await?;

    println!("{}", "Follow-up questions".bright_magenta().bold());
    for question in &questions {
        let required = if question.required.unwrap_or(false) {
            " *".red().to_string()
        } else {
            String::new()
        };
        println!(
            "  {} {}{}",
            question.id.bright_cyan(),
            question.label,
            required
        );
        if question.kind == QuestionKind::Select
            && let Some(options) = &question.options
        {
            println!("      {}", options.join(" | ").bright_black());
        }
    }
    println!(
        "\n{}",
        "Answer with: specsmith spec \"<feature>\" --answer <id>=<answer>".bright_black()
    );
    Ok(())
}

/// Handle the 'spec' command
pub async fn handle_spec_command(
    session: &Session,
    feature: &str,
    answers: &BTreeMap<String, String>,
    context_file: Option<&Path>,
    out: &Path,
) -> Result<()> {
    let repo_context = read_context(context_file)?;
    let generator = SpecGenerator::new(&session.gateway, session.config.clone());
    let specifications = generator
        .specifications(feature, answers, repo_context.as_deref())
        .await?;

    fs::create_dir_all(out)
        .with_context(|| format!("Failed to create output directory {}", out.display()))?;
    for (name, content) in specifications.documents() {
        let path = out.join(name);
        fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{} {}", "✓".green(), path.display());
    }
    Ok(())
}

fn read_context(path: Option<&Path>) -> Result<Option<String>> {
    path.map(|path| {
        fs::read_to_string(path)
            .with_context(|| format!("Failed to read context file {}", path.display()))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_apply_changes_to_target_provider() {
        let mut config = LlmConfig::from_env(&EnvSnapshot::empty());
        let changes = ConfigChanges {
            activate: true,
            api_key: Some("g-key".to_string()),
            max_tokens: Some(512),
            ..ConfigChanges::default()
        };

        let changed = apply_config_changes(&mut config, Provider::Google, &changes)
            .expect("changes should apply");

        assert!(changed);
        assert_eq!(config.provider, Provider::Google);
        assert_eq!(config.google.api_key, "g-key");
        assert_eq!(config.google.max_tokens, Some(512));
        assert!(config.openai.api_key.is_empty());
    }

    #[test]
    fn test_apply_identical_values_is_no_change() {
        let mut config = LlmConfig::from_env(&EnvSnapshot::empty());
        let changes = ConfigChanges {
            model: Some(Provider::OpenAI.default_model().to_string()),
            ..ConfigChanges::default()
        };
        assert!(!apply_config_changes(&mut config, Provider::OpenAI, &changes).expect("applies"));
    }

    #[test]
    fn test_zero_clears_token_limits() {
        let mut config = LlmConfig::from_env(&EnvSnapshot::empty());
        config.global_max_tokens = Some(1000);
        config.openai.max_tokens = Some(200);
        let changes = ConfigChanges {
            max_tokens: Some(0),
            global_max_tokens: Some(0),
            ..ConfigChanges::default()
        };

        assert!(apply_config_changes(&mut config, Provider::OpenAI, &changes).expect("applies"));
        assert_eq!(config.global_max_tokens, None);
        assert_eq!(config.openai.max_tokens, None);
    }

    #[test]
    fn test_base_url_rejected_for_google() {
        let mut config = LlmConfig::from_env(&EnvSnapshot::empty());
        let changes = ConfigChanges {
            base_url: Some("http://localhost:8080".to_string()),
            ..ConfigChanges::default()
        };
        assert!(apply_config_changes(&mut config, Provider::Google, &changes).is_err());
    }

    #[test]
    fn test_session_keeps_environment_out_of_saved_settings() {
        let dir = TempDir::new().expect("Failed to create temporary directory");
        let store = SettingsStore::at(dir.path().join("llm.toml"));
        let env = EnvSnapshot::empty().with("OPENAI_API_KEY", "sk-from-env");

        let session = Session::with_env(store, env, Some(Provider::Google))
            .expect("session should open");

        assert_eq!(session.config.openai.api_key, "sk-from-env");
        assert_eq!(session.config.provider, Provider::Google);
        assert!(session.saved.openai.api_key.is_empty());
        assert_eq!(session.target_provider(), Provider::Google);
    }

    #[test]
    fn test_session_falls_back_to_configured_provider() {
        let dir = TempDir::new().expect("Failed to create temporary directory");
        let store = SettingsStore::at(dir.path().join("llm.toml"));
        let env = EnvSnapshot::empty().with("GOOGLE_API_KEY", "g-from-env");

        let session = Session::with_env(store, env, None).expect("session should open");

        assert_eq!(session.config.provider, Provider::Google);
        assert_eq!(session.saved.provider, Provider::OpenAI);
        assert_eq!(session.target_provider(), Provider::OpenAI);
    }

    #[test]
    fn test_read_context() {
        let dir = TempDir::new().expect("Failed to create temporary directory");
        let path = dir.path().join("context.md");
        fs::write(&path, "src/main.rs").expect("write context");

        assert_eq!(
            read_context(Some(&path)).expect("readable"),
            Some("src/main.rs".to_string())
        );
        assert_eq!(read_context(None).expect("nothing to read"), None);
        assert!(read_context(Some(&dir.path().join("missing.md"))).is_err());
    }
}
