use crate::commands;
use crate::log_debug;
use crate::providers::Provider;
use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand, crate_version};
use colored::Colorize;
use std::path::PathBuf;

const LOG_FILE: &str = "specsmith-debug.log";

/// CLI structure defining the available commands and global arguments
#[derive(Parser)]
#[command(
    author,
    version = crate_version!(),
    about = "Specsmith: feature specifications from your repository, written by an LLM",
    long_about = "Specsmith drafts follow-up questions and feature specification documents (PLANNING.md, TASK.md, SPECS.md) using OpenAI-compatible or Google Gemini models.",
    after_help = get_dynamic_help(),
    styles = get_styles(),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log debug messages to a file
    #[arg(short = 'l', long = "log", global = true)]
    pub log: bool,

    /// Specify a custom log file path ("-" for stderr)
    #[arg(long = "log-file", global = true)]
    pub log_file: Option<String>,

    /// Use a settings file other than the default one
    #[arg(long = "settings", global = true)]
    pub settings: Option<PathBuf>,

    /// Override the active LLM provider for this run
    #[arg(long = "provider", global = true)]
    pub provider: Option<Provider>,
}

/// Enumeration of available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Show which providers are configured
    #[command(about = "Show provider readiness")]
    Providers,

    /// Show or change LLM settings
    #[command(
        about = "Show or change LLM settings",
        long_about = "Show the current LLM settings (API keys masked), or change them. Changes apply to the provider given with --provider, or to the active provider."
    )]
    Config {
        /// Make the selected provider the active one
        #[arg(long)]
        activate: bool,

        /// Set the API key
        #[arg(long)]
        api_key: Option<String>,

        /// Set the model
        #[arg(long)]
        model: Option<String>,

        /// Set the base URL (OpenAI-compatible providers only)
        #[arg(long)]
        base_url: Option<String>,

        /// Set the provider token ceiling
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Set the global token ceiling
        #[arg(long)]
        global_max_tokens: Option<u32>,

        /// Allow or forbid environment variables to override saved settings
        #[arg(long)]
        use_env: Option<bool>,
    },

    /// Check that the active provider accepts the configured credentials
    #[command(about = "Test the connection to the active provider")]
    Test,

    /// Send a prompt and print the reply
    #[command(about = "Generate text from a prompt")]
    Generate {
        /// Prompt text
        prompt: String,

        /// Sampling temperature (default 0.7)
        #[arg(long)]
        temperature: Option<f32>,

        /// Token ceiling for this call
        #[arg(long)]
        max_tokens: Option<u32>,
    },

    /// Draft follow-up questions for a feature request
    #[command(about = "Generate follow-up questions for a feature request")]
    Questions {
        /// The feature request
        feature: String,

        /// File with repository context to include in the prompt
        #[arg(long)]
        context_file: Option<PathBuf>,
    },

    /// Write PLANNING.md, TASK.md and SPECS.md for a feature
    #[command(about = "Generate specification documents for a feature")]
    Spec {
        /// The feature request
        feature: String,

        /// Answer to a follow-up question (id=answer), repeatable
        #[arg(long = "answer", value_parser = parse_answer)]
        answers: Vec<(String, String)>,

        /// File with repository context to include in the prompt
        #[arg(long)]
        context_file: Option<PathBuf>,

        /// Output directory for the documents
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

/// Parse an `id=answer` pair
fn parse_answer(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected id=answer, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing question id in '{raw}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Define custom styles for Clap
fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Magenta.on_default().bold())
        .usage(AnsiColor::Cyan.on_default().bold())
        .literal(AnsiColor::Green.on_default().bold())
        .placeholder(AnsiColor::Yellow.on_default())
        .valid(AnsiColor::Blue.on_default().bold())
        .invalid(AnsiColor::Red.on_default().bold())
        .error(AnsiColor::Red.on_default().bold())
}

/// Parse the command-line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Generate dynamic help including supported LLM providers
fn get_dynamic_help() -> String {
    let providers_list = Provider::all_names()
        .iter()
        .map(|p| format!("{}", p.bold()))
        .collect::<Vec<_>>()
        .join(" • ");

    format!("\nSupported LLM Providers: {providers_list}")
}

/// Main function to parse arguments and handle the command
pub async fn main() -> anyhow::Result<()> {
    let cli = parse_args();

    if cli.log {
        crate::logger::enable_logging();
        match cli.log_file.as_deref() {
            Some("-") => crate::logger::set_log_to_stderr(true),
            log_file => crate::logger::set_log_file(log_file.unwrap_or(LOG_FILE))?,
        }
    } else {
        crate::logger::disable_logging();
    }

    let Some(command) = cli.command else {
        let _ = Cli::parse_from(["specsmith", "--help"]);
        return Ok(());
    };

    let session = commands::Session::open(cli.settings, cli.provider)?;
    log_debug!("Session opened with settings at {}", session.store.path().display());
    handle_command(command, &session).await
}

/// Dispatch a parsed subcommand
pub async fn handle_command(command: Commands, session: &commands::Session) -> anyhow::Result<()> {
    match command {
        Commands::Providers => {
            commands::handle_providers_command(session);
            Ok(())
        }
        Commands::Config {
            activate,
            api_key,
            model,
            base_url,
            max_tokens,
            global_max_tokens,
            use_env,
        } => commands::handle_config_command(
            session,
            &commands::ConfigChanges {
                activate,
                api_key,
                model,
                base_url,
                max_tokens,
                global_max_tokens,
                use_env,
            },
        ),
        Commands::Test => commands::handle_test_command(session).await,
        Commands::Generate {
            prompt,
            temperature,
            max_tokens,
        } => commands::handle_generate_command(session, prompt, temperature, max_tokens).await,
        Commands::Questions {
            feature,
            context_file,
        } => commands::handle_questions_command(session, &feature, context_file.as_deref()).await,
        Commands::Spec {
            feature,
            answers,
            context_file,
            out,
        } => {
            commands::handle_spec_command(
                session,
                &feature,
                &answers.into_iter().collect(),
                context_file.as_deref(),
                &out,
            )
            .await
        }
    }
}
