//! Persisted LLM settings.
//!
//! The settings file is a TOML rendering of [`LlmConfig`]. Loading layers the saved
//! document over the environment-derived defaults, so a partially written file still
//! yields a complete configuration.

use crate::config::LlmConfig;
use crate::env::EnvSnapshot;
use crate::log_debug;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory name under the platform config dir
const SETTINGS_DIR: &str = "specsmith";
/// Settings filename
pub const SETTINGS_FILENAME: &str = "llm.toml";

/// Errors raised while reading or writing settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Unable to determine config directory")]
    NoConfigDir,
    #[error("Failed to access settings file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid settings file format: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// File-backed store for a single [`LlmConfig`]
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Store at an explicit path
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store in the user's platform config directory
    pub fn default_location() -> Result<Self, SettingsError> {
        let mut path = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        path.push(SETTINGS_DIR);
        path.push(SETTINGS_FILENAME);
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the raw saved document, `None` if nothing has been saved yet
    pub fn load_raw(&self) -> Result<Option<toml::Table>, SettingsError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path).map_err(|source| SettingsError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(toml::from_str(&content)?))
    }

    /// Load the effective settings: environment defaults with the saved document on top
    pub fn load(&self, env: &EnvSnapshot) -> Result<LlmConfig, SettingsError> {
        let defaults = LlmConfig::from_env(env);
        let config = match self.load_raw()? {
            Some(saved) => defaults.merge_saved(saved)?,
            None => defaults,
        };
        log_debug!("Settings loaded from {}", self.path.display());
        Ok(config)
    }

    /// Write the configuration, creating parent directories as needed
    pub fn save(&self, config: &LlmConfig) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = toml::to_string_pretty(config)?;
        fs::write(&self.path, content).map_err(io_err)?;
        log_debug!("Settings saved to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Provider;
    use tempfile::TempDir;

    #[test]
    fn test_load_without_file_uses_env_defaults() {
        let dir = TempDir::new().expect("Failed to create temporary directory");
        let store = SettingsStore::at(dir.path().join("llm.toml"));
        let env = EnvSnapshot::empty().with("GOOGLE_MODEL", "gemini-2.0-flash");

        assert!(store.load_raw().expect("load_raw").is_none());
        let config = store.load(&env).expect("load");
        assert_eq!(config, LlmConfig::from_env(&env));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().expect("Failed to create temporary directory");
        let store = SettingsStore::at(dir.path().join("nested").join("llm.toml"));

        let mut config = LlmConfig::from_env(&EnvSnapshot::empty());
        config.provider = Provider::Google;
        config.google.api_key = "saved-key".to_string();
        config.google.max_tokens = Some(2048);
        config.use_environment_overrides = false;
        store.save(&config).expect("save");

        let loaded = store.load(&EnvSnapshot::empty()).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_is_merged() {
        let dir = TempDir::new().expect("Failed to create temporary directory");
        let path = dir.path().join("llm.toml");
        fs::write(&path, "[openai]\nmodel = \"gpt-4o-mini\"\n").expect("write");

        let env = EnvSnapshot::empty().with("OPENAI_API_KEY", "env-key");
        let config = SettingsStore::at(&path).load(&env).expect("load");
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.openai.api_key, "env-key");
        assert_eq!(config.google.model, "gemini-1.5-flash");
    }

    #[test]
    fn test_invalid_file_reports_parse_error() {
        let dir = TempDir::new().expect("Failed to create temporary directory");
        let path = dir.path().join("llm.toml");
        fs::write(&path, "provider = [").expect("write");

        let err = SettingsStore::at(&path)
            .load(&EnvSnapshot::empty())
            .expect_err("malformed file must fail");
        assert!(matches!(err, SettingsError::Parse(_)));
    }
}
