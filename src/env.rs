//! Environment snapshot consumed by configuration resolution.
//!
//! Resolution never reads the process environment directly; callers capture the
//! relevant variables once and pass the snapshot along.

use std::collections::HashMap;

/// Base URL override for OpenAI-compatible endpoints
pub const OPENAI_BASE_URL_ENV: &str = "OPENAI_BASE_URL";
/// Global token ceiling applied to whichever provider is active
pub const GLOBAL_MAX_TOKENS_ENV: &str = "LLM_MAX_TOKENS";
/// Provider selected when no settings exist yet
pub const DEFAULT_PROVIDER_ENV: &str = "DEFAULT_LLM_PROVIDER";

/// Every variable the resolver understands
pub const KNOWN_VARIABLES: &[&str] = &[
    "OPENAI_API_KEY",
    OPENAI_BASE_URL_ENV,
    "OPENAI_MODEL",
    "OPENAI_MAX_TOKENS",
    "GOOGLE_API_KEY",
    "GOOGLE_MODEL",
    "GOOGLE_MAX_TOKENS",
    GLOBAL_MAX_TOKENS_ENV,
    DEFAULT_PROVIDER_ENV,
];

/// Immutable view of environment variables at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    /// An empty snapshot, i.e. no overrides at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// Capture the known variables from the current process
    pub fn from_process() -> Self {
        KNOWN_VARIABLES
            .iter()
            .filter_map(|name| std::env::var(name).ok().map(|value| (*name, value)))
            .collect()
    }

    /// Non-empty value of a variable
    ///
    /// Unset and empty variables are indistinguishable here: both mean "no override".
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Positive integer value of a variable, ignoring anything unparseable
    pub fn get_positive(&self, name: &str) -> Option<u32> {
        self.get(name)
            .and_then(|value| value.trim().parse::<u32>().ok())
            .filter(|value| *value > 0)
    }

    /// Return a copy with one more variable set
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl<K, V> FromIterator<(K, V)> for EnvSnapshot
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
