use specsmith::commands::{ConfigChanges, Session, handle_config_command};
use specsmith::settings::SettingsStore;
use specsmith::{
    EnvSnapshot, Provider, is_provider_configuration_complete, list_available_providers,
    resolve_effective_config,
};
use std::fs;
use tempfile::TempDir;

fn temp_store() -> (TempDir, SettingsStore) {
    let dir = TempDir::new().expect("Failed to create temporary directory");
    let store = SettingsStore::at(dir.path().join("nested").join("llm.toml"));
    (dir, store)
}

#[test]
fn test_config_command_persists_changes_without_environment_values() {
    let (_dir, store) = temp_store();
    let env = EnvSnapshot::empty().with("OPENAI_API_KEY", "sk-from-env");
    let session = Session::with_env(store.clone(), env, Some(Provider::Google))
        .expect("session should open");

    let changes = ConfigChanges {
        activate: true,
        api_key: Some("g-key".to_string()),
        model: Some("gemini-1.5-pro".to_string()),
        ..ConfigChanges::default()
    };
    handle_config_command(&session, &changes).expect("config command should succeed");

    let written = fs::read_to_string(store.path()).expect("settings file should exist");
    assert!(!written.contains("sk-from-env"));

    let reloaded = store.load(&EnvSnapshot::empty()).expect("settings should load");
    assert_eq!(reloaded.provider, Provider::Google);
    assert_eq!(reloaded.google.api_key, "g-key");
    assert_eq!(reloaded.google.model, "gemini-1.5-pro");
    assert!(reloaded.openai.api_key.is_empty());
}

#[test]
fn test_config_command_edits_saved_provider_not_call_fallback() {
    let (_dir, store) = temp_store();
    let env = EnvSnapshot::empty().with("GOOGLE_API_KEY", "g-env");
    let session = Session::with_env(store.clone(), env, None).expect("session should open");

    // OpenAI is saved as active but has no key, so calls fall back to Google
    assert_eq!(session.saved.provider, Provider::OpenAI);
    assert_eq!(session.config.provider, Provider::Google);

    let changes = ConfigChanges {
        api_key: Some("sk-openai".to_string()),
        ..ConfigChanges::default()
    };
    handle_config_command(&session, &changes).expect("config command should succeed");

    let reloaded = store.load(&EnvSnapshot::empty()).expect("settings should load");
    assert_eq!(reloaded.provider, Provider::OpenAI);
    assert_eq!(reloaded.openai.api_key, "sk-openai");
    assert!(reloaded.google.api_key.is_empty());
}

#[test]
fn test_saved_settings_win_over_environment_defaults() {
    let (_dir, store) = temp_store();
    fs::create_dir_all(store.path().parent().expect("has parent")).expect("create dir");
    fs::write(
        store.path(),
        "provider = \"google\"\n\n[google]\napiKey = \"saved-key\"\n",
    )
    .expect("write settings");

    let env = EnvSnapshot::empty()
        .with("GOOGLE_API_KEY", "env-key")
        .with("OPENAI_API_KEY", "sk-env");
    let config = store.load(&env).expect("settings should load");

    assert_eq!(config.provider, Provider::Google);
    assert_eq!(config.google.api_key, "saved-key");
    assert_eq!(config.google.model, Provider::Google.default_model());
    assert_eq!(config.openai.api_key, "sk-env");
    assert_eq!(
        list_available_providers(&config),
        vec![Provider::OpenAI, Provider::Google]
    );

    // Overrides are on by default, so the environment wins at call time
    let effective = resolve_effective_config(&config, &env);
    assert_eq!(effective.google.api_key, "env-key");
}

#[test]
fn test_incomplete_settings_are_detected_before_resolution() {
    let (_dir, store) = temp_store();
    let config = store
        .load(&EnvSnapshot::empty())
        .expect("missing file loads defaults");

    assert!(!is_provider_configuration_complete(&config, config.provider));
    assert!(list_available_providers(&config).is_empty());
}
