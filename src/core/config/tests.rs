use super::data::{Config, Transport};
use super::defaults::{
    Settings, SettingsOverrides, DEFAULT_COPY_FEEDBACK_MS, DEFAULT_ENDPOINT, DEFAULT_MODEL,
};
use super::io::ConfigError;
use super::orchestrator::ConfigStore;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_load_nonexistent_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nonexistent_config.toml");

    let config = Config::load_from_path(&config_path).expect("Failed to load config");

    assert_eq!(config, Config::default());
}

#[test]
fn test_config_persistence_lifecycle() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = ConfigStore::new(temp_dir.path().join("nested").join("config.toml"));

    store
        .mutate(|config| {
            config.set_value("model", "davinci")?;
            config.set_value("transport", "openai-completions")?;
            config.set_value("openai.max_tokens", "256")?;
            Ok(())
        })
        .expect("mutate failed");

    let loaded = store.load().expect("load failed");
    assert_eq!(loaded.model.as_deref(), Some("davinci"));
    assert_eq!(loaded.transport, Some(Transport::OpenaiCompletions));
    assert_eq!(loaded.openai.max_tokens, Some(256));

    store
        .mutate(|config| {
            config.unset_value("model")?;
            Ok(())
        })
        .expect("unset failed");
    let loaded = store.load().expect("reload failed");
    assert_eq!(loaded.model, None);
    assert_eq!(loaded.transport, Some(Transport::OpenaiCompletions));
}

#[test]
fn failed_mutation_leaves_file_untouched() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = ConfigStore::new(temp_dir.path().join("config.toml"));

    let result = store.mutate(|config| {
        config.set_value("copy-feedback-ms", "soon")?;
        Ok(())
    });
    assert!(result.is_err());
    assert!(!store.path().exists());
}

#[test]
fn invalid_toml_reports_parse_error_with_path() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "model = [").expect("write");

    let err = Config::load_from_path(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().starts_with("Failed to parse config at"));
}

#[test]
fn unknown_keys_are_rejected() {
    let mut config = Config::default();
    let err = config.set_value("theme", "dark").unwrap_err();
    assert!(err.contains("unknown config key 'theme'"));
    assert!(config.unset_value("colour").is_err());
}

#[test]
fn toggles_accept_on_and_off() {
    let mut config = Config::default();
    config
        .set_value("syntax-highlighting", "off")
        .expect("toggle");
    assert_eq!(config.syntax_highlighting, Some(false));
    assert!(config.set_value("syntax-highlighting", "maybe").is_err());
}

#[test]
fn defaults_apply_when_nothing_is_configured() {
    let settings = Settings::default();
    assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
    assert_eq!(settings.model, DEFAULT_MODEL);
    assert_eq!(settings.transport, Transport::Proxy);
    assert_eq!(
        settings.copy_feedback,
        Duration::from_millis(DEFAULT_COPY_FEEDBACK_MS)
    );
    assert!(settings.syntax_highlighting);
}

#[test]
fn overrides_beat_env_which_beats_file() {
    let config = Config {
        endpoint: Some("http://file".into()),
        model: Some("file-model".into()),
        ..Default::default()
    };
    let env = |name: &str| match name {
        "DIYBOT_ENDPOINT" => Some("http://env".to_string()),
        "DIYBOT_MODEL" => Some("   ".to_string()),
        _ => None,
    };

    let from_env = config.resolve_with(&SettingsOverrides::default(), env);
    assert_eq!(from_env.endpoint, "http://env");
    assert_eq!(from_env.model, "file-model");

    let overrides = SettingsOverrides {
        endpoint: Some("http://flag".into()),
        model: None,
        transport: Some(Transport::OpenaiCompletions),
    };
    let from_flags = config.resolve_with(&overrides, env);
    assert_eq!(from_flags.endpoint, "http://flag");
    assert_eq!(from_flags.transport, Transport::OpenaiCompletions);
}

#[test]
fn transport_parses_from_cli_spelling() {
    assert_eq!("proxy".parse::<Transport>(), Ok(Transport::Proxy));
    assert_eq!(
        "OpenAI-Completions".parse::<Transport>(),
        Ok(Transport::OpenaiCompletions)
    );
    assert!("grpc".parse::<Transport>().is_err());
}

#[test]
fn summary_lists_stored_and_effective_values() {
    let config = Config {
        display_name: Some("Davinci".into()),
        ..Default::default()
    };
    let settings = config.resolve_with(&SettingsOverrides::default(), |_| None);
    let summary = config.render_summary(&settings);
    assert!(summary.contains("display-name: Davinci (effective: Davinci)"));
    assert!(summary.contains("model: (unset) (effective: text-davinci-002)"));
}
