use repo_architect::load_config::{apply_env, load_config};
use repo_architect_core::config::{AcquisitionStrategy, AnalyzerConfig, DEFAULT_GEMINI_MODEL};
use serial_test::serial;
use std::collections::HashMap;
use std::env;
use std::fs::write;
use tempfile::NamedTempFile;

const ENV_KEYS: &[&str] = &[
    "GITHUB_TOKEN",
    "GEMINI_API_KEY",
    "GOOGLE_API_KEY",
    "GEMINI_MODEL",
    "GEMINI_FALLBACK_MODEL",
    "OPENAI_API_KEY",
];

fn clear_env() {
    for key in ENV_KEYS {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn loads_yaml_settings_and_env_secrets() {
    clear_env();
    let config_yaml = r#"
strategy: clone_walk
api_base_url: "https://git.example.com/api/v3"
narrative:
  openai_model: gpt-4o-mini
  char_budget: 1200
"#;
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), config_yaml).unwrap();

    env::set_var("GITHUB_TOKEN", "ghp_test");
    env::set_var("OPENAI_API_KEY", "sk-test");

    let config = load_config(Some(config_file.path())).expect("Config should load");
    clear_env();

    assert_eq!(config.strategy, AcquisitionStrategy::CloneWalk);
    assert_eq!(
        config.api_base_url.as_deref(),
        Some("https://git.example.com/api/v3")
    );
    assert_eq!(config.narrative.openai_model, "gpt-4o-mini");
    assert_eq!(config.narrative.char_budget, 1200);
    // Unset fields keep their defaults.
    assert_eq!(config.narrative.gemini_model, DEFAULT_GEMINI_MODEL);
    assert_eq!(config.narrative.timeout_secs, 30);

    assert_eq!(config.default_access_token.as_deref(), Some("ghp_test"));
    assert_eq!(config.narrative.openai_api_key.as_deref(), Some("sk-test"));
    assert!(config.narrative.gemini_api_key.is_none());
}

#[test]
#[serial]
fn no_file_means_defaults() {
    clear_env();
    let config = load_config(None).expect("Defaults should load");
    assert_eq!(config.strategy, AcquisitionStrategy::ApiTree);
    assert!(config.api_base_url.is_none());
    assert!(config.default_access_token.is_none());
    assert_eq!(config.narrative.provider_name(), "none");
}

#[test]
#[serial]
fn empty_file_means_defaults() {
    clear_env();
    let config_file = NamedTempFile::new().expect("temp file");
    let config = load_config(Some(config_file.path())).expect("Empty file should load");
    assert_eq!(config.strategy, AcquisitionStrategy::ApiTree);
}

#[test]
#[serial]
fn errors_for_invalid_yaml() {
    clear_env();
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), b"strategy: [:::").unwrap();

    let err = load_config(Some(config_file.path())).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("parse") || msg.contains("YAML"), "Parse error expected, got: {msg}");
}

#[test]
#[serial]
fn errors_for_unknown_strategy() {
    clear_env();
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), b"strategy: carrier_pigeon\n").unwrap();
    assert!(load_config(Some(config_file.path())).is_err());
}

#[test]
#[serial]
fn errors_for_missing_file() {
    clear_env();
    let err = load_config(Some(std::path::Path::new("/definitely/not/here.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn env_overlay_prefers_gemini_key_and_ignores_blanks() {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("GITHUB_TOKEN", "   "),
        ("GOOGLE_API_KEY", "google"),
        ("GEMINI_MODEL", "gemini-custom"),
        ("GEMINI_FALLBACK_MODEL", ""),
    ]);
    let config = apply_env(AnalyzerConfig::default(), |k| {
        vars.get(k).map(|v| v.to_string())
    });

    assert!(config.default_access_token.is_none());
    assert_eq!(config.narrative.gemini_api_key.as_deref(), Some("google"));
    assert_eq!(config.narrative.gemini_model, "gemini-custom");
    assert_eq!(config.narrative.provider_name(), "gemini");

    let both = HashMap::from([("GEMINI_API_KEY", "gemini"), ("GOOGLE_API_KEY", "google")]);
    let config = apply_env(AnalyzerConfig::default(), |k| both.get(k).map(|v| v.to_string()));
    assert_eq!(config.narrative.gemini_api_key.as_deref(), Some("gemini"));
}
