//! Builds the [`AnalyzerConfig`] for the CLI.
//!
//! Non-secret settings come from an optional YAML file; credentials and model
//! overrides come from the environment, which wins over the file.
//!
//! Recognised variables: `GITHUB_TOKEN`, `GEMINI_API_KEY` (or `GOOGLE_API_KEY`),
//! `GEMINI_MODEL`, `GEMINI_FALLBACK_MODEL`, `OPENAI_API_KEY`.
//!
//! # Errors
//! Unreadable files and invalid YAML are reported with the offending path.
use anyhow::{Context, Result};
use repo_architect_core::config::AnalyzerConfig;
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub fn load_config(path: Option<&Path>) -> Result<AnalyzerConfig> {
    let config = match path {
        Some(path) => read_yaml(path)?,
        None => {
            info!("No config file given; using defaults");
            AnalyzerConfig::default()
        }
    };
    Ok(apply_env(config, |key| std::env::var(key).ok()))
}

fn read_yaml(path: &Path) -> Result<AnalyzerConfig> {
    info!(config_path = ?path, "Loading configuration from file");
    let content = fs::read_to_string(path)
        .inspect_err(|e| error!(error = ?e, config_path = ?path, "Failed to read config file"))
        .with_context(|| format!("Failed to read config file {path:?}"))?;

    // An empty file is a valid "all defaults" config.
    if content.trim().is_empty() {
        return Ok(AnalyzerConfig::default());
    }
    let config: AnalyzerConfig = serde_yaml::from_str(&content)
        .inspect_err(|e| error!(error = ?e, config_path = ?path, "Failed to parse config YAML"))
        .with_context(|| format!("Failed to parse config YAML {path:?}"))?;
    info!(config_path = ?path, "Parsed config YAML successfully");
    Ok(config)
}

/// Overlay environment values. Blank values count as unset.
pub fn apply_env<F>(mut config: AnalyzerConfig, lookup: F) -> AnalyzerConfig
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(token) = var("GITHUB_TOKEN") {
        config.default_access_token = Some(token);
    }
    if let Some(key) = var("GEMINI_API_KEY").or_else(|| var("GOOGLE_API_KEY")) {
        config.narrative.gemini_api_key = Some(key);
    }
    if let Some(model) = var("GEMINI_MODEL") {
        config.narrative.gemini_model = model;
    }
    if let Some(model) = var("GEMINI_FALLBACK_MODEL") {
        config.narrative.gemini_fallback_model = model;
    }
    if let Some(key) = var("OPENAI_API_KEY") {
        config.narrative.openai_api_key = Some(key);
    }
    config
}
