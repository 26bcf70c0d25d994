use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// How repository content is obtained. Chosen once per process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionStrategy {
    /// Hosting-service REST API: metadata, recursive tree, per-blob fetch.
    #[default]
    ApiTree,
    /// Shallow `git clone` into a scratch directory, then walk and extract.
    CloneWalk,
}

impl std::str::FromStr for AcquisitionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "api" | "api_tree" => Ok(Self::ApiTree),
            "clone" | "clone_walk" => Ok(Self::CloneWalk),
            other => Err(format!("unknown acquisition strategy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub strategy: AcquisitionStrategy,
    /// Overrides the hosting API root (e.g. a GitHub Enterprise or test server).
    pub api_base_url: Option<String>,
    /// Used when a submission carries no token of its own.
    #[serde(skip_serializing)]
    pub default_access_token: Option<String>,
    pub narrative: NarrativeConfig,
}

impl AnalyzerConfig {
    pub fn trace_loaded(&self) {
        info!(
            strategy = ?self.strategy,
            api_base_url = self.api_base_url.as_deref().unwrap_or("<derived>"),
            has_default_token = self.default_access_token.is_some(),
            provider = self.narrative.provider_name(),
            "Loaded analyzer config"
        );
        debug!(narrative = ?self.narrative, "Narrative config loaded");
    }
}

pub const DEFAULT_GEMINI_MODEL: &str = "models/gemini-flash-latest";
pub const DEFAULT_GEMINI_FALLBACK_MODEL: &str = "models/gemini-pro-latest";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CHAR_BUDGET: usize = 50_000;

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeConfig {
    #[serde(skip_serializing)]
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_fallback_model: String,
    pub gemini_base_url: String,
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    /// Maximum characters of repository context sent per request.
    pub char_budget: usize,
    pub timeout_secs: u64,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_owned(),
            gemini_fallback_model: DEFAULT_GEMINI_FALLBACK_MODEL.to_owned(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_owned(),
            openai_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.to_owned(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_owned(),
            char_budget: DEFAULT_CHAR_BUDGET,
            timeout_secs: 30,
        }
    }
}

impl NarrativeConfig {
    pub fn provider_name(&self) -> &'static str {
        if self.gemini_api_key.is_some() {
            "gemini"
        } else if self.openai_api_key.is_some() {
            "openai"
        } else {
            "none"
        }
    }
}

impl std::fmt::Debug for NarrativeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |k: &Option<String>| k.as_ref().map(|_| "<redacted>");
        f.debug_struct("NarrativeConfig")
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("gemini_model", &self.gemini_model)
            .field("gemini_fallback_model", &self.gemini_fallback_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("openai_model", &self.openai_model)
            .field("openai_base_url", &self.openai_base_url)
            .field("char_budget", &self.char_budget)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
