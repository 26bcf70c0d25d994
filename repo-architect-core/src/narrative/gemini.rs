use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::NarrativeConfig;
use crate::contract::NarrativeGenerator;
use crate::error::NarrativeError;

/// Gemini `generateContent` client with a one-shot fallback model.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    fallback_model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &NarrativeConfig, api_key: String) -> Result<Self, NarrativeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key,
            base_url: config.gemini_base_url.trim_end_matches('/').to_owned(),
            model: qualified_model(&config.gemini_model),
            fallback_model: qualified_model(&config.gemini_fallback_model),
        })
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, NarrativeError> {
        let url = format!("{}/{}:generateContent", self.base_url, model);
        debug!(model, prompt_chars = prompt.len(), "Calling Gemini");
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({ "contents": [{ "role": "user", "parts": [{ "text": prompt }] }] }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if status == StatusCode::NOT_FOUND || body.to_lowercase().contains("not found") {
                return Err(NarrativeError::ModelUnsupported {
                    model: model.to_owned(),
                    message: format!("{status}: {body}"),
                });
            }
            return Err(NarrativeError::Status { status, body });
        }

        let parsed: GenerateResponse = resp.json().await?;
        let text: String = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect();
        if text.trim().is_empty() {
            return Err(NarrativeError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl NarrativeGenerator for GeminiClient {
    /// Try the primary model; only when it is reported unsupported, try the
    /// fallback once. If both fail the primary's error is returned.
    async fn complete(&self, system_prompt: &str, context: &str) -> Result<String, NarrativeError> {
        let prompt = format!("{system_prompt}\n\nRepository Source Code:\n{context}");
        match self.generate(&self.model, &prompt).await {
            Ok(text) => Ok(text),
            Err(primary) if primary.is_model_unsupported() => {
                warn!(
                    model = %self.model,
                    fallback = %self.fallback_model,
                    error = %primary,
                    "Primary model unsupported; retrying with fallback model"
                );
                match self.generate(&self.fallback_model, &prompt).await {
                    Ok(text) => Ok(text),
                    Err(fallback) => {
                        warn!(error = %fallback, "Fallback model failed as well");
                        Err(primary)
                    }
                }
            }
            Err(other) => Err(other),
        }
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

/// The REST API expects `models/<id>`.
fn qualified_model(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_owned()
    } else {
        format!("models/{model}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualifies_bare_model_ids() {
        assert_eq!(qualified_model("gemini-pro"), "models/gemini-pro");
        assert_eq!(qualified_model("models/gemini-pro"), "models/gemini-pro");
    }
}
