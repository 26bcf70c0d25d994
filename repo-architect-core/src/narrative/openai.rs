use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::NarrativeConfig;
use crate::contract::NarrativeGenerator;
use crate::error::NarrativeError;

/// OpenAI chat-completions client.
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(config: &NarrativeConfig, api_key: String) -> Result<Self, NarrativeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key,
            base_url: config.openai_base_url.trim_end_matches('/').to_owned(),
            model: config.openai_model.clone(),
        })
    }
}

#[async_trait]
impl NarrativeGenerator for OpenAiClient {
    async fn complete(&self, system_prompt: &str, context: &str) -> Result<String, NarrativeError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, context_chars = context.len(), "Calling OpenAI");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": system_prompt },
                    { "role": "user", "content": format!("Repository Data:\n\n{context}") },
                ],
            }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NarrativeError::Status { status, body });
        }

        let parsed: ChatResponse = resp.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(NarrativeError::EmptyResponse)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
