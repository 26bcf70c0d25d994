//! Narrative generation: prompt payloads, provider selection and response parsing.
//!
//! The generator itself is an external collaborator behind
//! [`NarrativeGenerator`]. This module builds what is sent to it and interprets
//! what comes back; [`crate::assemble`] decides what to do when it fails.

pub mod gemini;
pub mod openai;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

use crate::config::NarrativeConfig;
use crate::contract::NarrativeGenerator;
use crate::error::NarrativeError;
use crate::model::{FileRecord, RepositorySnapshot};

pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a principal software architect. \
Analyze the provided repository files and write a concise high-level architectural summary \
in Markdown: the main components, the patterns they follow, and how data flows between them.";

pub const DIAGRAM_SYSTEM_PROMPT: &str = "You are an expert in Mermaid.js diagrams. \
Draw an architecture diagram of the provided repository, using subgraphs for modules or folders. \
Return only the Mermaid code, inside a ```mermaid fenced block.";

/// What is sent to the generator: the repository identity and, per file, either
/// its raw content or a rendering of its extracted facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NarrativePayload {
    pub repository_identity: String,
    pub files: Vec<PayloadFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayloadFile {
    pub path: String,
    pub content_or_facts: String,
}

impl NarrativePayload {
    pub fn from_snapshot(snapshot: &RepositorySnapshot) -> Self {
        Self {
            repository_identity: format!(
                "{}/{}",
                snapshot.reference.host_url,
                snapshot.reference.slug()
            ),
            files: snapshot
                .files
                .iter()
                .map(|f| PayloadFile {
                    path: f.path.clone(),
                    content_or_facts: content_or_facts(f),
                })
                .collect(),
        }
    }

    /// Render as prompt context, cut to at most `char_budget` characters.
    pub fn render(&self, char_budget: usize) -> String {
        let mut out = format!("Repository: {}\n\n", self.repository_identity);
        for file in &self.files {
            out.push_str(&format!(
                "File: {}\n```\n{}\n```\n\n",
                file.path, file.content_or_facts
            ));
        }
        truncate_chars(out, char_budget)
    }
}

fn content_or_facts(file: &FileRecord) -> String {
    if let Some(content) = &file.raw_content {
        return content.clone();
    }
    if file.degraded {
        return format!(
            "[unparsed: {}]",
            file.error.as_deref().unwrap_or("parse failed")
        );
    }
    format!(
        "language: {}\nimports: {}\ntypes: {}\nfunctions: {}\nhints: {}",
        file.language_tag,
        join(&file.imports),
        join(&file.declared_types),
        join(&file.declared_functions),
        join(&file.framework_hints),
    )
}

fn join<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn truncate_chars(mut s: String, max_chars: usize) -> String {
    if let Some((idx, _)) = s.char_indices().nth(max_chars) {
        s.truncate(idx);
    }
    s
}

/// Pull the diagram out of a free-form response: the first ```` ```mermaid ````
/// block, else the first fenced block, else the whole text.
pub fn extract_diagram(response: &str) -> String {
    fenced_body(response, "```mermaid")
        .or_else(|| fenced_body(response, "```"))
        .unwrap_or(response)
        .trim()
        .to_owned()
}

fn fenced_body<'a>(text: &'a str, opener: &str) -> Option<&'a str> {
    let start = text.find(opener)? + opener.len();
    let rest = &text[start..];
    // Drop the rest of the opening line (the info string).
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    Some(body.find("```").map_or(body, |end| &body[..end]))
}

/// The configured provider, chosen once from configuration.
pub enum NarrativeProvider {
    Gemini(GeminiClient),
    OpenAi(OpenAiClient),
}

impl NarrativeProvider {
    /// Gemini when its key is set, else OpenAI, else `None`.
    pub fn from_config(config: &NarrativeConfig) -> Result<Option<Self>, NarrativeError> {
        let provider = if let Some(key) = &config.gemini_api_key {
            Some(Self::Gemini(GeminiClient::new(config, key.clone())?))
        } else if let Some(key) = &config.openai_api_key {
            Some(Self::OpenAi(OpenAiClient::new(config, key.clone())?))
        } else {
            None
        };
        info!(
            provider = provider.as_ref().map_or("none", |p| p.provider_name()),
            "Selected narrative provider"
        );
        Ok(provider)
    }
}

#[async_trait]
impl NarrativeGenerator for NarrativeProvider {
    async fn complete(&self, system_prompt: &str, context: &str) -> Result<String, NarrativeError> {
        match self {
            Self::Gemini(client) => client.complete(system_prompt, context).await,
            Self::OpenAi(client) => client.complete(system_prompt, context).await,
        }
    }

    fn provider_name(&self) -> &'static str {
        match self {
            Self::Gemini(client) => client.provider_name(),
            Self::OpenAi(client) => client.provider_name(),
        }
    }
}
