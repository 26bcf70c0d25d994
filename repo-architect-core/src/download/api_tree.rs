use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::contract::ContentAcquirer;
use crate::error::AcquisitionError;
use crate::extract::language_tag;
use crate::model::{FileRecord, RepositoryReference, RepositorySnapshot};

/// Upper bound on blobs fetched per repository.
pub const MAX_API_FILES: usize = 30;

const ALLOWED_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "tsx", "jsx", "go", "java", "rb", "php", "md", "json",
];

/// Directory segments that mark vendored, generated or VCS content.
const EXCLUDED_SEGMENTS: &[&str] = &[
    "node_modules",
    "vendor",
    "venv",
    ".venv",
    "dist",
    "build",
    "target",
    ".git",
    "__pycache__",
];

const GITHUB_API: &str = "https://api.github.com";
const CLIENT_USER_AGENT: &str = concat!("repo-architect/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct RepoMetadata {
    default_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TreeListing {
    #[serde(default)]
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: String,
}

#[derive(Debug, Deserialize)]
struct Blob {
    #[serde(default)]
    content: String,
    encoding: Option<String>,
}

/// Acquires repository content through the hosting REST API without cloning.
pub struct ApiTreeDownloader {
    client: Client,
    api_base_url: Option<String>,
}

impl ApiTreeDownloader {
    pub fn new(api_base_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_base_url: api_base_url.map(|u| u.trim_end_matches('/').to_owned()),
        }
    }

    /// REST root for the reference's host: the configured override, the public
    /// GitHub API, or the enterprise `/api/v3` layout.
    fn api_root(&self, reference: &RepositoryReference) -> String {
        if let Some(base) = &self.api_base_url {
            return base.clone();
        }
        match reference.host_url.as_str() {
            "https://github.com" | "http://github.com" | "https://www.github.com" => {
                GITHUB_API.to_owned()
            }
            host => format!("{host}/api/v3"),
        }
    }

    fn get(&self, url: &str, reference: &RepositoryReference) -> RequestBuilder {
        let request = self
            .client
            .get(url)
            .header(ACCEPT, "application/vnd.github.v3+json")
            .header(USER_AGENT, CLIENT_USER_AGENT);
        match &reference.access_token {
            Some(token) => request.header(AUTHORIZATION, format!("token {token}")),
            None => request,
        }
    }

    async fn send(
        &self,
        url: &str,
        reference: &RepositoryReference,
    ) -> Result<reqwest::Response, AcquisitionError> {
        self.get(url, reference)
            .send()
            .await
            .map_err(|source| AcquisitionError::Transport {
                url: url.to_owned(),
                source,
            })
    }

    async fn default_branch(
        &self,
        repo_api: &str,
        reference: &RepositoryReference,
    ) -> Result<String, AcquisitionError> {
        let resp = self.send(repo_api, reference).await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!(slug = %reference.slug(), %status, "Repository metadata lookup failed");
            return Err(AcquisitionError::Metadata {
                slug: reference.slug(),
                status,
                body: truncate(&body, 200),
            });
        }
        let meta: RepoMetadata =
            resp.json()
                .await
                .map_err(|source| AcquisitionError::Transport {
                    url: repo_api.to_owned(),
                    source,
                })?;
        Ok(meta.default_branch.unwrap_or_else(|| "main".to_owned()))
    }

    async fn list_tree(
        &self,
        repo_api: &str,
        branch: &str,
        reference: &RepositoryReference,
    ) -> Result<Vec<TreeEntry>, AcquisitionError> {
        let url = format!("{repo_api}/git/trees/{branch}?recursive=1");
        let resp = self.send(&url, reference).await?;
        let status = resp.status();
        if !status.is_success() {
            error!(slug = %reference.slug(), branch, %status, "File tree listing failed");
            return Err(AcquisitionError::Tree {
                slug: reference.slug(),
                branch: branch.to_owned(),
                status,
            });
        }
        let listing: TreeListing = resp
            .json()
            .await
            .map_err(|source| AcquisitionError::Transport { url, source })?;
        if listing.truncated {
            warn!(slug = %reference.slug(), "Tree listing was truncated by the host");
        }
        Ok(listing.tree)
    }

    /// Fetch and decode one blob. `Ok(None)` means the file is dropped.
    async fn fetch_blob(
        &self,
        repo_api: &str,
        entry: &TreeEntry,
        reference: &RepositoryReference,
    ) -> Result<Option<String>, AcquisitionError> {
        let url = format!("{repo_api}/git/blobs/{}", entry.sha);
        let resp = self.send(&url, reference).await?;
        let status = resp.status();
        if !status.is_success() {
            warn!(path = %entry.path, %status, "Blob fetch returned non-success; dropping file");
            return Ok(None);
        }
        let blob: Blob = match resp.json().await {
            Ok(blob) => blob,
            Err(e) => {
                warn!(path = %entry.path, error = %e, "Blob response was not valid JSON; dropping file");
                return Ok(None);
            }
        };
        if let Some(encoding) = blob.encoding.as_deref().filter(|e| *e != "base64") {
            warn!(path = %entry.path, encoding, "Unexpected blob encoding; dropping file");
            return Ok(None);
        }
        match decode_blob(&blob.content) {
            Ok(text) => Ok(Some(text)),
            Err(e) => {
                warn!(path = %entry.path, error = %e, "Failed to decode blob; dropping file");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl ContentAcquirer for ApiTreeDownloader {
    async fn acquire(
        &self,
        reference: &RepositoryReference,
    ) -> Result<RepositorySnapshot, AcquisitionError> {
        let repo_api = format!(
            "{}/repos/{}/{}",
            self.api_root(reference),
            reference.owner,
            reference.name
        );
        info!(slug = %reference.slug(), api = %repo_api, "Acquiring repository through tree API");

        let branch = self.default_branch(&repo_api, reference).await?;
        debug!(slug = %reference.slug(), branch = %branch, "Resolved default branch");

        let entries = self.list_tree(&repo_api, &branch, reference).await?;
        let total = entries.len();
        let selected = select_entries(entries);
        info!(
            slug = %reference.slug(),
            listed = total,
            selected = selected.len(),
            "Filtered tree listing"
        );

        let mut files = Vec::with_capacity(selected.len());
        for entry in &selected {
            if let Some(content) = self.fetch_blob(&repo_api, entry, reference).await? {
                files.push(FileRecord::with_raw_content(
                    entry.path.clone(),
                    language_tag(&entry.path),
                    content,
                ));
            }
        }

        let summary_note = format!("Fetched {} files from {}.", files.len(), reference.slug());
        info!(slug = %reference.slug(), fetched = files.len(), "Tree API acquisition complete");
        Ok(RepositorySnapshot {
            reference: reference.clone(),
            files,
            summary_note,
        })
    }

    fn strategy_name(&self) -> &'static str {
        "api_tree"
    }
}

/// Keep allowed blobs outside excluded directories, capped at
/// [`MAX_API_FILES`] in listing order.
pub fn select_entries(entries: Vec<TreeEntry>) -> Vec<TreeEntry> {
    entries
        .into_iter()
        .filter(|e| e.kind == "blob" && is_wanted_path(&e.path))
        .take(MAX_API_FILES)
        .collect()
}

pub fn is_wanted_path(path: &str) -> bool {
    let mut segments: Vec<&str> = path.split('/').collect();
    let Some(file_name) = segments.pop() else {
        return false;
    };
    if segments.iter().any(|s| EXCLUDED_SEGMENTS.contains(s)) {
        return false;
    }
    file_name
        .rsplit_once('.')
        .is_some_and(|(stem, ext)| {
            !stem.is_empty() && ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
        })
}

/// Decode a base64 blob body (the API wraps it at 60 columns) to text,
/// replacing invalid UTF-8.
pub fn decode_blob(content: &str) -> Result<String, base64::DecodeError> {
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD.decode(compact)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_owned(),
    }
}
