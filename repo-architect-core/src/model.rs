//! Data model: what the pipeline produces and what callers poll.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A parsed, validated pointer to a hosted repository.
///
/// Built only through [`RepositoryReference::parse`](crate::locator); never mutated
/// afterwards apart from attaching a credential before submission.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryReference {
    /// Scheme and host, e.g. `https://github.com`.
    pub host_url: String,
    pub owner: String,
    pub name: String,
    #[serde(skip)]
    pub access_token: Option<String>,
}

impl fmt::Debug for RepositoryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryReference")
            .field("host_url", &self.host_url)
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Normalised per-file result.
///
/// Depending on the acquisition strategy either `raw_content` is set (API tree) or
/// the structural fields are (clone and walk). Callers must accept both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub language_tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,
    pub imports: BTreeSet<String>,
    pub declared_types: Vec<String>,
    pub declared_functions: Vec<String>,
    pub framework_hints: Vec<String>,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, language_tag: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            language_tag: language_tag.into(),
            raw_content: None,
            imports: BTreeSet::new(),
            declared_types: Vec::new(),
            declared_functions: Vec::new(),
            framework_hints: Vec::new(),
            degraded: false,
            error: None,
        }
    }

    /// A file whose content was fetched but not analysed.
    pub fn with_raw_content(
        path: impl Into<String>,
        language_tag: impl Into<String>,
        content: String,
    ) -> Self {
        Self {
            raw_content: Some(content),
            ..Self::new(path, language_tag)
        }
    }

    /// A file whose structural parse failed. Carries no extracted facts.
    pub fn degraded(
        path: impl Into<String>,
        language_tag: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            degraded: true,
            error: Some(error.into()),
            ..Self::new(path, language_tag)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositorySnapshot {
    pub reference: RepositoryReference,
    pub files: Vec<FileRecord>,
    pub summary_note: String,
}

impl RepositorySnapshot {
    pub fn degraded_count(&self) -> usize {
        self.files.iter().filter(|f| f.degraded).count()
    }
}

/// The terminal payload of a successful job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub snapshot: RepositorySnapshot,
    pub narrative_summary: String,
    pub narrative_diagram: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Legal forward transitions. `Queued -> Failed` covers a worker that dies
    /// before it could mark itself as processing.
    pub fn can_advance_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Processing)
                | (JobStatus::Queued, JobStatus::Failed)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Queued => "Queued",
            JobStatus::Processing => "Processing",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Opaque job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub reference: RepositoryReference,
    pub result: Option<AnalysisResult>,
    pub error_message: Option<String>,
}

impl Job {
    pub fn queued(id: JobId, reference: RepositoryReference) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            reference,
            result: None,
            error_message: None,
        }
    }

    pub fn view(&self) -> JobView {
        JobView {
            job_id: self.id.clone(),
            status: self.status,
            result: self.result.clone(),
            error: self.error_message.clone(),
        }
    }
}

/// Inbound submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub repository_url: String,
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitResponse {
    pub job_id: JobId,
    pub status: JobStatus,
}

/// Caller-facing poll output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobView {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
