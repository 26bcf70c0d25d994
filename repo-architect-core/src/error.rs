//! Error taxonomy shared by the locator, the acquisition strategies, the narrative
//! clients and the job orchestrator.
//!
//! Per-file problems (undecodable blobs, files that fail to parse) are not errors
//! at this level: they are logged and either dropped or recorded as degraded
//! [`crate::model::FileRecord`]s. Everything here is fatal to the operation that
//! returned it.

use thiserror::Error;

/// The input could not be decomposed into host, owner and repository name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid repository reference {input:?}: expected <host>/<owner>/<name>")]
pub struct InvalidReference {
    pub input: String,
}

/// Failure while retrieving repository content. Fatal for the job.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("repository metadata lookup failed for {slug}: {status} {body}")]
    Metadata {
        slug: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("file tree listing failed for {slug} at {branch}: {status}")]
    Tree {
        slug: String,
        branch: String,
        status: reqwest::StatusCode,
    },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("shallow clone of {slug} failed: {message}")]
    Clone { slug: String, message: String },

    #[error("walking cloned repository failed: {0}")]
    Walk(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure of a narrative provider call. Never fails a job; the assembler
/// substitutes placeholders instead.
#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("no narrative provider configured")]
    NotConfigured,

    #[error("model {model} is not available: {message}")]
    ModelUnsupported { model: String, message: String },

    #[error("narrative provider returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("narrative provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("narrative provider returned no text")]
    EmptyResponse,
}

impl NarrativeError {
    /// Whether retrying the same prompt against a different model may help.
    pub fn is_model_unsupported(&self) -> bool {
        matches!(self, NarrativeError::ModelUnsupported { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("job {0} not found")]
    NotFound(String),
}
