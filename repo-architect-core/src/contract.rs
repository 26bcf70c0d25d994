//! # contract: the two seams of the analysis pipeline
//!
//! The pipeline talks to the outside world through exactly two traits:
//!
//! - [`ContentAcquirer`]: turns a [`RepositoryReference`] into a
//!   [`RepositorySnapshot`]. Implemented by the API-tree and clone-and-walk
//!   downloaders in [`crate::download`].
//! - [`NarrativeGenerator`]: turns a prompt into free-form text. Implemented by the
//!   Gemini and OpenAI clients in [`crate::narrative`].
//!
//! ## Mocking & Testing
//! Both traits are annotated for `mockall`, so tests can script acquisitions and
//! narrative responses without a network (`MockContentAcquirer`,
//! `MockNarrativeGenerator`).
//!
//! Implementations are selected once, at construction, from
//! [`crate::config::AnalyzerConfig`]; the orchestrator holds them as trait objects.

use async_trait::async_trait;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::{AcquisitionError, NarrativeError};
use crate::model::{RepositoryReference, RepositorySnapshot};

/// Retrieves the files of a repository.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ContentAcquirer: Send + Sync {
    /// Acquire a snapshot of the repository's files.
    ///
    /// Per-file problems are absorbed by the implementation (dropped or
    /// recorded as degraded); only whole-repository failures are returned.
    async fn acquire(
        &self,
        reference: &RepositoryReference,
    ) -> Result<RepositorySnapshot, AcquisitionError>;

    /// Short name used in logs.
    fn strategy_name(&self) -> &'static str;
}

/// External text-generation provider.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    /// Generate text for `context` under the given system instructions.
    async fn complete(&self, system_prompt: &str, context: &str)
        -> Result<String, NarrativeError>;

    fn provider_name(&self) -> &'static str;
}
