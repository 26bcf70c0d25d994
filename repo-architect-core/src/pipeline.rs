//! High-level pipeline: acquire → extract (strategy-dependent) → narrate → assemble.
//!
//! One [`AnalysisPipeline`] is built per process from configuration and shared by
//! every job the orchestrator runs. A run is fail-fast on acquisition; narrative
//! problems degrade to placeholders inside [`assemble`].
//!
//! # Error Handling
//! Only [`AcquisitionError`]s escape. Per-file decode and parse problems were
//! already absorbed by the acquirer.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::assemble::assemble;
use crate::config::AnalyzerConfig;
use crate::contract::{ContentAcquirer, NarrativeGenerator};
use crate::download::acquirer_for;
use crate::error::{AcquisitionError, NarrativeError};
use crate::model::{AnalysisResult, RepositoryReference, RepositorySnapshot};
use crate::narrative::NarrativeProvider;

pub struct AnalysisPipeline {
    acquirer: Arc<dyn ContentAcquirer>,
    narrative: Option<Arc<dyn NarrativeGenerator>>,
    char_budget: usize,
}

impl AnalysisPipeline {
    pub fn new(
        acquirer: Arc<dyn ContentAcquirer>,
        narrative: Option<Arc<dyn NarrativeGenerator>>,
        char_budget: usize,
    ) -> Self {
        Self {
            acquirer,
            narrative,
            char_budget,
        }
    }

    /// Resolve the acquisition strategy and narrative provider once.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, NarrativeError> {
        let narrative = NarrativeProvider::from_config(&config.narrative)?
            .map(|p| Arc::new(p) as Arc<dyn NarrativeGenerator>);
        Ok(Self::new(
            acquirer_for(config),
            narrative,
            config.narrative.char_budget,
        ))
    }

    pub async fn run(
        &self,
        reference: &RepositoryReference,
    ) -> Result<AnalysisResult, AcquisitionError> {
        info!(
            slug = %reference.slug(),
            strategy = self.acquirer.strategy_name(),
            "[PIPELINE] Starting acquisition"
        );
        let snapshot = dedupe_paths(self.acquirer.acquire(reference).await?);
        info!(
            slug = %reference.slug(),
            files = snapshot.files.len(),
            degraded = snapshot.degraded_count(),
            note = %snapshot.summary_note,
            "[PIPELINE] Acquisition succeeded"
        );

        let result = assemble(snapshot, self.narrative.as_deref(), self.char_budget).await;
        info!(slug = %reference.slug(), "[PIPELINE] Result assembled");
        Ok(result)
    }
}

/// Keep the first record for any repeated path.
fn dedupe_paths(mut snapshot: RepositorySnapshot) -> RepositorySnapshot {
    let mut seen = HashSet::new();
    let before = snapshot.files.len();
    snapshot.files.retain(|f| seen.insert(f.path.clone()));
    if snapshot.files.len() != before {
        warn!(
            dropped = before - snapshot.files.len(),
            "Dropped duplicate file paths from snapshot"
        );
    }
    snapshot
}
