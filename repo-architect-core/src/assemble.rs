//! Merges an acquired snapshot with the narrative artifacts into a job result.
//!
//! Narrative failure never fails the job: each artifact falls back to a labelled
//! placeholder on its own. Both artifacts are requested concurrently.

use futures::future::join;
use tracing::{info, warn};

use crate::contract::NarrativeGenerator;
use crate::error::NarrativeError;
use crate::model::{AnalysisResult, RepositorySnapshot};
use crate::narrative::{
    extract_diagram, NarrativePayload, DIAGRAM_SYSTEM_PROMPT, SUMMARY_SYSTEM_PROMPT,
};

pub const PLACEHOLDER_SUMMARY_HEADING: &str = "## Narrative Unavailable (Placeholder)";

pub async fn assemble(
    snapshot: RepositorySnapshot,
    narrative: Option<&dyn NarrativeGenerator>,
    char_budget: usize,
) -> AnalysisResult {
    let context = NarrativePayload::from_snapshot(&snapshot).render(char_budget);

    let (narrative_summary, narrative_diagram) = match narrative {
        Some(generator) => {
            info!(
                provider = generator.provider_name(),
                context_chars = context.chars().count(),
                "Requesting narrative artifacts"
            );
            let (summary, diagram) = join(
                generator.complete(SUMMARY_SYSTEM_PROMPT, &context),
                generator.complete(DIAGRAM_SYSTEM_PROMPT, &context),
            )
            .await;
            let summary = summary.unwrap_or_else(|e| {
                warn!(error = %e, "Summary generation failed; using placeholder");
                placeholder_summary(&e)
            });
            let diagram = match diagram {
                Ok(text) => extract_diagram(&text),
                Err(e) => {
                    warn!(error = %e, "Diagram generation failed; using placeholder");
                    placeholder_diagram()
                }
            };
            (summary, diagram)
        }
        None => {
            info!("No narrative provider configured; using placeholders");
            (
                placeholder_summary(&NarrativeError::NotConfigured),
                placeholder_diagram(),
            )
        }
    };

    AnalysisResult {
        snapshot,
        narrative_summary,
        narrative_diagram,
    }
}

pub fn placeholder_summary(cause: &NarrativeError) -> String {
    let reason = match cause {
        NarrativeError::NotConfigured => {
            "No narrative provider is configured. Set `GEMINI_API_KEY` or `OPENAI_API_KEY`."
                .to_owned()
        }
        other => format!("Narrative generation failed: {other}"),
    };
    format!(
        "{PLACEHOLDER_SUMMARY_HEADING}\n\n**Note:** this is not a generated summary. {reason}\n\n\
         The structural snapshot of the repository is still complete."
    )
}

pub fn placeholder_diagram() -> String {
    "graph TD;\n    \
     subgraph \"Placeholder (narrative unavailable)\"\n        \
     Repo[Repository] --> Files[Acquired files];\n        \
     Files --> Facts[Structural facts];\n    \
     end"
        .to_owned()
}
