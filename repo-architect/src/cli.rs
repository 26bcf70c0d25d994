//! Command-line surface for repo-architect.
//!
//! Only argument handling and job polling live here; acquisition, extraction and
//! narrative generation are in `repo-architect-core`.
use crate::load_config::load_config;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use repo_architect_core::config::{AcquisitionStrategy, AnalyzerConfig};
use repo_architect_core::model::{AnalyzeRequest, JobStatus, JobView};
use repo_architect_core::JobOrchestrator;
use std::path::PathBuf;
use std::time::Duration;

/// Analyse hosted repositories: structure, summary and architecture diagram.
#[derive(Parser)]
#[clap(
    name = "repo-architect",
    version,
    about = "Summarise a hosted repository's architecture as structured facts, prose and a Mermaid diagram"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyse one repository and print the finished job as JSON
    Analyze {
        /// Repository URL, e.g. https://github.com/owner/name
        #[clap(long)]
        url: String,
        /// Access token for private repositories (defaults to GITHUB_TOKEN)
        #[clap(long)]
        token: Option<String>,
        /// Optional YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
        /// Acquisition strategy: api or clone
        #[clap(long)]
        strategy: Option<AcquisitionStrategy>,
        /// Poll interval in milliseconds
        #[clap(long, default_value_t = 500)]
        poll_ms: u64,
    },
}

/// Async entrypoint shared by `main` and the integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Analyze {
            url,
            token,
            config,
            strategy,
            poll_ms,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(strategy) = strategy {
                config.strategy = strategy;
            }
            let view = analyze(&config, url, token, Duration::from_millis(poll_ms)).await?;
            println!("{}", serde_json::to_string_pretty(&view)?);

            if view.status == JobStatus::Failed {
                bail!(
                    "analysis job {} failed: {}",
                    view.job_id,
                    view.error.as_deref().unwrap_or("unknown error")
                );
            }
            Ok(())
        }
    }
}

/// Submit one repository and poll until the job is terminal, logging every
/// status change.
pub async fn analyze(
    config: &AnalyzerConfig,
    url: String,
    token: Option<String>,
    interval: Duration,
) -> Result<JobView> {
    let orchestrator =
        JobOrchestrator::from_config(config).context("Failed to set up analysis")?;
    let submitted = orchestrator.submit_request(AnalyzeRequest {
        repository_url: url,
        access_token: token,
    })?;
    tracing::info!(command = "analyze", job_id = %submitted.job_id, "Job submitted");

    let mut last = None;
    loop {
        let view = orchestrator.poll_view(&submitted.job_id)?;
        if last != Some(view.status) {
            tracing::info!(command = "analyze", job_id = %view.job_id, status = %view.status, "Job status");
            last = Some(view.status);
        }
        if view.status.is_terminal() {
            return Ok(view);
        }
        tokio::time::sleep(interval).await;
    }
}
