#![doc = "repo-architect-core: repository analysis pipeline and job orchestration."]

//! Locates a hosted repository, acquires its content, extracts structural facts,
//! asks a narrative generator for a summary and diagram, and tracks each run as a
//! pollable job.
//!
//! # Usage
//! Build a [`jobs::JobOrchestrator`] from an [`config::AnalyzerConfig`], submit
//! repository URLs and poll the returned job ids.

pub mod assemble;
pub mod config;
pub mod contract;
pub mod download;
pub mod error;
pub mod extract;
pub mod jobs;
pub mod locator;
pub mod model;
pub mod narrative;
pub mod pipeline;

pub use config::{AcquisitionStrategy, AnalyzerConfig, NarrativeConfig};
pub use jobs::JobOrchestrator;
pub use model::{AnalysisResult, AnalyzeRequest, Job, JobId, JobStatus, JobView};
