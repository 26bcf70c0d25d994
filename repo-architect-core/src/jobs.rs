//! Pollable analysis jobs.
//!
//! # Lifecycle
//! `Queued → Processing → Completed | Failed`. [`JobOrchestrator::submit`] stores the
//! queued record and spawns the worker; [`JobOrchestrator::poll`] only reads.
//!
//! # Store discipline
//! [`JobStore`] is a sharded map of `Arc<Job>` snapshots. A transition builds the
//! next record and swaps it in under that key's shard lock, so status and
//! result/error always change together, and jobs on other keys are not blocked.
//! Readers clone the `Arc` and never see a half-applied update.
//!
//! Jobs are kept for the lifetime of the process.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::{error, info, warn};

use crate::config::AnalyzerConfig;
use crate::error::{InvalidReference, JobError, NarrativeError};
use crate::model::{
    AnalysisResult, AnalyzeRequest, Job, JobId, JobStatus, JobView, RepositoryReference,
    SubmitResponse,
};
use crate::pipeline::AnalysisPipeline;

/// A requested state change.
#[derive(Debug)]
pub enum Transition {
    Start,
    Complete(AnalysisResult),
    Fail(String),
}

impl Transition {
    fn target(&self) -> JobStatus {
        match self {
            Transition::Start => JobStatus::Processing,
            Transition::Complete(_) => JobStatus::Completed,
            Transition::Fail(_) => JobStatus::Failed,
        }
    }
}

#[derive(Default)]
pub struct JobStore {
    jobs: DashMap<JobId, Arc<Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job: Job) {
        self.jobs.insert(job.id.clone(), Arc::new(job));
    }

    pub fn get(&self, id: &JobId) -> Option<Arc<Job>> {
        self.jobs.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Apply `transition` if it is legal from the job's current status.
    /// Returns whether the record changed.
    pub fn advance(&self, id: &JobId, transition: Transition) -> bool {
        let Some(mut slot) = self.jobs.get_mut(id) else {
            warn!(job_id = %id, "Transition requested for unknown job");
            return false;
        };
        let from = slot.status;
        let to = transition.target();
        if !from.can_advance_to(to) {
            warn!(job_id = %id, %from, %to, "Refusing illegal job transition");
            return false;
        }

        let mut next = Job::clone(&slot);
        next.status = to;
        match transition {
            Transition::Start => {}
            Transition::Complete(result) => next.result = Some(result),
            Transition::Fail(message) => next.error_message = Some(message),
        }
        *slot = Arc::new(next);
        true
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Accepts submissions, runs each pipeline on its own task, answers polls.
///
/// Cheap to clone; clones share the store and pipeline. `submit` must be called
/// from within a tokio runtime.
#[derive(Clone)]
pub struct JobOrchestrator {
    store: Arc<JobStore>,
    pipeline: Arc<AnalysisPipeline>,
    default_access_token: Option<String>,
}

impl JobOrchestrator {
    pub fn new(pipeline: AnalysisPipeline) -> Self {
        Self {
            store: Arc::new(JobStore::new()),
            pipeline: Arc::new(pipeline),
            default_access_token: None,
        }
    }

    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, NarrativeError> {
        config.trace_loaded();
        let orchestrator = Self::new(AnalysisPipeline::from_config(config)?)
            .with_default_access_token(config.default_access_token.clone());
        Ok(orchestrator)
    }

    /// Token applied to submissions that do not bring their own.
    pub fn with_default_access_token(mut self, token: Option<String>) -> Self {
        self.default_access_token = token;
        self
    }

    /// Parse and submit a caller request. Invalid URLs are rejected before any
    /// job is created.
    pub fn submit_request(
        &self,
        request: AnalyzeRequest,
    ) -> Result<SubmitResponse, InvalidReference> {
        let token = request
            .access_token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.default_access_token.clone());
        let reference =
            RepositoryReference::parse(&request.repository_url)?.with_access_token(token);
        let job_id = self.submit(reference);
        Ok(SubmitResponse {
            job_id,
            status: JobStatus::Queued,
        })
    }

    /// Store a queued job, schedule its pipeline and return immediately.
    pub fn submit(&self, reference: RepositoryReference) -> JobId {
        let id = JobId::generate();
        self.store.insert(Job::queued(id.clone(), reference.clone()));
        info!(job_id = %id, slug = %reference.slug(), "Job queued");

        tokio::spawn(run_job(
            Arc::clone(&self.store),
            Arc::clone(&self.pipeline),
            id.clone(),
            reference,
        ));
        id
    }

    /// The stored record, verbatim.
    pub fn poll(&self, id: &JobId) -> Result<Job, JobError> {
        self.store
            .get(id)
            .map(|job| Job::clone(&job))
            .ok_or_else(|| JobError::NotFound(id.to_string()))
    }

    pub fn poll_view(&self, id: &JobId) -> Result<JobView, JobError> {
        self.store
            .get(id)
            .map(|job| job.view())
            .ok_or_else(|| JobError::NotFound(id.to_string()))
    }

    /// Poll every `interval` until the job is terminal.
    pub async fn wait_for_terminal(&self, id: &JobId, interval: Duration) -> Result<Job, JobError> {
        loop {
            let job = self.poll(id)?;
            if job.status.is_terminal() {
                return Ok(job);
            }
            tokio::time::sleep(interval).await;
        }
    }

    pub fn job_count(&self) -> usize {
        self.store.len()
    }
}

async fn run_job(
    store: Arc<JobStore>,
    pipeline: Arc<AnalysisPipeline>,
    id: JobId,
    reference: RepositoryReference,
) {
    store.advance(&id, Transition::Start);
    info!(job_id = %id, "Job processing");

    // A separate task so a panic inside the pipeline still ends in `Failed`.
    let worker = tokio::spawn(async move { pipeline.run(&reference).await });
    let transition = match worker.await {
        Ok(Ok(result)) => {
            info!(job_id = %id, files = result.snapshot.files.len(), "Job completed");
            Transition::Complete(result)
        }
        Ok(Err(e)) => {
            error!(job_id = %id, error = %e, "Job failed");
            Transition::Fail(e.to_string())
        }
        Err(join_error) => {
            let message = match join_error.try_into_panic() {
                Ok(payload) => format!("analysis worker panicked: {}", panic_message(&*payload)),
                Err(e) => format!("analysis worker did not finish: {e}"),
            };
            error!(job_id = %id, error = %message, "Job failed");
            Transition::Fail(message)
        }
    };
    store.advance(&id, transition);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
