// Integration tests for job submission, polling and the full analysis pipeline.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use repo_architect_core::assemble::PLACEHOLDER_SUMMARY_HEADING;
use repo_architect_core::config::{AnalyzerConfig, NarrativeConfig};
use repo_architect_core::contract::{ContentAcquirer, MockContentAcquirer};
use repo_architect_core::download::clone_walk::walk_and_extract;
use repo_architect_core::error::{AcquisitionError, JobError};
use repo_architect_core::model::{
    AnalyzeRequest, Job, JobId, JobStatus, RepositoryReference, RepositorySnapshot,
};
use repo_architect_core::pipeline::AnalysisPipeline;
use repo_architect_core::JobOrchestrator;
use serde_json::json;
use tokio::sync::Notify;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const POLL: Duration = Duration::from_millis(5);
const DEADLINE: Duration = Duration::from_secs(10);

fn reference() -> RepositoryReference {
    RepositoryReference::parse("https://github.com/octo/widgets").unwrap()
}

fn empty_snapshot(reference: &RepositoryReference) -> RepositorySnapshot {
    RepositorySnapshot {
        reference: reference.clone(),
        files: vec![],
        summary_note: "nothing".to_owned(),
    }
}

async fn finish(orchestrator: &JobOrchestrator, id: &JobId) -> Job {
    tokio::time::timeout(DEADLINE, orchestrator.wait_for_terminal(id, POLL))
        .await
        .expect("job did not reach a terminal status in time")
        .unwrap()
}

/// Blocks in `acquire` until the test opens the gate.
struct GatedAcquirer {
    gate: Arc<Notify>,
}

#[async_trait]
impl ContentAcquirer for GatedAcquirer {
    async fn acquire(
        &self,
        reference: &RepositoryReference,
    ) -> Result<RepositorySnapshot, AcquisitionError> {
        self.gate.notified().await;
        Ok(empty_snapshot(reference))
    }

    fn strategy_name(&self) -> &'static str {
        "gated"
    }
}

/// Runs the extractor over a local directory instead of a clone.
struct LocalDirAcquirer {
    root: PathBuf,
}

#[async_trait]
impl ContentAcquirer for LocalDirAcquirer {
    async fn acquire(
        &self,
        reference: &RepositoryReference,
    ) -> Result<RepositorySnapshot, AcquisitionError> {
        Ok(RepositorySnapshot {
            reference: reference.clone(),
            files: walk_and_extract(&self.root),
            summary_note: "local".to_owned(),
        })
    }

    fn strategy_name(&self) -> &'static str {
        "local"
    }
}

struct PanickingAcquirer;

#[async_trait]
impl ContentAcquirer for PanickingAcquirer {
    async fn acquire(
        &self,
        _reference: &RepositoryReference,
    ) -> Result<RepositorySnapshot, AcquisitionError> {
        panic!("acquirer exploded");
    }

    fn strategy_name(&self) -> &'static str {
        "panicking"
    }
}

fn orchestrator_with(acquirer: impl ContentAcquirer + 'static) -> JobOrchestrator {
    JobOrchestrator::new(AnalysisPipeline::new(Arc::new(acquirer), None, 10_000))
}

#[tokio::test]
async fn status_moves_forward_and_result_appears_only_when_completed() {
    let gate = Arc::new(Notify::new());
    let orchestrator = orchestrator_with(GatedAcquirer { gate: gate.clone() });

    let id = orchestrator.submit(reference());
    // The worker has not been scheduled yet on the single-threaded test runtime.
    let first = orchestrator.poll(&id).unwrap();
    assert_eq!(first.status, JobStatus::Queued);
    assert!(first.result.is_none());

    let mut observed = vec![first.status];
    loop {
        let job = orchestrator.poll(&id).unwrap();
        if observed.last() != Some(&job.status) {
            observed.push(job.status);
        }
        if job.status == JobStatus::Processing {
            assert!(job.result.is_none());
            break;
        }
        tokio::time::sleep(POLL).await;
    }

    gate.notify_one();
    let done = finish(&orchestrator, &id).await;
    observed.push(done.status);

    assert_eq!(
        observed,
        vec![JobStatus::Queued, JobStatus::Processing, JobStatus::Completed]
    );
    assert!(done.error_message.is_none());
    let result = done.result.unwrap();
    assert!(result.narrative_summary.starts_with(PLACEHOLDER_SUMMARY_HEADING));
    assert!(result.narrative_diagram.starts_with("graph TD;"));

    // Terminal records are stable.
    assert_eq!(orchestrator.poll(&id).unwrap().status, JobStatus::Completed);
}

#[tokio::test]
async fn acquisition_error_fails_the_job() {
    let mut acquirer = MockContentAcquirer::new();
    acquirer.expect_strategy_name().return_const("mock");
    acquirer.expect_acquire().times(1).returning(|reference| {
        Err(AcquisitionError::Clone {
            slug: reference.slug(),
            message: "repository not found".to_owned(),
        })
    });
    let orchestrator = orchestrator_with(acquirer);

    let id = orchestrator.submit(reference());
    let job = finish(&orchestrator, &id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.result.is_none());
    assert_eq!(
        job.error_message.as_deref(),
        Some("shallow clone of octo/widgets failed: repository not found")
    );
}

#[tokio::test]
async fn panicking_worker_still_ends_failed() {
    let orchestrator = orchestrator_with(PanickingAcquirer);
    let id = orchestrator.submit(reference());
    let job = finish(&orchestrator, &id).await;
    assert_eq!(job.status, JobStatus::Failed);
    let message = job.error_message.unwrap();
    assert!(message.contains("acquirer exploded"), "{message}");
}

#[tokio::test]
async fn syntax_errors_degrade_files_without_failing_the_job() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("good.py"), "import os\n\ndef main():\n    pass\n").unwrap();
    std::fs::write(dir.path().join("broken.py"), "def broken(:\n    return\n").unwrap();
    let orchestrator = orchestrator_with(LocalDirAcquirer {
        root: dir.path().to_path_buf(),
    });

    let id = orchestrator.submit(reference());
    let job = finish(&orchestrator, &id).await;
    assert_eq!(job.status, JobStatus::Completed);

    let files = job.result.unwrap().snapshot.files;
    assert_eq!(files.len(), 2);
    let broken = files.iter().find(|f| f.path == "broken.py").unwrap();
    assert!(broken.degraded);
    assert!(broken.error.as_deref().unwrap().contains("syntax error"));
    let good = files.iter().find(|f| f.path == "good.py").unwrap();
    assert!(!good.degraded);
    assert_eq!(good.declared_functions, vec!["main"]);
}

#[tokio::test]
async fn unknown_job_id_is_not_found() {
    let orchestrator = orchestrator_with(PanickingAcquirer);
    let err = orchestrator.poll(&JobId::from("does-not-exist")).unwrap_err();
    assert_eq!(err, JobError::NotFound("does-not-exist".to_owned()));
    assert!(orchestrator.poll_view(&JobId::from("x")).is_err());
}

#[tokio::test]
async fn invalid_url_is_rejected_before_a_job_exists() {
    let orchestrator = orchestrator_with(PanickingAcquirer);
    let err = orchestrator
        .submit_request(AnalyzeRequest {
            repository_url: "not a repository".to_owned(),
            access_token: None,
        })
        .unwrap_err();
    assert!(err.to_string().contains("not a repository"));
    assert_eq!(orchestrator.job_count(), 0);
}

#[tokio::test]
async fn default_token_applies_only_without_a_request_token() {
    let gate = Arc::new(Notify::new());
    let orchestrator = orchestrator_with(GatedAcquirer { gate })
        .with_default_access_token(Some("from-env".to_owned()));

    let defaulted = orchestrator
        .submit_request(AnalyzeRequest {
            repository_url: "https://github.com/octo/widgets".to_owned(),
            access_token: None,
        })
        .unwrap();
    assert_eq!(defaulted.status, JobStatus::Queued);
    let explicit = orchestrator
        .submit_request(AnalyzeRequest {
            repository_url: "github.com/octo/widgets.git".to_owned(),
            access_token: Some("from-request".to_owned()),
        })
        .unwrap();

    let token = |id: &JobId| orchestrator.poll(id).unwrap().reference.access_token;
    assert_eq!(token(&defaulted.job_id).as_deref(), Some("from-env"));
    assert_eq!(token(&explicit.job_id).as_deref(), Some("from-request"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_jobs_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.py"), "import sys\n").unwrap();
    let orchestrator = orchestrator_with(LocalDirAcquirer {
        root: dir.path().to_path_buf(),
    });
    let ids: Vec<JobId> = (0..16).map(|_| orchestrator.submit(reference())).collect();

    let mut unique = ids.clone();
    unique.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    unique.dedup();
    assert_eq!(unique.len(), ids.len());

    for id in &ids {
        let job = finish(&orchestrator, id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(&job.id, id);
    }
    assert_eq!(orchestrator.job_count(), 16);
}

#[tokio::test]
async fn end_to_end_api_tree_with_gemini_narrative() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "default_branch": "main" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/git/trees/main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tree": [{ "path": "app.py", "type": "blob", "sha": "a1" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/git/blobs/a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": base64::engine::general_purpose::STANDARD.encode("print('hi')\n"),
            "encoding": "base64"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-test:generateContent"))
        .and(body_string_contains("principal software architect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "# Widgets architecture" }] } }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-test:generateContent"))
        .and(body_string_contains("Mermaid.js"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Here:\n```mermaid\ngraph TD;\n  App-->Print;\n```" }] } }]
        })))
        .mount(&server)
        .await;

    let config = AnalyzerConfig {
        api_base_url: Some(server.uri()),
        narrative: NarrativeConfig {
            gemini_api_key: Some("g-key".to_owned()),
            gemini_model: "gemini-test".to_owned(),
            gemini_base_url: server.uri(),
            timeout_secs: 5,
            ..NarrativeConfig::default()
        },
        ..AnalyzerConfig::default()
    };
    let orchestrator = JobOrchestrator::from_config(&config).unwrap();
    let submitted = orchestrator
        .submit_request(AnalyzeRequest {
            repository_url: "https://github.com/octo/widgets".to_owned(),
            access_token: None,
        })
        .unwrap();

    let job = finish(&orchestrator, &submitted.job_id).await;
    assert_eq!(job.status, JobStatus::Completed, "{:?}", job.error_message);
    let view = orchestrator.poll_view(&submitted.job_id).unwrap();
    let result = view.result.unwrap();
    assert_eq!(result.narrative_summary, "# Widgets architecture");
    assert_eq!(result.narrative_diagram, "graph TD;\n  App-->Print;");
    assert_eq!(result.snapshot.summary_note, "Fetched 1 files from octo/widgets.");
    assert_eq!(
        result.snapshot.files[0].raw_content.as_deref(),
        Some("print('hi')\n")
    );
}
