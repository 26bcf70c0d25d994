use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use super::scratch::ScratchDir;
use crate::contract::ContentAcquirer;
use crate::error::AcquisitionError;
use crate::extract;
use crate::model::{FileRecord, RepositoryReference, RepositorySnapshot};

/// Acquires a repository by shallow-cloning it and extracting facts locally.
pub struct CloneDownloader {
    git_binary: String,
    scratch_prefix: String,
}

impl CloneDownloader {
    pub fn new() -> Self {
        Self {
            git_binary: "git".to_owned(),
            scratch_prefix: "repo-architect-".to_owned(),
        }
    }

    /// Use a specific git executable instead of the one on `PATH`.
    pub fn with_git_binary(git_binary: impl Into<String>) -> Self {
        Self {
            git_binary: git_binary.into(),
            ..Self::new()
        }
    }

    /// Name prefix of the scratch directories created under the system temp dir.
    pub fn scratch_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.scratch_prefix = prefix.into();
        self
    }

    async fn shallow_clone(
        &self,
        reference: &RepositoryReference,
        dest: &Path,
    ) -> Result<(), AcquisitionError> {
        let clone_err = |message: String| AcquisitionError::Clone {
            slug: reference.slug(),
            message,
        };

        info!(
            repo_url = %reference.redacted_clone_url(),
            path = %dest.display(),
            "Shallow-cloning repository"
        );
        let output = Command::new(&self.git_binary)
            .arg("clone")
            .arg("--depth")
            .arg("1")
            .arg("--quiet")
            .arg(reference.clone_url())
            .arg(dest)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await
            .map_err(|e| {
                error!(error = ?e, "Failed to launch git process");
                clone_err(format!("failed to launch {}: {e}", self.git_binary))
            })?;

        if !output.status.success() {
            let mut stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            if let Some(token) = &reference.access_token {
                stderr = stderr.replace(token.as_str(), "***");
            }
            error!(
                repo_url = %reference.redacted_clone_url(),
                status = %output.status,
                stderr = %stderr,
                "Git clone exited with non-zero code"
            );
            return Err(clone_err(format!("git exited with {}: {stderr}", output.status)));
        }
        Ok(())
    }
}

impl Default for CloneDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentAcquirer for CloneDownloader {
    async fn acquire(
        &self,
        reference: &RepositoryReference,
    ) -> Result<RepositorySnapshot, AcquisitionError> {
        let scratch = ScratchDir::new(&self.scratch_prefix)?;
        let checkout = scratch.path().join("checkout");

        // `scratch` is dropped (and removed) on every early return below.
        self.shallow_clone(reference, &checkout).await?;

        let root = checkout.clone();
        let files = tokio::task::spawn_blocking(move || walk_and_extract(&root))
            .await
            .map_err(|e| AcquisitionError::Walk(e.to_string()))?;

        if let Err(e) = scratch.release() {
            warn!(error = %e, "Scratch directory could not be fully removed");
        }

        let degraded = files.iter().filter(|f| f.degraded).count();
        let summary_note = format!(
            "Extracted {} files from {} ({} degraded).",
            files.len(),
            reference.slug(),
            degraded
        );
        info!(slug = %reference.slug(), files = files.len(), degraded, "Clone acquisition complete");
        Ok(RepositorySnapshot {
            reference: reference.clone(),
            files,
            summary_note,
        })
    }

    fn strategy_name(&self) -> &'static str {
        "clone_walk"
    }
}

/// Walk `root` in file-name order, skipping `.git`, and extract every file with a
/// supported extension. Paths in the records are relative and `/`-separated.
pub fn walk_and_extract(root: &Path) -> Vec<FileRecord> {
    let mut records = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let rel_path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if extract::Language::from_path(&rel_path).is_none() {
            continue;
        }
        let bytes = match std::fs::read(entry.path()) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, path = %rel_path, "Failed to read file; skipping");
                continue;
            }
        };
        let content = String::from_utf8_lossy(&bytes);
        if let Some(record) = extract::extract(&content, &rel_path) {
            debug!(path = %rel_path, degraded = record.degraded, "Extracted file");
            records.push(record);
        }
    }
    records
}
