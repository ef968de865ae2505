//! Run persistence.
//!
//! Each run is stored as a single JSON record (run + claims + findings +
//! artifact hash) under `<runs_dir>/<run_id>/record.json`. Records are written to a
//! temporary file and renamed into place, so a reader never sees a
//! partially written run. Persisted runs are immutable.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{AuditArtifact, Claim, Finding, Run};
use crate::provenance::compute_artifact_hash;

const RECORD_FILE: &str = "record.json";

/// Storage collaborator for completed runs
#[async_trait]
pub trait RunRepository: Send + Sync {
    /// Persist a run with its claims and findings as one unit
    async fn save_run(&self, run: &Run, claims: &[Claim], findings: &[Finding]) -> Result<()>;

    /// Rebuild the audit artifact of a stored run
    async fn get_artifact(&self, run_id: Uuid) -> Result<Option<AuditArtifact>>;

    /// Runs ordered newest first
    async fn list_runs(&self, skip: usize, take: usize) -> Result<Vec<Run>>;

    /// Hash of the newest run, used to link the next run into the chain
    async fn latest_hash(&self) -> Result<Option<String>> {
        let latest = self.list_runs(0, 1).await?;
        Ok(latest.into_iter().next().map(|run| run.current_hash))
    }
}

/// On-disk shape of one run
#[derive(Debug, Serialize, Deserialize)]
struct RunRecord {
    run: Run,
    claims: Vec<Claim>,
    findings: Vec<Finding>,
    /// Artifact hash at save time; loaded artifacts verify against it
    artifact_hash: String,
}

/// File-based repository, one directory per run
#[derive(Debug, Clone)]
pub struct FileRepository {
    runs_dir: PathBuf,
}

impl FileRepository {
    pub fn new(runs_dir: impl Into<PathBuf>) -> Self {
        Self {
            runs_dir: runs_dir.into(),
        }
    }

    pub fn runs_dir(&self) -> &Path {
        &self.runs_dir
    }

    fn record_path(&self, run_id: Uuid) -> PathBuf {
        self.runs_dir.join(run_id.to_string()).join(RECORD_FILE)
    }

    async fn read_record(&self, run_id: Uuid) -> Result<Option<RunRecord>> {
        let path = self.record_path(run_id);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read run record: {}", path.display()))?;
        let record = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse run record: {}", path.display()))?;

        Ok(Some(record))
    }

    /// All stored run IDs (unordered)
    pub async fn run_ids(&self) -> Result<Vec<Uuid>> {
        if !self.runs_dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        let mut entries = fs::read_dir(&self.runs_dir)
            .await
            .with_context(|| format!("Failed to list runs in {}", self.runs_dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(id) = entry.file_name().to_str().and_then(|n| Uuid::parse_str(n).ok()) {
                    ids.push(id);
                }
            }
        }

        Ok(ids)
    }

    /// Claims and findings of a stored run
    pub async fn get_run(&self, run_id: Uuid) -> Result<Option<(Run, Vec<Claim>, Vec<Finding>)>> {
        Ok(self
            .read_record(run_id)
            .await?
            .map(|r| (r.run, r.claims, r.findings)))
    }
}

#[async_trait]
impl RunRepository for FileRepository {
    async fn save_run(&self, run: &Run, claims: &[Claim], findings: &[Finding]) -> Result<()> {
        let run_dir = self.runs_dir.join(run.id.to_string());
        let path = run_dir.join(RECORD_FILE);
        if path.exists() {
            anyhow::bail!("Run {} is already persisted", run.id);
        }

        fs::create_dir_all(&run_dir)
            .await
            .with_context(|| format!("Failed to create run directory: {}", run_dir.display()))?;

        let artifact_hash = compute_artifact_hash(run, claims.len(), findings.len())
            .context("Failed to compute artifact hash")?;
        let record = RunRecord {
            run: run.clone(),
            claims: claims.to_vec(),
            findings: findings.to_vec(),
            artifact_hash,
        };
        let json = serde_json::to_string_pretty(&record).context("Failed to serialize run record")?;

        let tmp_path = run_dir.join(format!("{}.tmp", RECORD_FILE));
        fs::write(&tmp_path, json)
            .await
            .with_context(|| format!("Failed to write run record: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &path)
            .await
            .with_context(|| format!("Failed to move run record into place: {}", path.display()))?;

        debug!(run_id = %run.id, path = %path.display(), "Run persisted");
        Ok(())
    }

    async fn get_artifact(&self, run_id: Uuid) -> Result<Option<AuditArtifact>> {
        Ok(self.read_record(run_id).await?.map(|record| {
            AuditArtifact::restore(record.run, record.claims, record.findings, record.artifact_hash)
        }))
    }

    async fn list_runs(&self, skip: usize, take: usize) -> Result<Vec<Run>> {
        let mut runs = Vec::new();
        for id in self.run_ids().await? {
            match self.read_record(id).await {
                Ok(Some(record)) => runs.push(record.run),
                Ok(None) => {}
                Err(e) => warn!(run_id = %id, error = %e, "Skipping unreadable run record"),
            }
        }

        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(runs.into_iter().skip(skip).take(take).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClaimKind, RunMode, RunStatus};
    use tempfile::TempDir;

    fn sample_run() -> Run {
        let mut run = Run::new(RunMode::VerifyOnly, "none", "offline", "default", "prompt");
        run.output = "Heated at 80 °C.".to_string();
        run.current_hash = "ab".repeat(32);
        run.advance(RunStatus::Completed);
        run
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let repo = FileRepository::new(temp.path());
        let run = sample_run();
        let claim = Claim::new(run.id, ClaimKind::NumericWithUnit, "80 °C", "80", "output:10-16");
        let finding = Finding::pass(run.id, "NumericContradiction", "ok").for_claim(&claim);

        repo.save_run(&run, &[claim], &[finding]).await.unwrap();

        let artifact = repo.get_artifact(run.id).await.unwrap().unwrap();
        assert_eq!(artifact.run.id, run.id);
        assert_eq!(artifact.claims.len(), 1);
        assert_eq!(artifact.findings.len(), 1);
        assert!(artifact.verify());
        assert!(!temp.path().join(run.id.to_string()).join("record.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_runs_are_immutable() {
        let temp = TempDir::new().unwrap();
        let repo = FileRepository::new(temp.path());
        let run = sample_run();

        repo.save_run(&run, &[], &[]).await.unwrap();
        assert!(repo.save_run(&run, &[], &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_run() {
        let temp = TempDir::new().unwrap();
        let repo = FileRepository::new(temp.path().join("absent"));
        assert!(repo.get_artifact(Uuid::new_v4()).await.unwrap().is_none());
        assert!(repo.list_runs(0, 10).await.unwrap().is_empty());
        assert!(repo.latest_hash().await.unwrap().is_none());
    }
}
