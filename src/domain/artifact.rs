//! The audit artifact produced once per run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::claim::Claim;
use super::finding::{Finding, FindingStatus};
use super::run::Run;
use crate::provenance;

/// Final output of an audit: run, claims, findings and an integrity digest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditArtifact {
    /// The run, in its terminal state
    pub run: Run,

    /// Every extracted claim
    pub claims: Vec<Claim>,

    /// Every finding, including contained failures
    pub findings: Vec<Finding>,

    /// Digest over the canonical result summary
    pub artifact_hash: String,

    /// When the artifact was assembled
    pub generated_at: DateTime<Utc>,
}

impl AuditArtifact {
    /// Assemble an artifact and compute its hash
    pub fn assemble(run: Run, claims: Vec<Claim>, findings: Vec<Finding>) -> anyhow::Result<Self> {
        let artifact_hash = provenance::compute_artifact_hash(&run, claims.len(), findings.len())?;
        Ok(Self {
            run,
            claims,
            findings,
            artifact_hash,
            generated_at: Utc::now(),
        })
    }

    /// Rebuild a stored artifact around the hash recorded when it was saved
    pub fn restore(run: Run, claims: Vec<Claim>, findings: Vec<Finding>, artifact_hash: String) -> Self {
        Self {
            run,
            claims,
            findings,
            artifact_hash,
            generated_at: Utc::now(),
        }
    }

    /// Recompute the artifact hash and compare
    pub fn verify(&self) -> bool {
        provenance::compute_artifact_hash(&self.run, self.claims.len(), self.findings.len())
            .map(|h| h == self.artifact_hash)
            .unwrap_or(false)
    }

    /// Number of findings with the given status
    pub fn count_status(&self, status: FindingStatus) -> usize {
        self.findings.iter().filter(|f| f.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RunMode;

    #[test]
    fn test_artifact_assembly() {
        let run = Run::new(RunMode::VerifyOnly, "model", "offline", "default", "prompt");
        let artifact = AuditArtifact::assemble(run, Vec::new(), Vec::new()).unwrap();

        assert_eq!(artifact.artifact_hash.len(), 64);
        assert!(artifact.verify());
    }

    #[test]
    fn test_artifact_serialization() {
        let run = Run::new(RunMode::VerifyOnly, "model", "offline", "default", "prompt");
        let artifact = AuditArtifact::assemble(run, Vec::new(), Vec::new()).unwrap();

        let json = serde_json::to_string(&artifact).unwrap();
        let parsed: AuditArtifact = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.artifact_hash, artifact.artifact_hash);
        assert!(parsed.verify());
    }

    #[test]
    fn test_restored_artifact_checks_recorded_hash() {
        let run = Run::new(RunMode::VerifyOnly, "model", "offline", "default", "prompt");
        let artifact = AuditArtifact::assemble(run, Vec::new(), Vec::new()).unwrap();

        let restored = AuditArtifact::restore(
            artifact.run.clone(),
            Vec::new(),
            Vec::new(),
            artifact.artifact_hash.clone(),
        );
        assert!(restored.verify());

        let mut edited = artifact.run.clone();
        edited.risk_score = 0.75;
        let restored = AuditArtifact::restore(edited, Vec::new(), Vec::new(), artifact.artifact_hash);
        assert!(!restored.verify());
    }

    #[test]
    fn test_tampered_counts_fail_verification() {
        let run = Run::new(RunMode::VerifyOnly, "model", "offline", "default", "prompt");
        let run_id = run.id;
        let mut artifact = AuditArtifact::assemble(run, Vec::new(), Vec::new()).unwrap();
        artifact.findings.push(Finding::pass(run_id, "x", "injected"));

        assert!(!artifact.verify());
    }
}
