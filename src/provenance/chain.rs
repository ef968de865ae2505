//! Run content hashes, artifact hashes and hash-chain verification.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::canonical::{canonicalize, canonicalize_json, compute_hash};
use crate::domain::{Run, RunStatus};

/// Separates hash input fields so that shifting text between adjacent
/// fields changes the digest.
const FIELD_SEPARATOR: char = '\u{1f}';

/// Fixed-width round-trip timestamp used in hash inputs
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Content hash of a run: previous hash, canonical prompt, canonical
/// output, creation time and model name.
pub fn compute_run_hash(
    previous_hash: Option<&str>,
    prompt: &str,
    output: &str,
    created_at: &DateTime<Utc>,
    model_name: &str,
) -> String {
    let fields = [
        previous_hash.unwrap_or("").to_string(),
        canonicalize(prompt),
        canonicalize(output),
        format_timestamp(created_at),
        model_name.to_string(),
    ];
    compute_hash(&fields.join(&FIELD_SEPARATOR.to_string()))
}

/// Reduced hash for runs that failed before the content hash was computed
pub fn compute_fallback_hash(prompt: &str, created_at: &DateTime<Utc>) -> String {
    let fields = [canonicalize(prompt), format_timestamp(created_at)];
    compute_hash(&fields.join(&FIELD_SEPARATOR.to_string()))
}

/// Content hash for a run from its own fields
pub fn run_content_hash(run: &Run) -> String {
    compute_run_hash(
        run.previous_hash.as_deref(),
        &run.prompt,
        &run.output,
        &run.created_at,
        &run.model_name,
    )
}

/// Summary of a pipeline result covered by the artifact hash
#[derive(Debug, Serialize)]
struct ArtifactSummary<'a> {
    run_id: Uuid,
    current_hash: &'a str,
    created_at: String,
    model_name: &'a str,
    risk_score: f64,
    claim_count: usize,
    finding_count: usize,
}

/// Digest over the canonical JSON projection of a run's result
pub fn compute_artifact_hash(
    run: &Run,
    claim_count: usize,
    finding_count: usize,
) -> Result<String, serde_json::Error> {
    let summary = ArtifactSummary {
        run_id: run.id,
        current_hash: &run.current_hash,
        created_at: format_timestamp(&run.created_at),
        model_name: &run.model_name,
        risk_score: run.risk_score,
        claim_count,
        finding_count,
    };
    Ok(compute_hash(&canonicalize_json(&summary)?))
}

/// Check a run's stored hash against its content.
///
/// Failed runs may carry the reduced fallback hash instead.
pub fn verify_run_hash(run: &Run) -> bool {
    if run.current_hash.is_empty() {
        return false;
    }
    if run.current_hash == run_content_hash(run) {
        return true;
    }
    run.status == RunStatus::Failed
        && run.current_hash == compute_fallback_hash(&run.prompt, &run.created_at)
}

/// Hash chain verification errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Run {run_id} content does not match its hash")]
    HashMismatch { run_id: Uuid },

    #[error("Run {run_id} links to {found:?}, expected {expected:?}")]
    BrokenLink {
        run_id: Uuid,
        /// Predecessor's hash; `None` when the run opens the sequence
        expected: Option<String>,
        found: Option<String>,
    },
}

/// Verify a sequence of runs ordered oldest first.
///
/// Every run must match its own hash. A run with a `previous_hash` must
/// follow the run that hash names; a run without one starts a new segment
/// (e.g. `audit --no-chain`).
pub fn verify_chain(runs: &[Run]) -> Result<(), ChainError> {
    for (i, run) in runs.iter().enumerate() {
        if !verify_run_hash(run) {
            return Err(ChainError::HashMismatch { run_id: run.id });
        }
        let Some(found) = run.previous_hash.as_deref() else {
            continue;
        };
        let expected = i.checked_sub(1).map(|prev| runs[prev].current_hash.as_str());
        if expected != Some(found) {
            return Err(ChainError::BrokenLink {
                run_id: run.id,
                expected: expected.map(str::to_string),
                found: run.previous_hash.clone(),
            });
        }
    }
    Ok(())
}

/// Number of chain segments in a verified sequence
pub fn chain_segments(runs: &[Run]) -> usize {
    runs.iter().filter(|r| r.previous_hash.is_none()).count()
}
