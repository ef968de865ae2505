//! Tamper evidence for audit runs.
//!
//! Two independent digests protect every run:
//! - **Content hash** (`Run::current_hash`): covers the pipeline's input
//!   (previous hash, prompt, output, creation time, model) and links runs
//!   into a chain.
//! - **Artifact hash** (`AuditArtifact::artifact_hash`): covers the
//!   pipeline's result (risk score, claim and finding counts).

pub mod canonical;
pub mod chain;

pub use canonical::{canonicalize, canonicalize_json, compute_hash};
pub use chain::{
    chain_segments, compute_artifact_hash, compute_fallback_hash, compute_run_hash, format_timestamp,
    run_content_hash, verify_chain, verify_run_hash, ChainError,
};
