//! Domain types for the audit pipeline.
//!
//! This module contains the core data structures:
//! - Run: One audit execution and its lifecycle
//! - Claim: Facts extracted from the analyzed text
//! - Finding: Validator verdicts
//! - AuditArtifact: The pipeline's output

pub mod artifact;
pub mod claim;
pub mod finding;
pub mod run;

// Re-export commonly used types
pub use artifact::AuditArtifact;
pub use claim::{Claim, ClaimKind, ClaimPayload, ReagentRole};
pub use finding::{EvidenceSpan, Finding, FindingKind, FindingStatus, PIPELINE_VALIDATOR};
pub use run::{Run, RunMode, RunStatus};
