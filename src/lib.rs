//! chemaudit - Audit AI-generated chemistry text
//!
//! Extracts discrete claims (numbers with units, citation identifiers,
//! reagents and solvents) from model output or supplied text, runs a set
//! of independent consistency validators over them, reduces the findings
//! to a bounded risk score and seals every run into a hash chain.
//!
//! # Architecture
//!
//! Each run is a strictly sequential pipeline:
//! - Generate (or accept) the text and hash it
//! - Extract claims; retry once with a structured reformat if the policy
//!   demands claims and none were found
//! - Validate, score, re-hash and persist
//!
//! Extractor and validator failures are contained as findings. A failed
//! connector call fails the run with maximum risk, never silently.
//!
//! # Modules
//!
//! - `adapters`: Model connectors and run cancellation
//! - `core`: Orchestrator, policy profiles, risk scoring, persistence
//! - `domain`: Data structures (Run, Claim, Finding, AuditArtifact)
//! - `extract`: Claim extractors
//! - `validate`: Validators and their registry
//! - `provenance`: Canonicalization and hash chain
//! - `evidence`: Locators and snippets
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Audit supplied text
//! chemaudit audit --file procedure.txt --policy lenient
//!
//! # Generate with the configured connector, then audit
//! chemaudit audit "Describe the synthesis of aspirin" --contract structured-claims
//!
//! # Verify the stored hash chain
//! chemaudit verify
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod evidence;
pub mod extract;
pub mod provenance;
pub mod validate;

// Re-export main types at crate root for convenience
pub use adapters::{CancelToken, ConnectorError, ModelConnector};
pub use core::{AuditOrchestrator, AuditRequest, PolicyResolver, PolicySettings, RiskScorer};
pub use domain::{AuditArtifact, Claim, ClaimKind, Finding, FindingKind, FindingStatus, Run, RunMode, RunStatus};
pub use extract::{ClaimExtractor, CompositeExtractor};
pub use validate::{Validator, ValidatorRegistry};
