//! Core audit machinery.
//!
//! This module contains:
//! - Policy: Named profiles that shape a run
//! - Scoring: Findings to a bounded risk number
//! - Store: Run persistence
//! - Orchestrator: The audit pipeline itself

pub mod contain;
pub mod orchestrator;
pub mod policy;
pub mod scoring;
pub mod store;

// Re-export commonly used types
pub use orchestrator::{AuditOrchestrator, AuditRequest, DEFAULT_CONNECTOR_TIMEOUT};
pub use policy::{OutputContract, PolicyResolver, PolicySettings, DEFAULT_PROFILE};
pub use scoring::{RiskScorer, RiskTier, ScoringWeights};
pub use store::{FileRepository, RunRepository};
