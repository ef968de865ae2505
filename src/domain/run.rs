//! Run state for a single audit execution.
//!
//! A Run is created by the orchestrator at pipeline start and mutated only
//! by that orchestrator until it is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One audit execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Unique identifier for this run
    pub id: Uuid,

    /// When the run was created (part of the content hash input)
    pub created_at: DateTime<Utc>,

    /// Current lifecycle stage
    pub status: RunStatus,

    /// Whether the text was generated or supplied by the caller
    pub mode: RunMode,

    /// Model that produced (or is claimed to have produced) the text
    pub model_name: String,

    /// Connector used for generation and contract retries
    pub connector_name: String,

    /// Policy profile the caller asked for
    pub policy_profile: String,

    /// Prompt text
    pub prompt: String,

    /// Text under analysis (model output or supplied text)
    pub output: String,

    /// Content hash of the previous run in the chain
    pub previous_hash: Option<String>,

    /// Tamper-evidence digest over the run's inputs
    pub current_hash: String,

    /// Aggregate risk in [0, 1]
    pub risk_score: f64,

    /// When the run reached a terminal status
    pub completed_at: Option<DateTime<Utc>>,

    /// Failure reason for Failed runs
    pub error: Option<String>,
}

impl Run {
    /// Create a run shell in the Created state
    pub fn new(
        mode: RunMode,
        model_name: impl Into<String>,
        connector_name: impl Into<String>,
        policy_profile: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            status: RunStatus::Created,
            mode,
            model_name: model_name.into(),
            connector_name: connector_name.into(),
            policy_profile: policy_profile.into(),
            prompt: prompt.into(),
            output: String::new(),
            previous_hash: None,
            current_hash: String::new(),
            risk_score: 0.0,
            completed_at: None,
            error: None,
        }
    }

    /// Link this run to the previous run in a chain
    pub fn with_previous_hash(mut self, previous_hash: Option<String>) -> Self {
        self.previous_hash = previous_hash.filter(|h| !h.trim().is_empty());
        self
    }

    /// Move to a new stage. Terminal states are never left.
    pub fn advance(&mut self, status: RunStatus) {
        if self.status.is_terminal() {
            return;
        }
        self.status = status;
        if status.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
    }

    /// Force the run into the Failed state with maximum risk
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.risk_score = 1.0;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }

    /// Check if the run has reached Completed or Failed
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Lifecycle stage of a run
///
/// Serialized by name so stored records survive reordering of variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Created,
    Generating,
    Extracting,
    ContractRetry,
    Validating,
    Scoring,
    Hashing,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Generating => "generating",
            Self::Extracting => "extracting",
            Self::ContractRetry => "contract_retry",
            Self::Validating => "validating",
            Self::Scoring => "scoring",
            Self::Hashing => "hashing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl Default for RunStatus {
    fn default() -> Self {
        Self::Created
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the analyzed text was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Prompt the model, then audit its output
    GenerateAndAudit,

    /// Audit caller-supplied text
    VerifyOnly,
}

impl Default for RunMode {
    fn default() -> Self {
        Self::GenerateAndAudit
    }
}
