//! Validator verdicts.
//!
//! Unverified covers both genuinely uncheckable claims and contained
//! validator crashes; `kind` and `confidence` tell the two apart.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::claim::Claim;

/// Validator name used for the synthetic pipeline-failure finding
pub const PIPELINE_VALIDATOR: &str = "Pipeline";

/// One validator verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Unique identifier for this finding
    pub id: Uuid,

    /// Run this finding belongs to
    pub run_id: Uuid,

    /// Claim this finding is about (None for global findings)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_id: Option<Uuid>,

    /// Name of the validator (or extractor) that produced it
    pub validator: String,

    /// Verdict
    pub status: FindingStatus,

    /// Classification used by scoring and reporting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FindingKind>,

    /// Human-readable explanation
    pub message: String,

    /// Confidence in [0, 1]
    pub confidence: f64,

    /// Locator string pointing at the offending text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_ref: Option<String>,

    /// Span and snippet resolved after validation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<EvidenceSpan>,

    /// Step of the underlying claim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<u32>,

    /// Entity key of the underlying claim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_key: Option<String>,
}

impl Finding {
    /// Create a new finding with default confidence
    pub fn new(
        run_id: Uuid,
        validator: impl Into<String>,
        status: FindingStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id,
            claim_id: None,
            validator: validator.into(),
            status,
            kind: None,
            message: message.into(),
            confidence: 0.5,
            evidence_ref: None,
            evidence: None,
            step: None,
            entity_key: None,
        }
    }

    pub fn pass(run_id: Uuid, validator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(run_id, validator, FindingStatus::Pass, message)
    }

    pub fn fail(run_id: Uuid, validator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(run_id, validator, FindingStatus::Fail, message)
    }

    pub fn unverified(run_id: Uuid, validator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(run_id, validator, FindingStatus::Unverified, message)
    }

    /// Scope the finding to a claim; the claim's locator becomes the evidence reference
    pub fn for_claim(mut self, claim: &Claim) -> Self {
        self.claim_id = Some(claim.id);
        if self.evidence_ref.is_none() {
            self.evidence_ref = Some(claim.locator.clone());
        }
        self
    }

    pub fn with_kind(mut self, kind: FindingKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    pub fn with_evidence_ref(mut self, locator: impl Into<String>) -> Self {
        self.evidence_ref = Some(locator.into());
        self
    }
}

/// Verdict of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    Pass,
    Fail,
    Unverified,
}

impl FindingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Unverified => "unverified",
        }
    }
}

impl std::fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification tag carried by findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    /// Only one mention; nothing to cross-check against
    NotCheckable,
    /// Differing values explained by distinct experimental branches
    MultiScenario,
    /// Differing values for the same quantity
    Contradiction,
    /// Value outside its physical or plausible range
    OutOfRange,
    /// Token or identifier that does not parse
    Malformed,
    /// Reagent and solvent that should not be combined
    Incompatible,
    /// Something the procedure implies but never states
    Missing,
    /// Steps in an implausible order
    Ordering,
    /// Conditions that contradict each other (dry vs aqueous, inert vs air)
    ConditionMismatch,
    /// Qualifier without the value it qualifies
    Incomplete,
    /// More than one citation convention in one text
    MixedStyle,
    /// An extractor failed
    ExtractionFailure,
    /// A validator failed
    ValidatorFailure,
    /// The pipeline itself failed
    PipelineFailure,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotCheckable => "not-checkable",
            Self::MultiScenario => "multi-scenario",
            Self::Contradiction => "contradiction",
            Self::OutOfRange => "out-of-range",
            Self::Malformed => "malformed",
            Self::Incompatible => "incompatible",
            Self::Missing => "missing",
            Self::Ordering => "ordering",
            Self::ConditionMismatch => "condition-mismatch",
            Self::Incomplete => "incomplete",
            Self::MixedStyle => "mixed-style",
            Self::ExtractionFailure => "extraction-failure",
            Self::ValidatorFailure => "validator-failure",
            Self::PipelineFailure => "pipeline-failure",
        }
    }
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved location of a finding in the analyzed text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceSpan {
    /// Start byte offset
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
    /// Surrounding text with ellipsis markers where truncated
    pub snippet: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ClaimKind;

    #[test]
    fn test_finding_for_claim_takes_locator() {
        let run_id = Uuid::new_v4();
        let claim = Claim::new(run_id, ClaimKind::NumericWithUnit, "5 h", "5", "output:3-6");
        let finding = Finding::fail(run_id, "NumericContradiction", "bad").for_claim(&claim);

        assert_eq!(finding.claim_id, Some(claim.id));
        assert_eq!(finding.evidence_ref.as_deref(), Some("output:3-6"));
    }

    #[test]
    fn test_confidence_is_clamped() {
        let finding = Finding::pass(Uuid::new_v4(), "x", "ok").with_confidence(1.7);
        assert_eq!(finding.confidence, 1.0);

        let finding = Finding::pass(Uuid::new_v4(), "x", "ok").with_confidence(f64::NAN);
        assert_eq!(finding.confidence, 0.0);
    }

    #[test]
    fn test_kind_serializes_kebab_case() {
        let finding = Finding::unverified(Uuid::new_v4(), "x", "single mention")
            .with_kind(FindingKind::NotCheckable);
        let json = serde_json::to_value(&finding).unwrap();

        assert_eq!(json["kind"], "not-checkable");
        assert_eq!(json["status"], "unverified");
        assert_eq!(FindingKind::NotCheckable.as_str(), "not-checkable");
    }
}
