//! Risk scoring over a finding set.
//!
//! The score is the arithmetic mean of per-finding weights, so it is
//! bounded, order-independent and easy to explain line by line.

use serde::{Deserialize, Serialize};

use crate::domain::{Finding, FindingKind, FindingStatus};

/// Weight contributed by each finding status
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_fail")]
    pub fail: f64,

    #[serde(default = "default_unverified")]
    pub unverified: f64,

    /// Unverified findings of kind not-checkable
    #[serde(default = "default_not_checkable")]
    pub not_checkable: f64,

    #[serde(default)]
    pub pass: f64,
}

fn default_fail() -> f64 {
    1.0
}
fn default_unverified() -> f64 {
    0.3
}
fn default_not_checkable() -> f64 {
    0.05
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            fail: default_fail(),
            unverified: default_unverified(),
            not_checkable: default_not_checkable(),
            pass: 0.0,
        }
    }
}

/// Reduces findings to a risk number in [0, 1]
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    weights: ScoringWeights,
}

impl RiskScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Weight of one finding, clamped to [0, 1]
    pub fn weight(&self, finding: &Finding) -> f64 {
        let raw = match finding.status {
            FindingStatus::Fail => self.weights.fail,
            FindingStatus::Unverified if finding.kind == Some(FindingKind::NotCheckable) => {
                self.weights.not_checkable
            }
            FindingStatus::Unverified => self.weights.unverified,
            FindingStatus::Pass => self.weights.pass,
        };
        if raw.is_nan() {
            0.0
        } else {
            raw.clamp(0.0, 1.0)
        }
    }

    /// Mean weight; an empty set scores 0
    pub fn score(&self, findings: &[Finding]) -> f64 {
        if findings.is_empty() {
            return 0.0;
        }
        let total: f64 = findings.iter().map(|f| self.weight(f)).sum();
        (total / findings.len() as f64).clamp(0.0, 1.0)
    }
}

/// Severity tier derived from a risk score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskTier {
    pub fn from_score(score: f64) -> Self {
        if score <= 0.10 {
            Self::Low
        } else if score <= 0.35 {
            Self::Medium
        } else if score <= 0.65 {
            Self::High
        } else {
            Self::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn findings() -> Vec<Finding> {
        let run_id = Uuid::new_v4();
        vec![
            Finding::fail(run_id, "a", "x"),
            Finding::unverified(run_id, "b", "x"),
            Finding::unverified(run_id, "c", "x").with_kind(FindingKind::NotCheckable),
            Finding::pass(run_id, "d", "x"),
        ]
    }

    #[test]
    fn test_empty_scores_zero() {
        assert_eq!(RiskScorer::default().score(&[]), 0.0);
    }

    #[test]
    fn test_mean_of_weights() {
        let score = RiskScorer::default().score(&findings());
        assert!((score - (1.0 + 0.3 + 0.05 + 0.0) / 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_permutation_invariant() {
        let scorer = RiskScorer::default();
        let mut reversed = findings();
        reversed.reverse();
        assert!((scorer.score(&findings()) - scorer.score(&reversed)).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_weights_are_clamped() {
        let scorer = RiskScorer::new(ScoringWeights {
            fail: 5.0,
            unverified: f64::NAN,
            not_checkable: -1.0,
            pass: 0.0,
        });
        let score = scorer.score(&findings());
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn test_tiers() {
        assert_eq!(RiskTier::from_score(0.0), RiskTier::Low);
        assert_eq!(RiskTier::from_score(0.10), RiskTier::Low);
        assert_eq!(RiskTier::from_score(0.2), RiskTier::Medium);
        assert_eq!(RiskTier::from_score(0.5), RiskTier::High);
        assert_eq!(RiskTier::from_score(1.0), RiskTier::Critical);
    }
}
