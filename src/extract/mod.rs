//! Claim extraction from analyzed text.
//!
//! Extractors are independent pattern matchers. The [`CompositeExtractor`]
//! runs all of them over the same text and turns any extractor failure
//! (error or panic) into a diagnostic finding instead of aborting.

pub mod citation;
pub mod lexicon;
pub mod numeric;
pub mod reagent;
pub mod steps;

use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::contain::contain;
use crate::domain::{Claim, Finding, FindingKind};
use crate::evidence::try_parse;

pub use citation::CitationExtractor;
pub use numeric::NumericExtractor;
pub use reagent::ReagentExtractor;
pub use steps::StepIndex;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Input rejected: {0}")]
    InvalidInput(String),

    #[error("Pattern error: {0}")]
    Pattern(String),

    #[error("Extraction failed: {0}")]
    Failed(String),
}

/// A pure pattern matcher producing typed claims.
///
/// Implementations must return an empty list, not an error, for empty or
/// unmatched text.
pub trait ClaimExtractor: Send + Sync {
    /// Stable name, used as the validator name of diagnostic findings
    fn name(&self) -> &str;

    /// Extract claims in text order
    fn extract(&self, run_id: Uuid, text: &str) -> Result<Vec<Claim>, ExtractionError>;
}

/// Result of running every extractor over one text
#[derive(Debug, Default)]
pub struct ExtractionOutcome {
    pub claims: Vec<Claim>,

    /// One Unverified finding per failed extractor
    pub diagnostics: Vec<Finding>,
}

/// Ordered fan-out over a list of extractors
pub struct CompositeExtractor {
    extractors: Vec<Box<dyn ClaimExtractor>>,
}

impl Default for CompositeExtractor {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl CompositeExtractor {
    /// An empty composite
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Numeric, citation and reagent extractors, in that order
    pub fn with_defaults() -> Self {
        Self::new()
            .with_extractor(NumericExtractor::new())
            .with_extractor(CitationExtractor::new())
            .with_extractor(ReagentExtractor::new())
    }

    pub fn with_extractor(mut self, extractor: impl ClaimExtractor + 'static) -> Self {
        self.register(Box::new(extractor));
        self
    }

    pub fn register(&mut self, extractor: Box<dyn ClaimExtractor>) {
        self.extractors.push(extractor);
    }

    pub fn names(&self) -> Vec<&str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }

    /// Run every extractor; failures become diagnostics
    pub fn extract(&self, run_id: Uuid, text: &str) -> ExtractionOutcome {
        let mut outcome = ExtractionOutcome::default();

        for extractor in &self.extractors {
            let name = extractor.name();
            let result = contain(|| extractor.extract(run_id, text));

            let failure = match result {
                Ok(Ok(claims)) => {
                    let before = claims.len();
                    let claims: Vec<Claim> = claims
                        .into_iter()
                        .filter(|c| locator_in_bounds(&c.locator, text))
                        .collect();
                    if claims.len() < before {
                        warn!(
                            extractor = name,
                            dropped = before - claims.len(),
                            "Dropped claims with out-of-bounds locators"
                        );
                    }
                    debug!(extractor = name, claims = claims.len(), "Extractor finished");
                    outcome.claims.extend(claims);
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(panic) => format!("Extractor panicked: {}", panic),
            };

            warn!(extractor = name, error = %failure, "Extractor failed; continuing");
            outcome.diagnostics.push(
                Finding::unverified(run_id, name, failure)
                    .with_kind(FindingKind::ExtractionFailure)
                    .with_confidence(0.0),
            );
        }

        outcome
    }
}

fn locator_in_bounds(locator: &str, text: &str) -> bool {
    try_parse(locator).is_some_and(|(start, end)| end <= text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClaimKind, FindingStatus};

    struct Failing;

    impl ClaimExtractor for Failing {
        fn name(&self) -> &str {
            "Failing"
        }

        fn extract(&self, _run_id: Uuid, _text: &str) -> Result<Vec<Claim>, ExtractionError> {
            Err(ExtractionError::Failed("boom".to_string()))
        }
    }

    struct Panicking;

    impl ClaimExtractor for Panicking {
        fn name(&self) -> &str {
            "Panicking"
        }

        fn extract(&self, _run_id: Uuid, _text: &str) -> Result<Vec<Claim>, ExtractionError> {
            panic!("index out of range")
        }
    }

    struct OutOfBounds;

    impl ClaimExtractor for OutOfBounds {
        fn name(&self) -> &str {
            "OutOfBounds"
        }

        fn extract(&self, run_id: Uuid, _text: &str) -> Result<Vec<Claim>, ExtractionError> {
            Ok(vec![Claim::new(run_id, ClaimKind::NumericWithUnit, "x", "1", "output:0-999")])
        }
    }

    #[test]
    fn test_defaults_cover_all_kinds() {
        let composite = CompositeExtractor::with_defaults();
        assert_eq!(
            composite.names(),
            vec!["NumericExtractor", "CitationExtractor", "ReagentExtractor"]
        );

        let outcome = composite.extract(
            Uuid::new_v4(),
            "NaH in THF at 0 °C gave 85% yield (doi:10.1021/ol000001).",
        );
        assert!(outcome.diagnostics.is_empty());
        for kind in [ClaimKind::NumericWithUnit, ClaimKind::CitationIdentifier, ClaimKind::ReagentRole] {
            assert!(outcome.claims.iter().any(|c| c.kind == kind), "missing {:?}", kind);
        }
    }

    #[test]
    fn test_failures_become_diagnostics() {
        let composite = CompositeExtractor::new()
            .with_extractor(Failing)
            .with_extractor(Panicking)
            .with_extractor(NumericExtractor::new());

        let outcome = composite.extract(Uuid::new_v4(), "stirred for 2 h");

        assert_eq!(outcome.claims.len(), 1);
        assert_eq!(outcome.diagnostics.len(), 2);
        for (finding, name) in outcome.diagnostics.iter().zip(["Failing", "Panicking"]) {
            assert_eq!(finding.validator, name);
            assert_eq!(finding.status, FindingStatus::Unverified);
            assert_eq!(finding.kind, Some(FindingKind::ExtractionFailure));
        }
        assert!(outcome.diagnostics[1].message.contains("index out of range"));
    }

    #[test]
    fn test_out_of_bounds_claims_are_dropped() {
        let composite = CompositeExtractor::new().with_extractor(OutOfBounds);
        let outcome = composite.extract(Uuid::new_v4(), "short");
        assert!(outcome.claims.is_empty());
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_empty_text() {
        let outcome = CompositeExtractor::with_defaults().extract(Uuid::new_v4(), "");
        assert!(outcome.claims.is_empty());
        assert!(outcome.diagnostics.is_empty());
    }
}
