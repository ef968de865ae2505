//! Extraction Integration Tests
//!
//! Runs the default composite extractor over realistic procedures and
//! checks claim kinds, steps and locators together.

use chemaudit::domain::{ClaimKind, FindingKind, FindingStatus, ReagentRole};
use chemaudit::evidence::try_parse;
use chemaudit::extract::{ClaimExtractor, CompositeExtractor, ExtractionError};
use chemaudit::Claim;
use uuid::Uuid;

const PROCEDURE: &str = "\
Step 1: NaH (1.2 equiv) was suspended in dry THF under argon and cooled to 0 °C.
Step 2: The aldehyde was added and the mixture stirred for 2 h at 25 °C.
Step 3: The reaction was quenched with water; the product was isolated in 80-85% yield (doi:10.1021/ol0000001).";

/// Extractor that always reports a failure
struct Broken;

impl ClaimExtractor for Broken {
    fn name(&self) -> &str {
        "Broken"
    }

    fn extract(&self, _run_id: Uuid, _text: &str) -> Result<Vec<Claim>, ExtractionError> {
        Err(ExtractionError::InvalidInput("unsupported encoding".to_string()))
    }
}

#[test]
fn test_procedure_yields_every_claim_kind() {
    let run_id = Uuid::new_v4();
    let outcome = CompositeExtractor::with_defaults().extract(run_id, PROCEDURE);

    assert!(outcome.diagnostics.is_empty());
    for kind in [ClaimKind::NumericWithUnit, ClaimKind::CitationIdentifier, ClaimKind::ReagentRole] {
        assert!(outcome.claims.iter().any(|c| c.kind == kind), "missing {:?}", kind);
    }
    assert!(outcome.claims.iter().all(|c| c.run_id == run_id));
}

#[test]
fn test_locators_point_at_raw_text() {
    let outcome = CompositeExtractor::with_defaults().extract(Uuid::new_v4(), PROCEDURE);

    for claim in &outcome.claims {
        let (start, end) = try_parse(&claim.locator).expect("well-formed locator");
        assert_eq!(&PROCEDURE[start..end], claim.raw, "{:?}", claim);
    }
}

#[test]
fn test_steps_are_shared_across_extractors() {
    let outcome = CompositeExtractor::with_defaults().extract(Uuid::new_v4(), PROCEDURE);

    let temps: Vec<_> = outcome
        .claims
        .iter()
        .filter(|c| c.context_key() == Some("temp"))
        .map(|c| c.step)
        .collect();
    assert_eq!(temps, vec![Some(1), Some(2)]);

    let thf = outcome
        .claims
        .iter()
        .find(|c| c.kind == ClaimKind::ReagentRole && c.normalized == "THF")
        .expect("THF claim");
    assert_eq!(thf.payload.role, Some(ReagentRole::Solvent));
    assert_eq!(thf.step, Some(1));

    let quench = outcome
        .claims
        .iter()
        .find(|c| c.payload.role == Some(ReagentRole::Quench))
        .expect("quench claim");
    assert_eq!(quench.step, Some(3));
}

#[test]
fn test_yield_range_keeps_both_bounds() {
    let outcome = CompositeExtractor::with_defaults().extract(Uuid::new_v4(), PROCEDURE);

    let yield_claim = outcome
        .claims
        .iter()
        .find(|c| c.context_key() == Some("yield"))
        .expect("yield claim");
    assert_eq!(yield_claim.raw, "80-85%");
    assert_eq!(yield_claim.normalized, "85");
    assert_eq!(yield_claim.numeric_bounds(), Some((80.0, 85.0)));
}

#[test]
fn test_failing_extractor_becomes_diagnostic() {
    let composite = CompositeExtractor::with_defaults().with_extractor(Broken);
    let outcome = composite.extract(Uuid::new_v4(), PROCEDURE);

    assert!(!outcome.claims.is_empty());
    assert_eq!(outcome.diagnostics.len(), 1);

    let diagnostic = &outcome.diagnostics[0];
    assert_eq!(diagnostic.validator, "Broken");
    assert_eq!(diagnostic.status, FindingStatus::Unverified);
    assert_eq!(diagnostic.kind, Some(FindingKind::ExtractionFailure));
    assert_eq!(diagnostic.confidence, 0.0);
    assert!(diagnostic.message.contains("unsupported encoding"));
}

#[test]
fn test_empty_and_unrelated_text() {
    let composite = CompositeExtractor::with_defaults();
    for text in ["", "   ", "The weather was pleasant and nobody ran a reaction."] {
        let outcome = composite.extract(Uuid::new_v4(), text);
        assert!(outcome.claims.is_empty(), "{:?}", text);
        assert!(outcome.diagnostics.is_empty());
    }
}
