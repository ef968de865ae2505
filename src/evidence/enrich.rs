//! Post-validation enrichment of findings with locatable evidence.

use std::collections::HashMap;

use uuid::Uuid;

use super::locator::{extract_snippet, try_parse};
use crate::domain::{Claim, EvidenceSpan, Finding};

/// Characters of context on each side of a finding's span
pub const SNIPPET_RADIUS: usize = 40;

/// Attach span, snippet, step and entity key to each finding.
///
/// The finding's own evidence reference wins over its claim's locator.
/// Findings whose locator cannot be resolved are left without a span.
pub fn enrich_findings(findings: &mut [Finding], claims: &[Claim], text: &str) {
    let by_id: HashMap<Uuid, &Claim> = claims.iter().map(|c| (c.id, c)).collect();

    for finding in findings.iter_mut() {
        let claim = finding.claim_id.and_then(|id| by_id.get(&id).copied());

        if let Some(claim) = claim {
            if finding.step.is_none() {
                finding.step = claim.step;
            }
            if finding.entity_key.is_none() {
                finding.entity_key = claim.entity_key.clone();
            }
        }

        let locator = finding
            .evidence_ref
            .as_deref()
            .or_else(|| claim.map(|c| c.locator.as_str()));

        finding.evidence = locator.and_then(|l| resolve_span(l, text));
    }
}

/// Resolve a locator into a span with snippet
pub fn resolve_span(locator: &str, text: &str) -> Option<EvidenceSpan> {
    let (start, end) = try_parse(locator)?;
    let snippet = extract_snippet(text, start, end, SNIPPET_RADIUS)?;
    Some(EvidenceSpan { start, end, snippet })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ClaimKind;
    use crate::evidence::format_locator;

    #[test]
    fn test_enrich_from_claim() {
        let text = "Heated at 80 °C.";
        let run_id = Uuid::new_v4();
        let claim = Claim::new(run_id, ClaimKind::NumericWithUnit, "80 °C", "80", format_locator(10, 16))
            .with_step(Some(2))
            .with_entity_key("temp");
        let mut findings = vec![Finding::unverified(run_id, "NumericContradiction", "single").for_claim(&claim)];

        enrich_findings(&mut findings, &[claim], text);

        let evidence = findings[0].evidence.as_ref().unwrap();
        assert_eq!((evidence.start, evidence.end), (10, 16));
        assert_eq!(evidence.snippet, text);
        assert_eq!(findings[0].step, Some(2));
        assert_eq!(findings[0].entity_key.as_deref(), Some("temp"));
    }

    #[test]
    fn test_malformed_locator_leaves_no_span() {
        let run_id = Uuid::new_v4();
        let mut findings = vec![Finding::fail(run_id, "x", "bad").with_evidence_ref("garbage")];

        enrich_findings(&mut findings, &[], "text");
        assert!(findings[0].evidence.is_none());
    }

    #[test]
    fn test_global_finding_without_locator() {
        let run_id = Uuid::new_v4();
        let mut findings = vec![Finding::pass(run_id, "x", "ok")];

        enrich_findings(&mut findings, &[], "text");
        assert!(findings[0].evidence.is_none());
        assert!(findings[0].step.is_none());
    }
}
