//! Citation checks: identifier grammar and consistent citation style.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use super::{claims_of_kind, ensure_owned, ValidationError, Validator};
use crate::domain::{Claim, ClaimKind, Finding, FindingKind, Run};
use crate::evidence::{format_locator, try_parse};

/// DOI grammar: `10.` + 4-9 digit registrant + `/` + suffix (already lower-cased)
static DOI_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^10\.\d{4,9}(?:\.\d+)*/[-._;()/:a-z0-9<>\[\]+#]+$").expect("doi grammar compiles")
});

static NUMERIC_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\d{1,3}(?:\s*[,–-]\s*\d{1,3})*\]").expect("numeric reference pattern compiles")
});

static AUTHOR_YEAR_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\([A-Z][A-Za-z'-]+(?: et al\.?| and [A-Z][A-Za-z'-]+)?,? (?:19|20)\d{2}[a-z]?\)",
        r"|\b[A-Z][A-Za-z'-]+ et al\.? \((?:19|20)\d{2}[a-z]?\)"
    ))
    .expect("author-year pattern compiles")
});

/// Checks citation identifiers against the DOI grammar
#[derive(Debug, Default)]
pub struct DoiFormat;

impl Validator for DoiFormat {
    fn name(&self) -> &str {
        "DoiFormat"
    }

    fn validate(&self, run_id: Uuid, claims: &[Claim], _run: &Run) -> Result<Vec<Finding>, ValidationError> {
        ensure_owned(run_id, claims)?;

        let findings = claims_of_kind(claims, ClaimKind::CitationIdentifier)
            .into_iter()
            .map(|claim| {
                if DOI_GRAMMAR.is_match(&claim.normalized) {
                    Finding::pass(run_id, self.name(), format!("Well-formed DOI {}", claim.normalized))
                        .for_claim(claim)
                        .with_confidence(0.9)
                } else {
                    Finding::fail(run_id, self.name(), format!("Malformed DOI '{}'", claim.raw))
                        .for_claim(claim)
                        .with_kind(FindingKind::Malformed)
                        .with_confidence(0.95)
                }
            })
            .collect();

        Ok(findings)
    }
}

/// Flags texts that cite in more than one style
#[derive(Debug, Default)]
pub struct MixedCitationStyle;

impl Validator for MixedCitationStyle {
    fn name(&self) -> &str {
        "MixedCitationStyle"
    }

    fn validate(&self, run_id: Uuid, claims: &[Claim], run: &Run) -> Result<Vec<Finding>, ValidationError> {
        ensure_owned(run_id, claims)?;

        let text = &run.output;

        let mut markers: Vec<(usize, usize, &'static str)> = claims_of_kind(claims, ClaimKind::CitationIdentifier)
            .into_iter()
            .filter_map(|c| try_parse(&c.locator))
            .map(|(start, end)| (start, end, "DOI"))
            .collect();
        markers.extend(NUMERIC_REFERENCE.find_iter(text).map(|m| (m.start(), m.end(), "numbered")));
        markers.extend(AUTHOR_YEAR_REFERENCE.find_iter(text).map(|m| (m.start(), m.end(), "author-year")));
        markers.sort();

        // Evidence points at the first citation that breaks the initial style
        let mut styles = BTreeSet::new();
        let mut first_break = None;
        for (start, end, style) in markers {
            if styles.insert(style) && styles.len() == 2 {
                first_break = Some((start, end));
            }
        }

        let findings = match styles.len() {
            0 => Vec::new(),
            1 => {
                let style = styles.first().copied().unwrap_or_default();
                vec![Finding::pass(run_id, self.name(), format!("Citations use a single style ({})", style))
                    .with_confidence(0.7)]
            }
            _ => {
                let listed: Vec<&str> = styles.into_iter().collect();
                let mut finding = Finding::fail(
                    run_id,
                    self.name(),
                    format!("Mixed citation styles: {}", listed.join(", ")),
                )
                .with_kind(FindingKind::MixedStyle)
                .with_confidence(0.5);
                if let Some((start, end)) = first_break {
                    finding = finding.with_evidence_ref(format_locator(start, end));
                }
                vec![finding]
            }
        };

        Ok(findings)
    }
}
