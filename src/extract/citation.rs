//! Citation identifier (DOI) extraction.

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use super::steps::StepIndex;
use super::{ClaimExtractor, ExtractionError};
use crate::domain::{Claim, ClaimKind, ClaimPayload};
use crate::evidence::format_locator;

/// `doi: <anything>` or a bare `10.<registrant>/<suffix>`
static DOI_CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bdoi:\s*(?P<labelled>\S+)|\b(?P<bare>10\.[0-9A-Za-z]+/\S*)")
        .expect("doi pattern compiles")
});

/// Strip sentence punctuation and unbalanced closing brackets
fn trim_identifier(candidate: &str) -> &str {
    let mut id = candidate;
    loop {
        let before = id.len();
        id = id.trim_end_matches(['.', ',', ';', ':', '"', '\'', '>']);
        for (open, close) in [('(', ')'), ('[', ']')] {
            if id.ends_with(close) && id.matches(close).count() > id.matches(open).count() {
                id = &id[..id.len() - close.len_utf8()];
            }
        }
        if id.len() == before {
            return id;
        }
    }
}

/// Extracts persistent identifiers; well-formedness is checked downstream
#[derive(Debug, Default)]
pub struct CitationExtractor;

impl CitationExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl ClaimExtractor for CitationExtractor {
    fn name(&self) -> &str {
        "CitationExtractor"
    }

    fn extract(&self, run_id: Uuid, text: &str) -> Result<Vec<Claim>, ExtractionError> {
        let steps = StepIndex::detect(text);
        let mut claims = Vec::new();

        for caps in DOI_CANDIDATE.captures_iter(text) {
            let Some(m) = caps.name("labelled").or_else(|| caps.name("bare")) else {
                continue;
            };
            let id = trim_identifier(m.as_str());
            if id.is_empty() {
                continue;
            }

            let start = m.start();
            let end = start + id.len();
            let payload = ClaimPayload {
                context_key: Some("citation".to_string()),
                ..Default::default()
            };

            claims.push(
                Claim::new(
                    run_id,
                    ClaimKind::CitationIdentifier,
                    id,
                    id.to_lowercase(),
                    format_locator(start, end),
                )
                .with_step(steps.step_at(start))
                .with_payload(payload),
            );
        }

        Ok(claims)
    }
}
