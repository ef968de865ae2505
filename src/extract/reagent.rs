//! Reagent, solvent and condition role extraction.

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use super::lexicon::{LexiconEntry, LEXICON};
use super::steps::StepIndex;
use super::{ClaimExtractor, ExtractionError};
use crate::domain::{Claim, ClaimKind, ClaimPayload};
use crate::evidence::format_locator;

struct CompiledEntry {
    entry: &'static LexiconEntry,
    pattern: Regex,
}

static COMPILED: LazyLock<Vec<CompiledEntry>> = LazyLock::new(|| {
    LEXICON
        .iter()
        .map(|entry| {
            let escaped = regex::escape(entry.term);
            let source = if entry.ignore_case {
                format!("(?i){}", escaped)
            } else {
                escaped
            };
            CompiledEntry {
                entry,
                pattern: Regex::new(&source).expect("escaped lexicon term compiles"),
            }
        })
        .collect()
});

/// A term must not run into letters or digits on either side
fn is_standalone(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

/// Extracts role-tagged vocabulary with step indices
#[derive(Debug, Default)]
pub struct ReagentExtractor;

impl ReagentExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl ClaimExtractor for ReagentExtractor {
    fn name(&self) -> &str {
        "ReagentExtractor"
    }

    fn extract(&self, run_id: Uuid, text: &str) -> Result<Vec<Claim>, ExtractionError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<(usize, usize, &'static LexiconEntry)> = COMPILED
            .iter()
            .flat_map(|compiled| {
                compiled
                    .pattern
                    .find_iter(text)
                    .filter(|m| is_standalone(text, m.start(), m.end()))
                    .map(move |m| (m.start(), m.end(), compiled.entry))
            })
            .collect();

        // Longest match wins at each position; overlapping shorter terms are dropped
        hits.sort_by(|a, b| a.0.cmp(&b.0).then((b.1 - b.0).cmp(&(a.1 - a.0))));
        let mut kept: Vec<(usize, usize, &'static LexiconEntry)> = Vec::new();
        for hit in hits {
            match kept.last() {
                Some(last) if hit.0 < last.1 => {}
                _ => kept.push(hit),
            }
        }

        let steps = StepIndex::detect(text);
        let claims = kept
            .into_iter()
            .map(|(start, end, entry)| {
                let payload = ClaimPayload {
                    context_key: Some(entry.role.as_str().to_string()),
                    role: Some(entry.role),
                    tags: entry.tags.iter().map(|t| t.to_string()).collect(),
                    ..Default::default()
                };
                Claim::new(
                    run_id,
                    ClaimKind::ReagentRole,
                    &text[start..end],
                    entry.canonical,
                    format_locator(start, end),
                )
                .with_step(steps.step_at(start))
                .with_entity_key(entry.canonical.to_lowercase())
                .with_payload(payload)
            })
            .collect();

        Ok(claims)
    }
}
