//! Numeric rules: cross-mention contradictions, percentage bounds and
//! stoichiometry sanity.
//!
//! The contradiction rule classifies the same raw signal (two differing
//! values for one context key) two ways: a contradiction by default, or a
//! multi-scenario report when connecting language such as "also tested"
//! sits near either value.

use std::collections::BTreeMap;

use uuid::Uuid;

use super::{claims_of_kind, ensure_owned, text_window, ValidationError, Validator};
use crate::domain::{Claim, ClaimKind, Finding, FindingKind, Run};
use crate::evidence::try_parse;

/// Bytes scanned on each side of a conflicting claim for scenario cues
pub const SCENARIO_WINDOW: usize = 160;

pub const DEFAULT_SCENARIO_CUES: &[&str] = &[
    "also tested",
    "alternatively",
    "alternative route",
    "alternative conditions",
    "in a separate",
    "another run",
    "second run",
    "repeated at",
    "variant",
    "by contrast",
    "control experiment",
    "screened",
    "entry",
];

const RANGE_TOLERANCE: f64 = 1e-9;

/// Convert a claim's interval into the base unit of its dimension
fn comparable_bounds(claim: &Claim) -> Option<(f64, f64, &'static str)> {
    let (low, high) = claim.numeric_bounds()?;
    let (scale, offset, base) = match claim.unit.as_deref()? {
        "°C" => (1.0, 0.0, "°C"),
        "K" => (1.0, -273.15, "°C"),
        "h" => (1.0, 0.0, "h"),
        "min" => (1.0 / 60.0, 0.0, "h"),
        "M" => (1.0, 0.0, "M"),
        "mM" => (1e-3, 0.0, "M"),
        "μM" => (1e-6, 0.0, "M"),
        "g" => (1.0, 0.0, "g"),
        "mg" => (1e-3, 0.0, "g"),
        "kg" => (1e3, 0.0, "g"),
        "L" => (1.0, 0.0, "L"),
        "mL" => (1e-3, 0.0, "L"),
        "μL" => (1e-6, 0.0, "L"),
        "mol" => (1.0, 0.0, "mol"),
        "mmol" => (1e-3, 0.0, "mol"),
        "bar" => (1.0, 0.0, "bar"),
        "mbar" => (1e-3, 0.0, "bar"),
        "atm" => (1.01325, 0.0, "bar"),
        "psi" => (0.0689476, 0.0, "bar"),
        "Torr" => (1.01325 / 760.0, 0.0, "bar"),
        "%" => (1.0, 0.0, "%"),
        "wt%" => (1.0, 0.0, "wt%"),
        "ppm" => (1.0, 0.0, "ppm"),
        "equiv" => (1.0, 0.0, "equiv"),
        _ => return None,
    };
    Some((low * scale + offset, high * scale + offset, base))
}

fn overlaps(a: (f64, f64), b: (f64, f64)) -> bool {
    a.0 <= b.1 + RANGE_TOLERANCE && b.0 <= a.1 + RANGE_TOLERANCE
}

/// Groups numeric claims by entity key and flags disagreeing values
#[derive(Debug, Clone)]
pub struct NumericContradiction {
    cues: Vec<String>,
    window: usize,
}

impl Default for NumericContradiction {
    fn default() -> Self {
        Self {
            cues: DEFAULT_SCENARIO_CUES.iter().map(|c| c.to_string()).collect(),
            window: SCENARIO_WINDOW,
        }
    }
}

impl NumericContradiction {
    /// Replace the scenario cue vocabulary (matched case-insensitively)
    pub fn with_cues<I, S>(mut self, cues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cues = cues.into_iter().map(|c| c.into().to_lowercase()).collect();
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// First cue found near either claim
    fn scenario_cue(&self, text: &str, claims: [&Claim; 2]) -> Option<&str> {
        claims.iter().find_map(|claim| {
            let (start, end) = try_parse(&claim.locator)?;
            let window = text_window(text, start, end, self.window).to_lowercase();
            self.cues
                .iter()
                .find(|cue| window.contains(cue.as_str()))
                .map(String::as_str)
        })
    }

    fn judge_group(&self, run_id: Uuid, key: &str, group: &[(&Claim, (f64, f64))], text: &str) -> Finding {
        let first = group[0].0;

        if group.len() == 1 {
            return Finding::unverified(
                run_id,
                self.name(),
                format!("Only one '{}' value ({}); no cross-reference available", key, first.raw),
            )
            .for_claim(first)
            .with_kind(FindingKind::NotCheckable)
            .with_confidence(0.5);
        }

        let conflict = group.iter().enumerate().find_map(|(i, (a, a_bounds))| {
            group[i + 1..]
                .iter()
                .find(|(_, b_bounds)| !overlaps(*a_bounds, *b_bounds))
                .map(|(b, _)| (*a, *b))
        });

        let Some((earlier, later)) = conflict else {
            return Finding::pass(
                run_id,
                self.name(),
                format!("All {} '{}' values are consistent", group.len(), key),
            )
            .for_claim(first)
            .with_confidence(0.7);
        };

        match self.scenario_cue(text, [earlier, later]) {
            Some(cue) => Finding::unverified(
                run_id,
                self.name(),
                format!(
                    "'{}' reported as {} and {}; text describes separate experiments ('{}')",
                    key, earlier.raw, later.raw, cue
                ),
            )
            .for_claim(later)
            .with_kind(FindingKind::MultiScenario)
            .with_confidence(0.6),
            None => Finding::fail(
                run_id,
                self.name(),
                format!("Possible contradiction: '{}' reported as {} and {}", key, earlier.raw, later.raw),
            )
            .for_claim(later)
            .with_kind(FindingKind::Contradiction)
            .with_confidence(0.8),
        }
    }
}

impl Validator for NumericContradiction {
    fn name(&self) -> &str {
        "NumericContradiction"
    }

    fn validate(&self, run_id: Uuid, claims: &[Claim], run: &Run) -> Result<Vec<Finding>, ValidationError> {
        ensure_owned(run_id, claims)?;

        // (entity key, base unit) -> claims with intervals in base units
        let mut groups: BTreeMap<(String, &'static str), Vec<(&Claim, (f64, f64))>> = BTreeMap::new();
        for claim in claims_of_kind(claims, ClaimKind::NumericWithUnit) {
            let Some(key) = claim.entity_key.as_deref() else {
                continue;
            };
            let Some((low, high, base)) = comparable_bounds(claim) else {
                continue;
            };
            groups
                .entry((key.to_string(), base))
                .or_default()
                .push((claim, (low, high)));
        }

        let findings = groups
            .iter()
            .map(|((key, _), group)| self.judge_group(run_id, key, group, &run.output))
            .collect();

        Ok(findings)
    }
}

/// Percentages must lie within 0-100
#[derive(Debug, Default)]
pub struct PercentageBounds;

impl Validator for PercentageBounds {
    fn name(&self) -> &str {
        "PercentageBounds"
    }

    fn validate(&self, run_id: Uuid, claims: &[Claim], _run: &Run) -> Result<Vec<Finding>, ValidationError> {
        ensure_owned(run_id, claims)?;

        let percentages: Vec<&Claim> = claims_of_kind(claims, ClaimKind::NumericWithUnit)
            .into_iter()
            .filter(|c| matches!(c.unit.as_deref(), Some("%") | Some("wt%")))
            .collect();

        let mut findings: Vec<Finding> = percentages
            .iter()
            .filter(|c| {
                c.numeric_bounds()
                    .is_some_and(|(low, high)| low < 0.0 || high > 100.0)
            })
            .map(|c| {
                Finding::fail(
                    run_id,
                    self.name(),
                    format!("{} is outside 0-100%", c.raw),
                )
                .for_claim(c)
                .with_kind(FindingKind::OutOfRange)
                .with_confidence(0.9)
            })
            .collect();

        if findings.is_empty() && !percentages.is_empty() {
            findings.push(
                Finding::pass(
                    run_id,
                    self.name(),
                    format!("All {} percentages are within 0-100%", percentages.len()),
                )
                .with_confidence(0.8),
            );
        }

        Ok(findings)
    }
}

/// Stoichiometry sanity for `equiv` claims
#[derive(Debug, Default)]
pub struct EquivalentsConsistency;

impl EquivalentsConsistency {
    /// Plausible upper bound for a single reagent
    pub const MAX_EQUIVALENTS: f64 = 20.0;
}

impl Validator for EquivalentsConsistency {
    fn name(&self) -> &str {
        "EquivalentsConsistency"
    }

    fn validate(&self, run_id: Uuid, claims: &[Claim], _run: &Run) -> Result<Vec<Finding>, ValidationError> {
        ensure_owned(run_id, claims)?;

        let equivalents: Vec<(&Claim, (f64, f64))> = claims_of_kind(claims, ClaimKind::NumericWithUnit)
            .into_iter()
            .filter(|c| c.unit.as_deref() == Some("equiv"))
            .filter_map(|c| c.numeric_bounds().map(|b| (c, b)))
            .collect();

        if equivalents.is_empty() {
            return Ok(Vec::new());
        }

        let mut findings: Vec<Finding> = equivalents
            .iter()
            .filter(|(_, (low, high))| *low <= 0.0 || *high > Self::MAX_EQUIVALENTS)
            .map(|(c, _)| {
                Finding::fail(
                    run_id,
                    self.name(),
                    format!(
                        "{} is not a plausible stoichiometry (expected >0 and <= {})",
                        c.raw,
                        Self::MAX_EQUIVALENTS
                    ),
                )
                .for_claim(c)
                .with_kind(FindingKind::OutOfRange)
                .with_confidence(0.7)
            })
            .collect();

        if findings.is_empty() {
            findings.push(
                Finding::pass(
                    run_id,
                    self.name(),
                    format!("{} equivalents values are plausible", equivalents.len()),
                )
                .with_confidence(0.6),
            );
        }

        let has_reference = equivalents
            .iter()
            .any(|(_, (low, high))| *low <= 1.0 + 0.05 && *high >= 1.0 - 0.05);
        if equivalents.len() >= 2 && !has_reference {
            findings.push(
                Finding::unverified(
                    run_id,
                    self.name(),
                    "No reagent is stated at 1.0 equiv; limiting reagent is implicit",
                )
                .with_kind(FindingKind::NotCheckable)
                .with_confidence(0.4),
            );
        }

        Ok(findings)
    }
}
