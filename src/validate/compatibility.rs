//! Reagent compatibility rules for water-sensitive chemistry.
//!
//! All three rules key off reagents tagged `water-reactive`. A quench that
//! follows such a reagent closes its reactive window: protic solvents,
//! aqueous media and air after that point belong to the workup.

use std::collections::BTreeSet;

use uuid::Uuid;

use super::{claim_start, claims_with_role, ensure_owned, ValidationError, Validator};
use crate::domain::{Claim, Finding, FindingKind, ReagentRole, Run};
use crate::extract::lexicon::{TAG_AIR, TAG_DRY, TAG_INERT, TAG_PROTIC, TAG_WATER_REACTIVE, TAG_WET};

fn water_reactive(claims: &[Claim]) -> Vec<&Claim> {
    claims_with_role(claims, ReagentRole::Reagent)
        .into_iter()
        .filter(|c| c.has_tag(TAG_WATER_REACTIVE))
        .collect()
}

/// Offset of the first quench after `reagent` in the same step
fn quench_cutoff(claims: &[Claim], reagent: &Claim) -> usize {
    let start = claim_start(reagent);
    claims_with_role(claims, ReagentRole::Quench)
        .into_iter()
        .filter(|q| q.step == reagent.step)
        .map(claim_start)
        .find(|&q| q > start)
        .unwrap_or(usize::MAX)
}

/// Water-reactive reagents must not share a step with protic solvents
#[derive(Debug, Default)]
pub struct ReagentSolventCompatibility;

impl Validator for ReagentSolventCompatibility {
    fn name(&self) -> &str {
        "ReagentSolventCompatibility"
    }

    fn validate(&self, run_id: Uuid, claims: &[Claim], _run: &Run) -> Result<Vec<Finding>, ValidationError> {
        ensure_owned(run_id, claims)?;

        let reactive = water_reactive(claims);
        if reactive.is_empty() {
            return Ok(Vec::new());
        }

        let protic: Vec<&Claim> = claims_with_role(claims, ReagentRole::Solvent)
            .into_iter()
            .filter(|c| c.has_tag(TAG_PROTIC))
            .collect();

        let mut seen = BTreeSet::new();
        let mut findings = Vec::new();
        for reagent in &reactive {
            let cutoff = quench_cutoff(claims, reagent);
            for solvent in &protic {
                if solvent.step != reagent.step || claim_start(solvent) >= cutoff {
                    continue;
                }
                if !seen.insert((reagent.normalized.as_str(), solvent.normalized.as_str())) {
                    continue;
                }
                findings.push(
                    Finding::fail(
                        run_id,
                        self.name(),
                        format!(
                            "{} is water-reactive but {} (protic) is present before any quench",
                            reagent.normalized, solvent.normalized
                        ),
                    )
                    .for_claim(solvent)
                    .with_kind(FindingKind::Incompatible)
                    .with_confidence(0.75),
                );
            }
        }

        if findings.is_empty() {
            findings.push(
                Finding::pass(
                    run_id,
                    self.name(),
                    format!("No protic solvent shares a step with {}", reactive[0].normalized),
                )
                .with_confidence(0.7),
            );
        }

        Ok(findings)
    }
}

/// A water-reactive reagent should be quenched after it is used
#[derive(Debug, Default)]
pub struct QuenchOrdering;

impl Validator for QuenchOrdering {
    fn name(&self) -> &str {
        "QuenchOrdering"
    }

    fn validate(&self, run_id: Uuid, claims: &[Claim], _run: &Run) -> Result<Vec<Finding>, ValidationError> {
        ensure_owned(run_id, claims)?;

        let Some(reagent) = water_reactive(claims).into_iter().next() else {
            return Ok(Vec::new());
        };
        let reagent_start = claim_start(reagent);
        let quenches = claims_with_role(claims, ReagentRole::Quench);

        let finding = if let Some(quench) = quenches.iter().find(|q| claim_start(q) > reagent_start) {
            Finding::pass(run_id, self.name(), format!("{} is quenched after use", reagent.normalized))
                .for_claim(quench)
                .with_confidence(0.7)
        } else if let Some(quench) = quenches.first() {
            Finding::fail(
                run_id,
                self.name(),
                format!("Quench is described before {} is added", reagent.normalized),
            )
            .for_claim(quench)
            .with_kind(FindingKind::Ordering)
            .with_confidence(0.7)
        } else {
            Finding::unverified(
                run_id,
                self.name(),
                format!("No quench step is described for {}", reagent.normalized),
            )
            .for_claim(reagent)
            .with_kind(FindingKind::Missing)
            .with_confidence(0.4)
        };

        Ok(vec![finding])
    }
}

/// Water-reactive chemistry needs dry, inert conditions until the quench
#[derive(Debug, Default)]
pub struct DryInertAtmosphere;

impl Validator for DryInertAtmosphere {
    fn name(&self) -> &str {
        "DryInertAtmosphere"
    }

    fn validate(&self, run_id: Uuid, claims: &[Claim], _run: &Run) -> Result<Vec<Finding>, ValidationError> {
        ensure_owned(run_id, claims)?;

        let reactive = water_reactive(claims);
        let Some(first) = reactive.first() else {
            return Ok(Vec::new());
        };
        let cutoff = quench_cutoff(claims, first);
        let reactive_steps: BTreeSet<Option<u32>> = reactive.iter().map(|c| c.step).collect();

        let conditions: Vec<&Claim> = claims_with_role(claims, ReagentRole::Atmosphere)
            .into_iter()
            .chain(claims_with_role(claims, ReagentRole::Dryness))
            .filter(|c| claim_start(c) < cutoff)
            .filter(|c| c.step.is_none() || reactive_steps.contains(&c.step))
            .collect();

        let mut findings: Vec<Finding> = conditions
            .iter()
            .filter(|c| c.has_tag(TAG_WET) || c.has_tag(TAG_AIR))
            .map(|c| {
                Finding::fail(
                    run_id,
                    self.name(),
                    format!(
                        "{} is water-reactive but conditions are described as '{}'",
                        first.normalized, c.raw
                    ),
                )
                .for_claim(c)
                .with_kind(FindingKind::ConditionMismatch)
                .with_confidence(0.7)
            })
            .collect();

        if findings.is_empty() {
            let protected = conditions
                .iter()
                .any(|c| c.has_tag(TAG_DRY) || c.has_tag(TAG_INERT));
            findings.push(if protected {
                Finding::pass(
                    run_id,
                    self.name(),
                    format!("Dry/inert conditions stated for {}", first.normalized),
                )
                .with_confidence(0.7)
            } else {
                Finding::unverified(
                    run_id,
                    self.name(),
                    format!("No dry or inert conditions stated for {}", first.normalized),
                )
                .for_claim(first)
                .with_kind(FindingKind::Missing)
                .with_confidence(0.4)
            });
        }

        Ok(findings)
    }
}
