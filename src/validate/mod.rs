//! Rule-based validation of extracted claims.
//!
//! Each validator sees the full claim set and the run, and returns its
//! own findings. Validators never share state, so their order does not
//! matter. Policy profiles select validators by name through the
//! [`ValidatorRegistry`].

pub mod citation;
pub mod completeness;
pub mod compatibility;
pub mod numeric;

use thiserror::Error;
use uuid::Uuid;

use crate::core::PolicySettings;
use crate::domain::{Claim, ClaimKind, Finding, ReagentRole, Run};
use crate::evidence::try_parse;

pub use citation::{DoiFormat, MixedCitationStyle};
pub use completeness::{IncompleteClaim, MalformedChemicalToken, MissingSolvent, MissingTemperature};
pub use compatibility::{DryInertAtmosphere, QuenchOrdering, ReagentSolventCompatibility};
pub use numeric::{EquivalentsConsistency, NumericContradiction, PercentageBounds};

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Claim {claim_id} belongs to run {claim_run}, not {run_id}")]
    ForeignClaim {
        claim_id: Uuid,
        claim_run: Uuid,
        run_id: Uuid,
    },

    #[error("Validation failed: {0}")]
    Failed(String),
}

/// One independent rule check
pub trait Validator: Send + Sync {
    /// Stable registry name, matched by policy include/exclude lists
    fn name(&self) -> &str;

    /// Produce zero or more findings for the run
    fn validate(&self, run_id: Uuid, claims: &[Claim], run: &Run) -> Result<Vec<Finding>, ValidationError>;
}

/// Name-keyed, ordered set of validators
pub struct ValidatorRegistry {
    validators: Vec<Box<dyn Validator>>,
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    /// Every built-in rule family
    pub fn with_defaults() -> Self {
        Self::new()
            .with_validator(DoiFormat)
            .with_validator(NumericContradiction::default())
            .with_validator(PercentageBounds)
            .with_validator(ReagentSolventCompatibility)
            .with_validator(MissingSolvent)
            .with_validator(MissingTemperature)
            .with_validator(MalformedChemicalToken)
            .with_validator(IncompleteClaim)
            .with_validator(MixedCitationStyle)
            .with_validator(QuenchOrdering)
            .with_validator(DryInertAtmosphere)
            .with_validator(EquivalentsConsistency)
    }

    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.register(Box::new(validator));
        self
    }

    /// Add a validator, replacing any existing one with the same name
    pub fn register(&mut self, validator: Box<dyn Validator>) {
        match self.validators.iter().position(|v| v.name() == validator.name()) {
            Some(idx) => self.validators[idx] = validator,
            None => self.validators.push(validator),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Validator> {
        self.validators
            .iter()
            .find(|v| v.name() == name)
            .map(|v| v.as_ref())
    }

    /// Validators permitted by the policy, in registration order
    pub fn select<'a>(&'a self, policy: &'a PolicySettings) -> impl Iterator<Item = &'a dyn Validator> + 'a {
        self.validators
            .iter()
            .filter(move |v| policy.permits(v.name()))
            .map(|v| v.as_ref())
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

/// Reject claims that were extracted for a different run
pub(crate) fn ensure_owned(run_id: Uuid, claims: &[Claim]) -> Result<(), ValidationError> {
    match claims.iter().find(|c| c.run_id != run_id) {
        Some(c) => Err(ValidationError::ForeignClaim {
            claim_id: c.id,
            claim_run: c.run_id,
            run_id,
        }),
        None => Ok(()),
    }
}

/// Start offset of a claim, for text-order comparisons
pub(crate) fn claim_start(claim: &Claim) -> usize {
    try_parse(&claim.locator).map(|(start, _)| start).unwrap_or(0)
}

pub(crate) fn claims_of_kind(claims: &[Claim], kind: ClaimKind) -> Vec<&Claim> {
    let mut selected: Vec<&Claim> = claims.iter().filter(|c| c.kind == kind).collect();
    selected.sort_by_key(|c| claim_start(c));
    selected
}

pub(crate) fn claims_with_role(claims: &[Claim], role: ReagentRole) -> Vec<&Claim> {
    let mut selected: Vec<&Claim> = claims
        .iter()
        .filter(|c| c.kind == ClaimKind::ReagentRole && c.payload.role == Some(role))
        .collect();
    selected.sort_by_key(|c| claim_start(c));
    selected
}

/// Slice of `text` widened by `radius` bytes around a span, snapped to char boundaries
pub(crate) fn text_window(text: &str, start: usize, end: usize, radius: usize) -> &str {
    let mut lo = start.min(text.len()).saturating_sub(radius);
    while !text.is_char_boundary(lo) {
        lo -= 1;
    }
    let mut hi = end.saturating_add(radius).min(text.len());
    while !text.is_char_boundary(hi) {
        hi += 1;
    }
    &text[lo..hi.max(lo)]
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::domain::RunMode;
    use crate::extract::CompositeExtractor;

    /// A verify-only run over `text` with its extracted claims
    pub fn run_with_claims(text: &str) -> (Run, Vec<Claim>) {
        let mut run = Run::new(RunMode::VerifyOnly, "none", "none", "default", "");
        run.output = text.to_string();
        let claims = CompositeExtractor::with_defaults().extract(run.id, text).claims;
        (run, claims)
    }

    pub fn validate_text(validator: &dyn Validator, text: &str) -> Vec<Finding> {
        let (run, claims) = run_with_claims(text);
        validator.validate(run.id, &claims, &run).unwrap()
    }
}
