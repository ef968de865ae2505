//! Claims extracted from analyzed text.
//!
//! A claim is created once per extractor match and never mutated.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One extracted factual unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Unique identifier for this claim
    pub id: Uuid,

    /// Run that owns this claim
    pub run_id: Uuid,

    /// What kind of fact this is
    pub kind: ClaimKind,

    /// Verbatim matched text
    pub raw: String,

    /// Normalized value (upper bound for ranges, lower-cased identifier, canonical reagent name)
    pub normalized: String,

    /// Canonical unit, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Span in the analyzed text, formatted as `output:<start>-<end>`
    pub locator: String,

    /// Procedure step the claim belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<u32>,

    /// Grouping key for ranges and paired values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_key: Option<String>,

    /// Kind-dependent details
    #[serde(default)]
    pub payload: ClaimPayload,
}

impl Claim {
    pub fn new(
        run_id: Uuid,
        kind: ClaimKind,
        raw: impl Into<String>,
        normalized: impl Into<String>,
        locator: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id,
            kind,
            raw: raw.into(),
            normalized: normalized.into(),
            unit: None,
            locator: locator.into(),
            step: None,
            entity_key: None,
            payload: ClaimPayload::default(),
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_step(mut self, step: Option<u32>) -> Self {
        self.step = step;
        self
    }

    pub fn with_entity_key(mut self, key: impl Into<String>) -> Self {
        self.entity_key = Some(key.into());
        self
    }

    pub fn with_payload(mut self, payload: ClaimPayload) -> Self {
        self.payload = payload;
        self
    }

    /// Context key used to group numeric claims
    pub fn context_key(&self) -> Option<&str> {
        self.payload.context_key.as_deref()
    }

    /// Check whether the payload carries a role tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.payload.tags.iter().any(|t| t == tag)
    }

    /// Parsed normalized value for numeric claims
    pub fn numeric_value(&self) -> Option<f64> {
        self.normalized.parse().ok()
    }

    /// Closed interval covered by a numeric claim (a point for single values)
    pub fn numeric_bounds(&self) -> Option<(f64, f64)> {
        let high = self.numeric_value()?;
        let low = self
            .payload
            .range_low
            .as_deref()
            .and_then(|v| v.parse().ok())
            .unwrap_or(high);
        Some((low.min(high), low.max(high)))
    }
}

/// Kinds of claims the extractors produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    /// A number followed by a recognized unit
    NumericWithUnit,

    /// A persistent identifier (DOI)
    CitationIdentifier,

    /// A reagent, solvent, atmosphere, dryness or quench mention
    ReagentRole,
}

impl ClaimKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NumericWithUnit => "numeric_with_unit",
            Self::CitationIdentifier => "citation_identifier",
            Self::ReagentRole => "reagent_role",
        }
    }
}

/// Role of a reagent/role claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReagentRole {
    Reagent,
    Solvent,
    Atmosphere,
    Dryness,
    Quench,
}

impl ReagentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reagent => "reagent",
            Self::Solvent => "solvent",
            Self::Atmosphere => "atmosphere",
            Self::Dryness => "dryness",
            Self::Quench => "quench",
        }
    }
}

/// Kind-dependent claim details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimPayload {
    /// Domain tag for numeric claims ("temp", "yield", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_key: Option<String>,

    /// Lower bound of a range expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_low: Option<String>,

    /// Upper bound of a range expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_high: Option<String>,

    /// Role for reagent claims
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ReagentRole>,

    /// Role tags ("water-reactive", "protic", "inert", ...)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl ClaimPayload {
    pub fn is_range(&self) -> bool {
        self.range_low.is_some() && self.range_high.is_some()
    }
}
