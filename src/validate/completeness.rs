//! Completeness and well-formedness rules over the analyzed text.

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use super::{claims_of_kind, claims_with_role, ensure_owned, ValidationError, Validator};
use crate::domain::{Claim, ClaimKind, Finding, FindingKind, ReagentRole, Run};
use crate::evidence::format_locator;

static SOLUTION_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(dissolved|solution|dropwise|stirred|stirring|suspension|suspended|reflux(?:ed|ing)?)\b")
        .expect("solution cue pattern compiles")
});

static THERMAL_VERB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(heat|heated|heating|cooled|cooling|warmed|warming|chilled)\b")
        .expect("thermal verb pattern compiles")
});

static QUALITATIVE_TEMPERATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(reflux(?:ed|ing)?|room temperature|ambient temperature|ice[- ]bath|dry ice)\b|\br\.?t\b")
        .expect("qualitative temperature pattern compiles")
});

static FORMULA_CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9()]+").expect("formula candidate pattern compiles"));

static DANGLING_QUALIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:approximately|approx\.|ca\.|circa|roughly|about|around|up to|at least|at most)",
        r"(?:\s*(?:%|°\s?C|℃|equiv\b|eq\b|h\b|hours?\b|min\b|minutes?\b|mmol\b|mg\b|g\b|mL\b|M\b)",
        r"|\s*[.;)](?:\s|$)|\s*$)",
        r"|\b(?:at|to)\s+(?:°\s?C|℃)",
        r"|~\s*(?:%|°\s?C)"
    ))
    .expect("dangling qualifier pattern compiles")
});

/// Reagents in a solution-phase procedure need a solvent
#[derive(Debug, Default)]
pub struct MissingSolvent;

impl Validator for MissingSolvent {
    fn name(&self) -> &str {
        "MissingSolvent"
    }

    fn validate(&self, run_id: Uuid, claims: &[Claim], run: &Run) -> Result<Vec<Finding>, ValidationError> {
        ensure_owned(run_id, claims)?;

        let Some(cue) = SOLUTION_CUE.find(&run.output) else {
            return Ok(Vec::new());
        };
        if claims_with_role(claims, ReagentRole::Reagent).is_empty() {
            return Ok(Vec::new());
        }

        let finding = if claims_with_role(claims, ReagentRole::Solvent).is_empty() {
            Finding::fail(
                run_id,
                self.name(),
                format!("Procedure implies a solution ('{}') but names no solvent", cue.as_str()),
            )
            .with_kind(FindingKind::Missing)
            .with_evidence_ref(format_locator(cue.start(), cue.end()))
            .with_confidence(0.6)
        } else {
            Finding::pass(run_id, self.name(), "Solvent stated for solution-phase procedure").with_confidence(0.7)
        };

        Ok(vec![finding])
    }
}

/// Heating or cooling needs a stated temperature
#[derive(Debug, Default)]
pub struct MissingTemperature;

impl Validator for MissingTemperature {
    fn name(&self) -> &str {
        "MissingTemperature"
    }

    fn validate(&self, run_id: Uuid, claims: &[Claim], run: &Run) -> Result<Vec<Finding>, ValidationError> {
        ensure_owned(run_id, claims)?;

        let Some(verb) = THERMAL_VERB.find(&run.output) else {
            return Ok(Vec::new());
        };

        let has_numeric = claims_of_kind(claims, ClaimKind::NumericWithUnit)
            .iter()
            .any(|c| c.context_key() == Some("temp"));
        let has_qualitative = QUALITATIVE_TEMPERATURE.is_match(&run.output);

        let finding = if has_numeric || has_qualitative {
            Finding::pass(run_id, self.name(), "Temperature stated for thermal step").with_confidence(0.7)
        } else {
            Finding::fail(
                run_id,
                self.name(),
                format!("Text says '{}' but never states a temperature", verb.as_str()),
            )
            .with_kind(FindingKind::Missing)
            .with_evidence_ref(format_locator(verb.start(), verb.end()))
            .with_confidence(0.6)
        };

        Ok(vec![finding])
    }
}

/// Element symbols
const ELEMENTS: &[&str] = &[
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl", "Ar", "K",
    "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As", "Se", "Br", "Kr", "Rb",
    "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In", "Sn", "Sb", "Te", "I", "Xe", "Cs",
    "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta",
    "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl", "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa",
    "U", "Np", "Pu", "Am", "Cm", "Bk", "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt",
    "Ds", "Rg", "Cn", "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
];

/// Common group abbreviations written like element symbols
const GROUPS: &[&str] = &["Me", "Et", "Pr", "Bu", "Ph", "Ac", "Bn", "Ts", "Ms", "Tf", "Bz", "Cy", "D"];

fn is_symbol(s: &str) -> bool {
    ELEMENTS.contains(&s) || GROUPS.contains(&s)
}

#[derive(Debug, PartialEq, Eq)]
enum FormulaParse {
    Valid,
    /// Looks like a formula but breaks the grammar
    Defect(&'static str),
    /// Uses symbols that are not elements; not a formula at all
    NotFormula,
}

/// Does this token look like it is meant to be a formula?
fn is_candidate(token: &str) -> bool {
    let starts_right = token.starts_with(|c: char| c.is_ascii_uppercase() || c == '(');
    let has_digit = token.chars().any(|c| c.is_ascii_digit());
    let has_upper = token.chars().any(|c| c.is_ascii_uppercase());
    let has_lower_run = token
        .as_bytes()
        .windows(2)
        .any(|w| w[0].is_ascii_lowercase() && w[1].is_ascii_lowercase());
    token.len() >= 2 && starts_right && has_digit && has_upper && !has_lower_run
}

/// Strip prose parentheses wrapped around a formula
fn trim_outer_parens(token: &str) -> (usize, &str) {
    let mut offset = 0;
    let mut t = token;
    while t.starts_with('(') && t.matches('(').count() > t.matches(')').count() {
        t = &t[1..];
        offset += 1;
    }
    while t.ends_with(')') && t.matches(')').count() > t.matches('(').count() {
        t = &t[..t.len() - 1];
    }
    (offset, t)
}

fn parse_formula(token: &str) -> FormulaParse {
    #[derive(PartialEq)]
    enum Prev {
        Start,
        Open,
        Atom,
        Close,
        Count,
    }

    let bytes = token.as_bytes();
    let mut depth = 0usize;
    let mut prev = Prev::Start;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'(' => {
                depth += 1;
                prev = Prev::Open;
                i += 1;
            }
            b')' => {
                if depth == 0 {
                    return FormulaParse::Defect("unbalanced parentheses");
                }
                if prev == Prev::Open {
                    return FormulaParse::Defect("empty group");
                }
                depth -= 1;
                prev = Prev::Close;
                i += 1;
            }
            b'0'..=b'9' => {
                let run_end = bytes[i..]
                    .iter()
                    .position(|b| !b.is_ascii_digit())
                    .map_or(bytes.len(), |p| i + p);
                if matches!(prev, Prev::Start | Prev::Open) {
                    return FormulaParse::Defect("count without an element");
                }
                if c == b'0' {
                    return FormulaParse::Defect("count with a leading zero");
                }
                prev = Prev::Count;
                i = run_end;
            }
            b'A'..=b'Z' => {
                let two = bytes
                    .get(i + 1)
                    .filter(|b| b.is_ascii_lowercase())
                    .map(|_| &token[i..i + 2]);
                match two {
                    Some(sym) if is_symbol(sym) => i += 2,
                    Some(_) => return FormulaParse::NotFormula,
                    None if is_symbol(&token[i..i + 1]) => i += 1,
                    None => return FormulaParse::NotFormula,
                }
                prev = Prev::Atom;
            }
            _ => return FormulaParse::NotFormula,
        }
    }

    if depth != 0 {
        FormulaParse::Defect("unbalanced parentheses")
    } else {
        FormulaParse::Valid
    }
}

/// Formula-like tokens must parse as element symbols and counts
#[derive(Debug, Default)]
pub struct MalformedChemicalToken;

impl Validator for MalformedChemicalToken {
    fn name(&self) -> &str {
        "MalformedChemicalToken"
    }

    fn validate(&self, run_id: Uuid, claims: &[Claim], run: &Run) -> Result<Vec<Finding>, ValidationError> {
        ensure_owned(run_id, claims)?;

        let mut checked = 0usize;
        let mut findings = Vec::new();

        for m in FORMULA_CANDIDATE.find_iter(&run.output) {
            let (offset, token) = trim_outer_parens(m.as_str());
            if !is_candidate(token) {
                continue;
            }
            match parse_formula(token) {
                FormulaParse::Valid => checked += 1,
                FormulaParse::NotFormula => {}
                FormulaParse::Defect(reason) => {
                    let start = m.start() + offset;
                    findings.push(
                        Finding::fail(
                            run_id,
                            self.name(),
                            format!("Malformed chemical token '{}': {}", token, reason),
                        )
                        .with_kind(FindingKind::Malformed)
                        .with_evidence_ref(format_locator(start, start + token.len()))
                        .with_confidence(0.7),
                    );
                }
            }
        }

        if findings.is_empty() && checked > 0 {
            findings.push(
                Finding::pass(run_id, self.name(), format!("{} chemical formulas parse cleanly", checked))
                    .with_confidence(0.6),
            );
        }

        Ok(findings)
    }
}

/// Qualifiers must be followed by the value they qualify
#[derive(Debug, Default)]
pub struct IncompleteClaim;

impl Validator for IncompleteClaim {
    fn name(&self) -> &str {
        "IncompleteClaim"
    }

    fn validate(&self, run_id: Uuid, claims: &[Claim], run: &Run) -> Result<Vec<Finding>, ValidationError> {
        ensure_owned(run_id, claims)?;

        let findings = DANGLING_QUALIFIER
            .find_iter(&run.output)
            .map(|m| {
                Finding::fail(
                    run_id,
                    self.name(),
                    format!("Qualifier without a value: '{}'", m.as_str().trim()),
                )
                .with_kind(FindingKind::Incomplete)
                .with_evidence_ref(format_locator(m.start(), m.end()))
                .with_confidence(0.5)
            })
            .collect();

        Ok(findings)
    }
}
