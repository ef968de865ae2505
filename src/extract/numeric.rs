//! Numeric-with-unit extraction.
//!
//! Handles three ambiguities:
//! - **Range vs sign**: `80-85%` and `60–65 °C` are ranges (value = upper
//!   bound); `-78 °C` with no digit before the dash is a negative value, and
//!   either bound of a range may carry its own sign (`-20–-10 °C`).
//!   Thousands separators (`1,250 mg`) are part of the number.
//! - **Bare `C`**: accepted as Celsius only when the surrounding text talks
//!   about temperature, and never in `13C NMR`-style labels.
//! - **Context keys**: temperature, time, pressure and equivalents imply
//!   their own key; percentages and concentrations are labelled from nearby
//!   vocabulary, falling back to `yield` / `concentration`. Equivalents are
//!   per reagent, so their entity key also names the reagent they belong to.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use uuid::Uuid;

use super::steps::StepIndex;
use super::{ClaimExtractor, ExtractionError};
use crate::domain::{Claim, ClaimKind, ClaimPayload};
use crate::evidence::format_locator;

/// Characters scanned on each side of a match for domain labels
pub const CONTEXT_WINDOW: usize = 40;

static NUMERIC_WITH_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?P<neg>[-−])?(?P<low>\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)",
        r"(?:[ \t]*(?P<sep>[-–~])[ \t]*(?P<high_neg>[-−])?",
        r"(?P<high>\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?))?",
        r"[ \t]*(?P<unit>",
        r"°[ \t]?C\b|º[ \t]?C\b|℃|wt[ \t]?%|%|K\b|C\b",
        r"|hours?\b|hrs?\b|h\b|minutes?\b|mins?\b",
        r"|mmol\b|mol/L\b|mol\b|mM\b|μM\b|µM\b|M\b",
        r"|mg\b|kg\b|g\b|mL\b|ml\b|μL\b|µL\b|uL\b|L\b",
        r"|atm\b|mbar\b|bar\b|psi\b|[Tt]orr\b|ppm\b|equiv\b|eq\b",
        r")"
    ))
    .expect("numeric pattern compiles")
});

static CONTEXT_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(yields?|isolated|ee|enantiomeric|dr|diastereomeric|conversion|conv",
        r"|selectivity|selective|purity|pure|hplc|temperature|temp|concentration|conc",
        r"|pressure|mass|weight|volume)\b"
    ))
    .expect("context label pattern compiles")
});

static TEMPERATURE_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(heat(ed|ing)?|cool(ed|ing)?|warm(ed|ing)?|reflux(ed|ing)?|temperature|temp",
        r"|stirred|bath|maintained|kept|held|oven)\b"
    ))
    .expect("temperature cue pattern compiles")
});

/// Physical quantity implied by a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitClass {
    Percent,
    Temperature,
    Time,
    Concentration,
    Mass,
    Volume,
    Amount,
    Pressure,
    Ppm,
    Equivalents,
}

impl UnitClass {
    /// Key implied by the unit alone
    fn fixed_key(&self) -> Option<&'static str> {
        match self {
            Self::Temperature => Some("temp"),
            Self::Time => Some("time"),
            Self::Pressure => Some("pressure"),
            Self::Equivalents => Some("equiv"),
            _ => None,
        }
    }

    /// Labels that may name this quantity
    fn accepts_label(&self, key: &str) -> bool {
        match self {
            Self::Percent => matches!(
                key,
                "yield" | "ee" | "dr" | "conversion" | "selectivity" | "purity"
            ),
            Self::Concentration => key == "concentration",
            Self::Ppm => key == "purity",
            Self::Mass => key == "mass",
            Self::Volume => key == "volume",
            _ => false,
        }
    }

    /// Last-resort key when no label is nearby
    fn default_key(&self) -> Option<&'static str> {
        match self {
            Self::Percent => Some("yield"),
            Self::Concentration => Some("concentration"),
            _ => None,
        }
    }
}

/// Map a matched unit to its canonical spelling and class
fn canonical_unit(raw: &str) -> Option<(&'static str, UnitClass)> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let unit = match compact.as_str() {
        "%" => ("%", UnitClass::Percent),
        "wt%" => ("wt%", UnitClass::Percent),
        "°C" | "ºC" | "℃" | "C" => ("°C", UnitClass::Temperature),
        "K" => ("K", UnitClass::Temperature),
        "h" | "hr" | "hrs" | "hour" | "hours" => ("h", UnitClass::Time),
        "min" | "mins" | "minute" | "minutes" => ("min", UnitClass::Time),
        "M" | "mol/L" => ("M", UnitClass::Concentration),
        "mM" => ("mM", UnitClass::Concentration),
        "μM" | "µM" => ("μM", UnitClass::Concentration),
        "mg" => ("mg", UnitClass::Mass),
        "g" => ("g", UnitClass::Mass),
        "kg" => ("kg", UnitClass::Mass),
        "mL" | "ml" => ("mL", UnitClass::Volume),
        "μL" | "µL" | "uL" => ("μL", UnitClass::Volume),
        "L" => ("L", UnitClass::Volume),
        "mmol" => ("mmol", UnitClass::Amount),
        "mol" => ("mol", UnitClass::Amount),
        "atm" => ("atm", UnitClass::Pressure),
        "bar" => ("bar", UnitClass::Pressure),
        "mbar" => ("mbar", UnitClass::Pressure),
        "psi" => ("psi", UnitClass::Pressure),
        "Torr" | "torr" => ("Torr", UnitClass::Pressure),
        "ppm" => ("ppm", UnitClass::Ppm),
        "equiv" | "eq" => ("equiv", UnitClass::Equivalents),
        _ => return None,
    };
    Some(unit)
}

fn label_key(label: &str) -> &'static str {
    match label.to_ascii_lowercase().as_str() {
        "yield" | "yields" | "isolated" => "yield",
        "ee" | "enantiomeric" => "ee",
        "dr" | "diastereomeric" => "dr",
        "conversion" | "conv" => "conversion",
        "selectivity" | "selective" => "selectivity",
        "purity" | "pure" | "hplc" => "purity",
        "temperature" | "temp" => "temp",
        "concentration" | "conc" => "concentration",
        "pressure" => "pressure",
        "mass" | "weight" => "mass",
        _ => "volume",
    }
}

/// Byte range covering `radius` characters on each side of a span
fn window_bounds(text: &str, start: usize, end: usize, radius: usize) -> (usize, usize) {
    let lo = text[..start]
        .char_indices()
        .rev()
        .nth(radius.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let hi = text[end..]
        .char_indices()
        .nth(radius)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());
    (lo, hi)
}

/// Find the nearest admissible domain label around a match
fn resolve_context_key(text: &str, start: usize, end: usize, class: UnitClass) -> Option<String> {
    if let Some(key) = class.fixed_key() {
        return Some(key.to_string());
    }

    let (lo, hi) = window_bounds(text, start, end, CONTEXT_WINDOW);
    let window = &text[lo..hi];

    let nearest = CONTEXT_LABEL
        .find_iter(window)
        .filter_map(|m| {
            let key = label_key(m.as_str());
            if !class.accepts_label(key) {
                return None;
            }
            let (label_start, label_end) = (lo + m.start(), lo + m.end());
            let distance = if label_end <= start {
                start - label_end
            } else if label_start >= end {
                label_start - end
            } else {
                0
            };
            Some((distance, key))
        })
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, key)| key);

    nearest.or_else(|| class.default_key()).map(str::to_string)
}

/// Bare `C` must sit in temperature language and not label a nucleus
fn bare_celsius_is_temperature(text: &str, start: usize, end: usize) -> bool {
    let after = text[end..].trim_start();
    if after.starts_with("NMR") || after.starts_with("-NMR") {
        return false;
    }
    let (lo, hi) = window_bounds(text, start, end, CONTEXT_WINDOW);
    TEMPERATURE_CUE.is_match(&text[lo..hi])
}

/// A match must not be glued to a preceding word, formula, decimal or
/// digit group
fn has_clean_left_edge(text: &str, start: usize) -> bool {
    let mut before = text[..start].chars().rev();
    match before.next() {
        Some(',') => !before.next().is_some_and(|c| c.is_ascii_digit()),
        Some(c) => !(c.is_alphanumeric() || c == '.' || c == '/' || c == '_'),
        None => true,
    }
}

/// Number text without thousands separators, signed when requested
fn plain_number(digits: &str, negative: bool) -> String {
    let digits = digits.replace(',', "");
    if negative {
        format!("-{}", digits)
    } else {
        digits
    }
}

const EQUIVALENTS_STOPWORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "for", "in", "is", "of", "relative", "the", "then", "to", "under",
    "was", "were", "with",
];

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-'
}

/// A token that could name a reagent: contains a letter, not a filler word
fn reagent_token(token: &str) -> Option<String> {
    let token = token.trim_matches('-');
    let usable = token.chars().any(char::is_alphabetic)
        && !EQUIVALENTS_STOPWORDS.contains(&token.to_ascii_lowercase().as_str());
    usable.then(|| token.to_lowercase())
}

/// Name of the reagent an equivalents value belongs to.
///
/// `NaH (1.2 equiv)` and `MeI, 1.5 equiv` name it before the number;
/// `1.2 equiv of NaH` names it after.
fn equivalents_owner(text: &str, start: usize, end: usize) -> Option<String> {
    let before = text[..start].trim_end();
    let preceding = || {
        let head = before.trim_end_matches(|c: char| c == '(' || c == ',' || c.is_whitespace());
        let from = head
            .char_indices()
            .rev()
            .find(|(_, c)| !is_name_char(*c))
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        reagent_token(&head[from..])
    };

    if before.ends_with('(') {
        return preceding();
    }

    let after = text[end..].trim_start();
    let after = after.strip_prefix("of ").unwrap_or(after).trim_start();
    let after = ["the ", "a ", "an "]
        .iter()
        .find_map(|article| after.strip_prefix(article))
        .unwrap_or(after)
        .trim_start();
    let token: String = after.chars().take_while(|c| is_name_char(*c)).collect();
    reagent_token(&token).or_else(preceding)
}

/// Extracts numbers followed by recognized units
#[derive(Debug, Default)]
pub struct NumericExtractor;

impl NumericExtractor {
    pub fn new() -> Self {
        Self
    }

    fn build_claim(
        &self,
        run_id: Uuid,
        text: &str,
        caps: &Captures<'_>,
        steps: &StepIndex,
    ) -> Option<Claim> {
        let whole = caps.get(0)?;
        let low = caps.name("low")?;
        let unit_match = caps.name("unit")?;
        let (unit, class) = canonical_unit(unit_match.as_str())?;

        if !has_clean_left_edge(text, whole.start()) {
            return None;
        }

        let bare_c = unit_match.as_str() == "C";
        if bare_c && !bare_celsius_is_temperature(text, whole.start(), whole.end()) {
            return None;
        }

        // A dash directly after a digit belongs to a range marker, not a sign
        let low_negative = caps.name("neg").is_some_and(|neg| {
            !text[..neg.start()]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_ascii_digit())
        });
        let low_value = plain_number(low.as_str(), low_negative);

        let (normalized, payload_range) = match caps.name("high") {
            Some(high) => {
                let high_value = plain_number(high.as_str(), caps.name("high_neg").is_some());
                (high_value.clone(), Some((low_value, high_value)))
            }
            None => (low_value, None),
        };

        let context_key = resolve_context_key(text, whole.start(), whole.end(), class);
        let entity = match (class, context_key.as_deref()) {
            (UnitClass::Equivalents, Some(key)) => {
                equivalents_owner(text, whole.start(), whole.end()).map(|owner| format!("{}:{}", key, owner))
            }
            (_, key) => key.map(str::to_string),
        };
        let step = steps.step_at(whole.start());

        let mut payload = ClaimPayload {
            context_key: context_key.clone(),
            ..Default::default()
        };
        if let Some((range_low, range_high)) = payload_range {
            payload.range_low = Some(range_low);
            payload.range_high = Some(range_high);
        }

        let mut claim = Claim::new(
            run_id,
            ClaimKind::NumericWithUnit,
            whole.as_str(),
            normalized,
            format_locator(whole.start(), whole.end()),
        )
        .with_unit(unit)
        .with_step(step)
        .with_payload(payload);

        if let Some(key) = entity {
            claim = claim.with_entity_key(match step {
                Some(step) => format!("{}#step{}", key, step),
                None => key,
            });
        }

        Some(claim)
    }
}

impl ClaimExtractor for NumericExtractor {
    fn name(&self) -> &str {
        "NumericExtractor"
    }

    fn extract(&self, run_id: Uuid, text: &str) -> Result<Vec<Claim>, ExtractionError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let steps = StepIndex::detect(text);
        let claims = NUMERIC_WITH_UNIT
            .captures_iter(text)
            .filter_map(|caps| self.build_claim(run_id, text, &caps, &steps))
            .collect();

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Vec<Claim> {
        NumericExtractor::new().extract(Uuid::new_v4(), text).unwrap()
    }

    #[test]
    fn test_percentage_range_with_yield() {
        let claims = extract("The product was obtained in ~80-85% yield.");
        assert_eq!(claims.len(), 1);

        let claim = &claims[0];
        assert_eq!(claim.raw, "80-85%");
        assert_eq!(claim.normalized, "85");
        assert_eq!(claim.unit.as_deref(), Some("%"));
        assert_eq!(claim.payload.range_low.as_deref(), Some("80"));
        assert_eq!(claim.payload.range_high.as_deref(), Some("85"));
        assert_eq!(claim.context_key(), Some("yield"));
    }

    #[test]
    fn test_en_dash_temperature_range() {
        let claims = extract("60–65 °C for 2 h");
        assert_eq!(claims.len(), 2);

        let temp = &claims[0];
        assert_eq!(temp.normalized, "65");
        assert_eq!(temp.unit.as_deref(), Some("°C"));
        assert_eq!(temp.payload.range_low.as_deref(), Some("60"));
        assert_eq!(temp.payload.range_high.as_deref(), Some("65"));
        assert_eq!(temp.context_key(), Some("temp"));

        let time = &claims[1];
        assert_eq!(time.normalized, "2");
        assert_eq!(time.unit.as_deref(), Some("h"));
        assert_eq!(time.context_key(), Some("time"));
    }

    #[test]
    fn test_true_negatives() {
        for (text, value) in [("cooled to -78 °C", "-78"), ("-20 °C", "-20")] {
            let claims = extract(text);
            assert_eq!(claims.len(), 1, "{}", text);
            assert_eq!(claims[0].normalized, value);
            assert!(!claims[0].payload.is_range());
            assert_eq!(claims[0].context_key(), Some("temp"));
        }
    }

    #[test]
    fn test_bare_c_needs_temperature_context() {
        let claims = extract("The flask was heated to 110 C overnight.");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].unit.as_deref(), Some("°C"));

        assert!(extract("A 13C NMR spectrum was recorded.").is_empty());
        assert!(extract("Compound 5 C was isolated.").is_empty());
    }

    #[test]
    fn test_percentage_labels() {
        let claims = extract("Conversion was 95% and the ee was 92%.");
        assert_eq!(claims[0].context_key(), Some("conversion"));
        assert_eq!(claims[1].context_key(), Some("ee"));
    }

    #[test]
    fn test_concentration_default_and_unlabelled_mass() {
        let claims = extract("A 0.5 M solution; 120 mg of catalyst");
        assert_eq!(claims[0].context_key(), Some("concentration"));
        assert_eq!(claims[1].unit.as_deref(), Some("mg"));
        assert_eq!(claims[1].context_key(), None);
        assert_eq!(claims[1].entity_key, None);
    }

    #[test]
    fn test_formula_digits_are_ignored() {
        assert!(extract("H2O and CH2Cl2 were used").is_empty());
        assert!(extract("see 10.1021/jacs 5").is_empty());
    }

    #[test]
    fn test_equivalents_and_steps() {
        let claims = extract("Step 1: add 1.2 equiv NaH.\nStep 2: stir 3 h.");
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].context_key(), Some("equiv"));
        assert_eq!(claims[0].step, Some(1));
        assert_eq!(claims[0].entity_key.as_deref(), Some("equiv:nah#step1"));
        assert_eq!(claims[1].step, Some(2));
    }

    #[test]
    fn test_equivalents_are_keyed_by_reagent() {
        let claims = extract("NaH (1.2 equiv) was suspended in THF, then MeI (1.5 equiv) was added.");
        let keys: Vec<_> = claims.iter().map(|c| c.entity_key.as_deref()).collect();
        assert_eq!(keys, vec![Some("equiv:nah"), Some("equiv:mei")]);

        let claims = extract("Then 2.0 equiv of the aldehyde and Et3N, 3 equiv were added.");
        let keys: Vec<_> = claims.iter().map(|c| c.entity_key.as_deref()).collect();
        assert_eq!(keys, vec![Some("equiv:aldehyde"), Some("equiv:et3n")]);
    }

    #[test]
    fn test_negative_range_bounds_keep_their_sign() {
        let claims = extract("The bath was kept at -10–0 °C.");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].raw, "-10–0 °C");
        assert_eq!(claims[0].normalized, "0");
        assert_eq!(claims[0].payload.range_low.as_deref(), Some("-10"));
        assert_eq!(claims[0].payload.range_high.as_deref(), Some("0"));
        assert_eq!(claims[0].numeric_bounds(), Some((-10.0, 0.0)));

        let claims = extract("cooled to -20–-10 °C");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].normalized, "-10");
        assert_eq!(claims[0].numeric_bounds(), Some((-20.0, -10.0)));
    }

    #[test]
    fn test_thousands_separators() {
        let claims = extract("The crude (1,250 mg) was dissolved.");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].raw, "1,250 mg");
        assert_eq!(claims[0].normalized, "1250");

        let claims = extract("between 1,000-2,500 mL of water");
        assert_eq!(claims[0].numeric_bounds(), Some((1000.0, 2500.0)));

        assert!(extract("entries 12,5 mg").iter().all(|c| c.raw != "5 mg"));
    }

    #[test]
    fn test_locators_within_text() {
        let text = "Stirred at 25 °C for 30 min, then 5–10 mL water; 99% purity.";
        for claim in extract(text) {
            let (start, end) = crate::evidence::try_parse(&claim.locator).unwrap();
            assert!(start <= end && end <= text.len());
            assert_eq!(&text[start..end], claim.raw);
        }
    }

    #[test]
    fn test_empty_text() {
        assert!(extract("").is_empty());
        assert!(extract("   \n").is_empty());
    }
}
