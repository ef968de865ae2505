//! Policy profiles and their resolution.
//!
//! A profile decides which output contract the model must satisfy, whether
//! the pipeline may ask the model to reformat its output, and which
//! validators run. Profiles are defined in YAML (the `policies` section of
//! the config file) or fall back to the built-in table.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Name of the permissive fallback profile
pub const DEFAULT_PROFILE: &str = "default";

/// Structural shape required of the analyzed text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputContract {
    /// Any prose
    FreeText,

    /// A list of discrete, extractable claims
    StructuredClaims,
}

impl Default for OutputContract {
    fn default() -> Self {
        Self::FreeText
    }
}

impl OutputContract {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FreeText => "free_text",
            Self::StructuredClaims => "structured_claims",
        }
    }
}

impl std::fmt::Display for OutputContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved, immutable settings for one pipeline execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySettings {
    /// Profile name (taken from the map key when loaded from config)
    #[serde(default)]
    pub profile: String,

    /// Contract the output must satisfy; FreeText defers to the caller
    #[serde(default)]
    pub required_contract: OutputContract,

    /// Whether an empty extraction may trigger a reformat request
    #[serde(default)]
    pub allow_contract_retry: bool,

    /// Upper bound on reformat requests
    #[serde(default = "default_max_contract_retries")]
    pub max_contract_retries: u32,

    /// Validators to run (empty = all)
    #[serde(default)]
    pub include_validators: BTreeSet<String>,

    /// Validators never to run
    #[serde(default)]
    pub exclude_validators: BTreeSet<String>,
}

fn default_max_contract_retries() -> u32 {
    1
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self::permissive(DEFAULT_PROFILE)
    }
}

impl PolicySettings {
    /// Free text, no retry, every validator
    pub fn permissive(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            required_contract: OutputContract::FreeText,
            allow_contract_retry: false,
            max_contract_retries: default_max_contract_retries(),
            include_validators: BTreeSet::new(),
            exclude_validators: BTreeSet::new(),
        }
    }

    /// Parse a single profile from YAML
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse policy YAML")
    }

    pub fn with_contract(mut self, contract: OutputContract) -> Self {
        self.required_contract = contract;
        self
    }

    pub fn with_retry(mut self, max_contract_retries: u32) -> Self {
        self.allow_contract_retry = true;
        self.max_contract_retries = max_contract_retries;
        self
    }

    pub fn including<I: IntoIterator<Item = S>, S: Into<String>>(mut self, names: I) -> Self {
        self.include_validators.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn excluding<I: IntoIterator<Item = S>, S: Into<String>>(mut self, names: I) -> Self {
        self.exclude_validators.extend(names.into_iter().map(Into::into));
        self
    }

    /// Check whether a validator may run under this policy
    pub fn permits(&self, validator: &str) -> bool {
        let included = self.include_validators.is_empty() || self.include_validators.contains(validator);
        included && !self.exclude_validators.contains(validator)
    }

    /// A mandated contract overrides the caller's request
    pub fn effective_contract(&self, requested: OutputContract) -> OutputContract {
        match self.required_contract {
            OutputContract::FreeText => requested,
            mandated => mandated,
        }
    }

    /// Number of reformat requests allowed
    pub fn retry_budget(&self) -> u32 {
        if self.allow_contract_retry {
            self.max_contract_retries
        } else {
            0
        }
    }
}

/// Lookup over a fixed table of profiles
#[derive(Debug, Clone)]
pub struct PolicyResolver {
    /// Lower-cased name -> settings
    profiles: BTreeMap<String, PolicySettings>,

    /// Profile used when no name is given
    default_profile: String,
}

impl Default for PolicyResolver {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl PolicyResolver {
    /// Build a resolver from explicit profiles
    pub fn new(profiles: impl IntoIterator<Item = PolicySettings>) -> Self {
        let profiles = profiles
            .into_iter()
            .map(|p| (p.profile.to_lowercase(), p))
            .collect();

        Self {
            profiles,
            default_profile: DEFAULT_PROFILE.to_string(),
        }
    }

    /// Build from a config map; keys name the profiles
    pub fn from_map(map: BTreeMap<String, PolicySettings>) -> Self {
        Self::new(map.into_iter().map(|(name, mut settings)| {
            settings.profile = name;
            settings
        }))
    }

    /// The built-in profile table
    pub fn with_builtin() -> Self {
        Self::new(builtin_profiles())
    }

    pub fn with_default_profile(mut self, name: impl Into<String>) -> Self {
        self.default_profile = name.into();
        self
    }

    pub fn profile_names(&self) -> Vec<&str> {
        self.profiles.values().map(|p| p.profile.as_str()).collect()
    }

    /// Resolve a profile by name (case-insensitive).
    ///
    /// Absent names use the configured default profile; unknown names get
    /// the permissive fallback.
    pub fn resolve(&self, name: Option<&str>) -> PolicySettings {
        let requested = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.default_profile);

        match self.profiles.get(&requested.to_lowercase()) {
            Some(settings) => settings.clone(),
            None => {
                warn!(profile = requested, "Unknown policy profile; using permissive default");
                PolicySettings::permissive(DEFAULT_PROFILE)
            }
        }
    }
}

/// Profiles available without any configuration
pub fn builtin_profiles() -> Vec<PolicySettings> {
    vec![
        PolicySettings::permissive(DEFAULT_PROFILE),
        PolicySettings::permissive("structured")
            .with_contract(OutputContract::StructuredClaims)
            .with_retry(1),
        PolicySettings::permissive("strict")
            .with_contract(OutputContract::StructuredClaims)
            .with_retry(2),
        PolicySettings::permissive("citations").including(["DoiFormat", "MixedCitationStyle"]),
        PolicySettings::permissive("lenient").excluding(["MalformedChemicalToken", "IncompleteClaim"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_and_absent_fall_back_to_permissive() {
        let resolver = PolicyResolver::with_builtin();

        for name in [None, Some(""), Some("no-such-profile")] {
            let settings = resolver.resolve(name);
            assert_eq!(settings.profile, DEFAULT_PROFILE);
            assert_eq!(settings.required_contract, OutputContract::FreeText);
            assert_eq!(settings.retry_budget(), 0);
            assert!(settings.permits("NumericContradiction"));
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let resolver = PolicyResolver::with_builtin();
        let strict = resolver.resolve(Some("STRICT"));
        assert_eq!(strict.required_contract, OutputContract::StructuredClaims);
        assert_eq!(strict.retry_budget(), 2);
    }

    #[test]
    fn test_include_and_exclude() {
        let policy = PolicySettings::permissive("x")
            .including(["A", "B"])
            .excluding(["B"]);
        assert!(policy.permits("A"));
        assert!(!policy.permits("B"));
        assert!(!policy.permits("C"));
    }

    #[test]
    fn test_mandated_contract_overrides_request() {
        let free = PolicySettings::default();
        assert_eq!(
            free.effective_contract(OutputContract::StructuredClaims),
            OutputContract::StructuredClaims
        );

        let structured = PolicySettings::default().with_contract(OutputContract::StructuredClaims);
        assert_eq!(
            structured.effective_contract(OutputContract::FreeText),
            OutputContract::StructuredClaims
        );
    }

    #[test]
    fn test_profile_from_yaml() {
        let yaml = r#"
required_contract: structured_claims
allow_contract_retry: true
exclude_validators: [IncompleteClaim]
"#;
        let policy = PolicySettings::from_yaml(yaml).unwrap();
        assert_eq!(policy.required_contract, OutputContract::StructuredClaims);
        assert_eq!(policy.retry_budget(), 1);
        assert!(!policy.permits("IncompleteClaim"));
    }

    #[test]
    fn test_configured_default_profile() {
        let resolver = PolicyResolver::with_builtin().with_default_profile("structured");
        assert_eq!(resolver.resolve(None).profile, "structured");
    }
}
