//! Audit pipeline orchestration.
//!
//! Drives one run through generation, extraction, contract retry,
//! validation, scoring and hashing. Extractor and validator failures are
//! converted into findings; a connector failure (including cancellation
//! and timeout) fails the whole run with maximum risk. Either way the run
//! reaches a terminal state and yields an artifact.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

use crate::adapters::{CancelToken, ConnectorError, ModelConnector};
use crate::domain::{AuditArtifact, Claim, Finding, FindingKind, Run, RunMode, RunStatus, PIPELINE_VALIDATOR};
use crate::evidence::enrich_findings;
use crate::extract::CompositeExtractor;
use crate::provenance::{compute_fallback_hash, run_content_hash};
use crate::validate::{Validator, ValidatorRegistry};

use super::contain::contain;
use super::policy::{OutputContract, PolicyResolver, PolicySettings};
use super::scoring::RiskScorer;
use super::store::RunRepository;

/// Default bound on a single connector call
pub const DEFAULT_CONNECTOR_TIMEOUT: Duration = Duration::from_secs(300);

/// Instructions prepended to the output when asking for a structured reformat
pub const REFORMAT_INSTRUCTIONS: &str = "\
Re-express the text below as a structured list of claims, one claim per line, \
in the form `- <quantity>: <value> <unit>` for measurements, \
`- reagent: <name>` / `- solvent: <name>` for materials and `- citation: doi:<identifier>` \
for references. Keep every number, unit, reagent, solvent and identifier exactly \
as written. Do not add, remove or correct any information.";

/// Build the reformat prompt for a contract retry
pub fn reformat_prompt(output: &str) -> String {
    format!("{}\n\n---\n{}", REFORMAT_INSTRUCTIONS, output)
}

/// Caller-provided description of one audit
#[derive(Debug, Clone)]
pub struct AuditRequest {
    pub mode: RunMode,
    pub model_name: String,
    pub policy_profile: Option<String>,
    pub prompt: String,

    /// Text to audit in verify-only mode
    pub supplied_text: Option<String>,

    /// Hash of the preceding run in the chain
    pub previous_hash: Option<String>,

    /// Contract requested by the caller (a policy may override it)
    pub contract: OutputContract,
}

impl AuditRequest {
    /// Generate text from a prompt, then audit it
    pub fn generate(prompt: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            mode: RunMode::GenerateAndAudit,
            model_name: model_name.into(),
            policy_profile: None,
            prompt: prompt.into(),
            supplied_text: None,
            previous_hash: None,
            contract: OutputContract::FreeText,
        }
    }

    /// Audit already-generated text
    pub fn verify(text: impl Into<String>) -> Self {
        Self {
            mode: RunMode::VerifyOnly,
            model_name: "none".to_string(),
            policy_profile: None,
            prompt: String::new(),
            supplied_text: Some(text.into()),
            previous_hash: None,
            contract: OutputContract::FreeText,
        }
    }

    pub fn with_policy(mut self, profile: impl Into<String>) -> Self {
        self.policy_profile = Some(profile.into());
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    pub fn with_previous_hash(mut self, previous_hash: Option<String>) -> Self {
        self.previous_hash = previous_hash;
        self
    }

    pub fn with_contract(mut self, contract: OutputContract) -> Self {
        self.contract = contract;
        self
    }
}

/// Main audit orchestrator
pub struct AuditOrchestrator {
    connector: Arc<dyn ModelConnector>,
    extractor: CompositeExtractor,
    validators: ValidatorRegistry,
    policies: PolicyResolver,
    scorer: RiskScorer,
    repository: Option<Arc<dyn RunRepository>>,
    connector_timeout: Duration,
}

impl AuditOrchestrator {
    /// Orchestrator with default extractors, validators, policies and weights
    pub fn new(connector: Arc<dyn ModelConnector>) -> Self {
        Self {
            connector,
            extractor: CompositeExtractor::with_defaults(),
            validators: ValidatorRegistry::with_defaults(),
            policies: PolicyResolver::with_builtin(),
            scorer: RiskScorer::default(),
            repository: None,
            connector_timeout: DEFAULT_CONNECTOR_TIMEOUT,
        }
    }

    pub fn with_extractor(mut self, extractor: CompositeExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_validators(mut self, validators: ValidatorRegistry) -> Self {
        self.validators = validators;
        self
    }

    pub fn with_policies(mut self, policies: PolicyResolver) -> Self {
        self.policies = policies;
        self
    }

    pub fn with_scorer(mut self, scorer: RiskScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_repository(mut self, repository: Arc<dyn RunRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn with_connector_timeout(mut self, connector_timeout: Duration) -> Self {
        self.connector_timeout = connector_timeout;
        self
    }

    /// Execute one audit end to end.
    ///
    /// Only persistence errors are returned; every pipeline failure is
    /// recorded on the run instead.
    #[instrument(skip(self, request, cancel), fields(mode = ?request.mode, model = %request.model_name))]
    pub async fn run_audit(&self, request: AuditRequest, cancel: &CancelToken) -> Result<AuditArtifact> {
        let policy = self.policies.resolve(request.policy_profile.as_deref());
        let contract = policy.effective_contract(request.contract);

        let mut run = Run::new(
            request.mode,
            request.model_name.clone(),
            self.connector.name(),
            policy.profile.clone(),
            request.prompt.clone(),
        )
        .with_previous_hash(request.previous_hash.clone());

        info!(run_id = %run.id, policy = %policy.profile, %contract, "Starting audit run");

        let mut claims = Vec::new();
        let mut findings = Vec::new();

        let result = self
            .execute(&mut run, &request, &policy, contract, cancel, &mut claims, &mut findings)
            .await;
        if let Err(e) = result {
            self.handle_run_failure(&mut run, &mut findings, e);
        }

        enrich_findings(&mut findings, &claims, &run.output);

        if let Some(repository) = &self.repository {
            repository
                .save_run(&run, &claims, &findings)
                .await
                .with_context(|| format!("Failed to persist run {}", run.id))?;
        }

        info!(
            run_id = %run.id,
            status = %run.status,
            risk = run.risk_score,
            claims = claims.len(),
            findings = findings.len(),
            "Audit run finished"
        );

        AuditArtifact::assemble(run, claims, findings)
    }

    /// Stages 3-8; any error returned here fails the run
    #[allow(clippy::too_many_arguments)]
    async fn execute(
        &self,
        run: &mut Run,
        request: &AuditRequest,
        policy: &PolicySettings,
        contract: OutputContract,
        cancel: &CancelToken,
        claims: &mut Vec<Claim>,
        findings: &mut Vec<Finding>,
    ) -> Result<(), ConnectorError> {
        // Obtain the analyzed text
        run.output = match request.mode {
            RunMode::GenerateAndAudit => {
                transition(run, RunStatus::Generating);
                self.generate(&request.prompt, cancel).await?
            }
            RunMode::VerifyOnly => request.supplied_text.clone().unwrap_or_default(),
        };
        seal(run);

        transition(run, RunStatus::Extracting);
        let outcome = self.extractor.extract(run.id, &run.output);
        *claims = outcome.claims;
        findings.extend(outcome.diagnostics);

        // Contract retry: free text is extraction-lossy
        if contract == OutputContract::StructuredClaims && !run.output.trim().is_empty() {
            let budget = policy.retry_budget();
            let mut attempt = 0;
            while claims.is_empty() && attempt < budget {
                attempt += 1;
                transition(run, RunStatus::ContractRetry);
                info!(run_id = %run.id, attempt, budget, "No claims extracted; requesting structured reformat");

                run.output = self.generate(&reformat_prompt(&run.output), cancel).await?;
                seal(run);

                let outcome = self.extractor.extract(run.id, &run.output);
                *claims = outcome.claims;
                findings.extend(outcome.diagnostics);
            }
        }

        transition(run, RunStatus::Validating);
        for validator in self.validators.select(policy) {
            findings.extend(self.run_validator(validator, run, claims));
        }

        transition(run, RunStatus::Scoring);
        run.risk_score = self.scorer.score(findings);

        transition(run, RunStatus::Hashing);
        seal(run);

        transition(run, RunStatus::Completed);
        Ok(())
    }

    /// Call the connector, bounded by the timeout and the cancellation token
    async fn generate(&self, prompt: &str, cancel: &CancelToken) -> Result<String, ConnectorError> {
        if cancel.is_cancelled() {
            return Err(ConnectorError::Cancelled);
        }

        tokio::select! {
            _ = cancel.cancelled() => Err(ConnectorError::Cancelled),
            result = timeout(self.connector_timeout, self.connector.generate(prompt, cancel)) => {
                result.map_err(|_| ConnectorError::Timeout {
                    seconds: self.connector_timeout.as_secs(),
                })?
            }
        }
    }

    /// Run one validator with failures contained as an Unverified finding
    fn run_validator(&self, validator: &dyn Validator, run: &Run, claims: &[Claim]) -> Vec<Finding> {
        let name = validator.name();

        let failure = match contain(|| validator.validate(run.id, claims, run)) {
            Ok(Ok(findings)) => {
                debug!(validator = name, findings = findings.len(), "Validator finished");
                return findings;
            }
            Ok(Err(e)) => e.to_string(),
            Err(panic) => format!("Validator panicked: {}", panic),
        };

        warn!(run_id = %run.id, validator = name, error = %failure, "Validator failed; continuing");
        vec![Finding::unverified(run.id, name, failure)
            .with_kind(FindingKind::ValidatorFailure)
            .with_confidence(0.0)]
    }

    /// Force the run to Failed with maximum risk and a synthetic finding
    fn handle_run_failure(&self, run: &mut Run, findings: &mut Vec<Finding>, error: ConnectorError) {
        let error_msg = error.to_string();
        error!(run_id = %run.id, stage = %run.status, %error_msg, "Audit pipeline failed");

        run.fail(error_msg.clone());
        if run.current_hash.is_empty() {
            run.current_hash = compute_fallback_hash(&run.prompt, &run.created_at);
        }

        findings.push(
            Finding::fail(run.id, PIPELINE_VALIDATOR, format!("Pipeline failed: {}", error_msg))
                .with_kind(FindingKind::PipelineFailure)
                .with_confidence(1.0),
        );
    }
}

fn transition(run: &mut Run, status: RunStatus) {
    debug!(run_id = %run.id, from = %run.status, to = %status, "Run status change");
    run.advance(status);
}

/// Recompute the content hash over the current output
fn seal(run: &mut Run) {
    run.current_hash = run_content_hash(run);
}
