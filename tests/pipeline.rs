//! Pipeline Integration Tests
//!
//! Drives the orchestrator with scripted connectors to cover the contract
//! retry, failure containment, cancellation and chaining.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chemaudit::adapters::{CancelToken, ConnectorError, ModelConnector};
use chemaudit::core::orchestrator::REFORMAT_INSTRUCTIONS;
use chemaudit::core::{AuditOrchestrator, AuditRequest, FileRepository, OutputContract, RunRepository};
use chemaudit::domain::{Claim, Finding, FindingKind, FindingStatus, Run, RunStatus, PIPELINE_VALIDATOR};
use chemaudit::provenance::{compute_fallback_hash, run_content_hash, verify_chain, verify_run_hash};
use chemaudit::validate::{ValidationError, Validator, ValidatorRegistry};
use tempfile::TempDir;
use uuid::Uuid;

/// Text with nothing to extract
const CLAIMLESS: &str = "The product looked nice.";

/// Connector that replays a fixed script and records every prompt
#[derive(Default)]
struct ScriptedConnector {
    responses: Mutex<VecDeque<Result<String, ConnectorError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedConnector {
    fn new(responses: impl IntoIterator<Item = Result<String, ConnectorError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn replying(texts: &[&str]) -> Arc<Self> {
        Self::new(texts.iter().map(|t| Ok(t.to_string())))
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelConnector for ScriptedConnector {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str, _cancel: &CancelToken) -> Result<String, ConnectorError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ConnectorError::Failed("script exhausted".to_string())))
    }
}

/// Connector that never answers in time and ignores cancellation
struct StalledConnector;

#[async_trait]
impl ModelConnector for StalledConnector {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn generate(&self, _prompt: &str, _cancel: &CancelToken) -> Result<String, ConnectorError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok("Heated at 80 °C.".to_string())
    }
}

struct PanickingValidator;

impl Validator for PanickingValidator {
    fn name(&self) -> &str {
        "PanickingValidator"
    }

    fn validate(&self, _run_id: Uuid, _claims: &[Claim], _run: &Run) -> Result<Vec<Finding>, ValidationError> {
        panic!("lookup table missing")
    }
}

struct ErroringValidator;

impl Validator for ErroringValidator {
    fn name(&self) -> &str {
        "ErroringValidator"
    }

    fn validate(&self, _run_id: Uuid, _claims: &[Claim], _run: &Run) -> Result<Vec<Finding>, ValidationError> {
        Err(ValidationError::Failed("reference data unavailable".to_string()))
    }
}

fn fails(findings: &[Finding]) -> Vec<&Finding> {
    findings.iter().filter(|f| f.status == FindingStatus::Fail).collect()
}

#[tokio::test]
async fn test_contract_retry_reformats_once() {
    let reformatted = "- temperature: 80 °C\n- solvent: THF";
    let connector = ScriptedConnector::replying(&[CLAIMLESS, reformatted]);
    let orchestrator = AuditOrchestrator::new(connector.clone());

    let request = AuditRequest::generate("Describe the workup.", "test-model").with_policy("structured");
    let artifact = orchestrator.run_audit(request, &CancelToken::new()).await.unwrap();

    let prompts = connector.prompts();
    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts[0], "Describe the workup.");
    assert!(prompts[1].starts_with(REFORMAT_INSTRUCTIONS));
    assert!(prompts[1].contains(CLAIMLESS));

    assert_eq!(artifact.run.status, RunStatus::Completed);
    assert_eq!(artifact.run.output, reformatted);
    assert!(!artifact.claims.is_empty());
    assert!(verify_run_hash(&artifact.run));
    assert!(artifact.verify());
}

#[tokio::test]
async fn test_caller_contract_with_retry_disabled_does_not_reformat() {
    let connector = ScriptedConnector::replying(&[CLAIMLESS]);
    let orchestrator = AuditOrchestrator::new(connector.clone());

    let request = AuditRequest::generate("Describe the workup.", "test-model")
        .with_contract(OutputContract::StructuredClaims);
    let artifact = orchestrator.run_audit(request, &CancelToken::new()).await.unwrap();

    assert_eq!(connector.prompts().len(), 1);
    assert_eq!(artifact.run.status, RunStatus::Completed);
    assert!(artifact.claims.is_empty());
}

#[tokio::test]
async fn test_retry_is_bounded_by_policy() {
    let connector = ScriptedConnector::replying(&[CLAIMLESS, CLAIMLESS, CLAIMLESS, CLAIMLESS]);
    let orchestrator = AuditOrchestrator::new(connector.clone());

    let request = AuditRequest::generate("Describe the workup.", "test-model").with_policy("strict");
    let artifact = orchestrator.run_audit(request, &CancelToken::new()).await.unwrap();

    // One generation plus two reformat attempts
    assert_eq!(connector.prompts().len(), 3);
    assert_eq!(artifact.run.status, RunStatus::Completed);
    assert!(artifact.claims.is_empty());
}

#[tokio::test]
async fn test_blank_output_is_not_retried() {
    let connector = ScriptedConnector::replying(&["   \n"]);
    let orchestrator = AuditOrchestrator::new(connector.clone());

    let request = AuditRequest::generate("Describe the workup.", "test-model").with_policy("structured");
    let artifact = orchestrator.run_audit(request, &CancelToken::new()).await.unwrap();

    assert_eq!(connector.prompts().len(), 1);
    assert_eq!(artifact.run.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_connector_failure_fails_run_with_max_risk() {
    let connector = ScriptedConnector::new([Err(ConnectorError::Failed("backend returned 503".to_string()))]);
    let orchestrator = AuditOrchestrator::new(connector);

    let artifact = orchestrator
        .run_audit(AuditRequest::generate("Describe a Grignard.", "m"), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(artifact.run.status, RunStatus::Failed);
    assert_eq!(artifact.run.risk_score, 1.0);
    assert!(artifact.run.error.as_deref().unwrap().contains("503"));
    assert_eq!(
        artifact.run.current_hash,
        compute_fallback_hash(&artifact.run.prompt, &artifact.run.created_at)
    );
    assert!(verify_run_hash(&artifact.run));

    let failed = fails(&artifact.findings);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].validator, PIPELINE_VALIDATOR);
    assert_eq!(failed[0].kind, Some(FindingKind::PipelineFailure));
    assert!(failed[0].message.starts_with("Pipeline failed:"));
    assert!(artifact.verify());
}

#[tokio::test]
async fn test_failure_during_retry_keeps_primary_hash() {
    let connector = ScriptedConnector::new([
        Ok(CLAIMLESS.to_string()),
        Err(ConnectorError::Unavailable("model unloaded".to_string())),
    ]);
    let orchestrator = AuditOrchestrator::new(connector);

    let request = AuditRequest::generate("Describe the workup.", "test-model").with_policy("structured");
    let artifact = orchestrator.run_audit(request, &CancelToken::new()).await.unwrap();

    assert_eq!(artifact.run.status, RunStatus::Failed);
    assert_eq!(artifact.run.output, CLAIMLESS);
    assert_eq!(artifact.run.current_hash, run_content_hash(&artifact.run));
    assert_eq!(fails(&artifact.findings).len(), 1);
}

#[tokio::test]
async fn test_validator_failures_are_contained() {
    let validators = ValidatorRegistry::with_defaults()
        .with_validator(PanickingValidator)
        .with_validator(ErroringValidator);
    let orchestrator = AuditOrchestrator::new(ScriptedConnector::replying(&[])).with_validators(validators);

    let artifact = orchestrator
        .run_audit(AuditRequest::verify("Heated at 80 °C for 2 h."), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(artifact.run.status, RunStatus::Completed);
    assert!(artifact.run.risk_score < 1.0);

    for (name, reason) in [
        ("PanickingValidator", "lookup table missing"),
        ("ErroringValidator", "reference data unavailable"),
    ] {
        let own: Vec<_> = artifact.findings.iter().filter(|f| f.validator == name).collect();
        assert_eq!(own.len(), 1, "{}", name);
        assert_eq!(own[0].status, FindingStatus::Unverified);
        assert_eq!(own[0].kind, Some(FindingKind::ValidatorFailure));
        assert_eq!(own[0].confidence, 0.0);
        assert!(own[0].message.contains(reason));
    }

    // Other validators still ran
    assert!(artifact.findings.iter().any(|f| f.validator == "NumericContradiction"));
}

#[tokio::test]
async fn test_cancellation_fails_run() {
    let orchestrator = AuditOrchestrator::new(Arc::new(StalledConnector));
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let artifact = tokio::time::timeout(
        Duration::from_secs(5),
        orchestrator.run_audit(AuditRequest::generate("Describe a Grignard.", "m"), &cancel),
    )
    .await
    .expect("cancellation should interrupt generation")
    .unwrap();

    assert_eq!(artifact.run.status, RunStatus::Failed);
    assert_eq!(artifact.run.risk_score, 1.0);
    assert_eq!(artifact.run.error.as_deref(), Some("Generation cancelled"));
}

#[tokio::test]
async fn test_already_cancelled_never_calls_connector() {
    let connector = ScriptedConnector::replying(&["Heated at 80 °C."]);
    let orchestrator = AuditOrchestrator::new(connector.clone());
    let cancel = CancelToken::new();
    cancel.cancel();

    let artifact = orchestrator
        .run_audit(AuditRequest::generate("Describe a Grignard.", "m"), &cancel)
        .await
        .unwrap();

    assert_eq!(artifact.run.status, RunStatus::Failed);
    assert!(connector.prompts().is_empty());
}

#[tokio::test]
async fn test_connector_timeout_fails_run() {
    let orchestrator =
        AuditOrchestrator::new(Arc::new(StalledConnector)).with_connector_timeout(Duration::from_millis(50));

    let artifact = orchestrator
        .run_audit(AuditRequest::generate("Describe a Grignard.", "m"), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(artifact.run.status, RunStatus::Failed);
    assert!(artifact.run.error.as_deref().unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_unknown_policy_runs_permissively() {
    let orchestrator = AuditOrchestrator::new(ScriptedConnector::replying(&[]));
    let request = AuditRequest::verify("Heated at 80 °C.").with_policy("no-such-profile");
    let artifact = orchestrator.run_audit(request, &CancelToken::new()).await.unwrap();

    assert_eq!(artifact.run.status, RunStatus::Completed);
    assert_eq!(artifact.run.policy_profile, "default");
}

#[tokio::test]
async fn test_findings_carry_evidence_snippets() {
    let text = "The mixture was heated at 80 °C. After workup the reaction was kept at 120 °C.";
    let orchestrator = AuditOrchestrator::new(ScriptedConnector::replying(&[]));
    let artifact = orchestrator
        .run_audit(AuditRequest::verify(text), &CancelToken::new())
        .await
        .unwrap();

    let contradiction = artifact
        .findings
        .iter()
        .find(|f| f.kind == Some(FindingKind::Contradiction))
        .expect("contradiction finding");
    let span = contradiction.evidence.as_ref().expect("resolved evidence");
    assert!(span.end <= text.len());
    assert!(span.snippet.contains(&text[span.start..span.end]));
}

#[tokio::test]
async fn test_runs_are_persisted_and_chained() {
    let temp = TempDir::new().unwrap();
    let repository = Arc::new(FileRepository::new(temp.path().join("runs")));
    let orchestrator = AuditOrchestrator::new(ScriptedConnector::replying(&[])).with_repository(repository.clone());

    for text in ["Heated at 80 °C.", "Stirred for 2 h in THF.", "NaH in DMF under argon."] {
        let previous = repository.latest_hash().await.unwrap();
        let request = AuditRequest::verify(text).with_previous_hash(previous.clone());
        let artifact = orchestrator.run_audit(request, &CancelToken::new()).await.unwrap();
        assert_eq!(artifact.run.previous_hash, previous);

        let stored = repository.get_artifact(artifact.run.id).await.unwrap().unwrap();
        assert_eq!(stored.run.current_hash, artifact.run.current_hash);
        assert_eq!(stored.findings.len(), artifact.findings.len());
        assert!(stored.verify());

        // Keep creation times strictly ordered
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let mut runs = repository.list_runs(0, 10).await.unwrap();
    assert_eq!(runs.len(), 3);
    runs.reverse();
    assert!(verify_chain(&runs).is_ok());

    // Tampering with stored output breaks the chain
    runs[1].output.push_str(" (edited)");
    assert!(verify_chain(&runs).is_err());
}
