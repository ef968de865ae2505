//! Plain-text rendering of audit artifacts for the terminal.

use std::fmt::Write;

use crate::core::RiskTier;
use crate::domain::{AuditArtifact, Finding, FindingStatus};

/// Short marker per verdict
fn status_marker(status: FindingStatus) -> &'static str {
    match status {
        FindingStatus::Pass => "PASS",
        FindingStatus::Fail => "FAIL",
        FindingStatus::Unverified => "????",
    }
}

fn render_finding(out: &mut String, finding: &Finding) {
    let kind = finding.kind.map(|k| format!(" [{}]", k)).unwrap_or_default();
    let _ = writeln!(
        out,
        "  {} {:<28}{} {} (confidence {:.2})",
        status_marker(finding.status),
        finding.validator,
        kind,
        finding.message,
        finding.confidence
    );
    if let Some(span) = &finding.evidence {
        let _ = writeln!(out, "       at {}-{}: {}", span.start, span.end, span.snippet);
    }
}

/// Human-readable summary of one artifact.
///
/// Failures first, then unverified findings; passes only when `verbose`.
pub fn render_summary(artifact: &AuditArtifact, verbose: bool) -> String {
    let run = &artifact.run;
    let tier = RiskTier::from_score(run.risk_score);
    let mut out = String::new();

    let _ = writeln!(out, "Run:       {}", run.id);
    let _ = writeln!(out, "Status:    {}", run.status);
    let _ = writeln!(out, "Policy:    {}", run.policy_profile);
    let _ = writeln!(out, "Model:     {} (via {})", run.model_name, run.connector_name);
    let _ = writeln!(out, "Risk:      {:.3} ({})", run.risk_score, tier);
    let _ = writeln!(out, "Hash:      {}", run.current_hash);
    if let Some(prev) = &run.previous_hash {
        let _ = writeln!(out, "Previous:  {}", prev);
    }
    let _ = writeln!(out, "Artifact:  {}", artifact.artifact_hash);
    if let Some(error) = &run.error {
        let _ = writeln!(out, "Error:     {}", error);
    }

    let _ = writeln!(
        out,
        "\n{} claims, {} findings ({} fail, {} unverified, {} pass)",
        artifact.claims.len(),
        artifact.findings.len(),
        artifact.count_status(FindingStatus::Fail),
        artifact.count_status(FindingStatus::Unverified),
        artifact.count_status(FindingStatus::Pass),
    );

    let mut order = vec![FindingStatus::Fail, FindingStatus::Unverified];
    if verbose {
        order.push(FindingStatus::Pass);
    }
    for status in order {
        let group: Vec<_> = artifact.findings.iter().filter(|f| f.status == status).collect();
        if group.is_empty() {
            continue;
        }
        let _ = writeln!(out);
        for finding in group {
            render_finding(&mut out, finding);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FindingKind, Run, RunMode};

    #[test]
    fn test_summary_lists_failures_and_hides_passes() {
        let run = Run::new(RunMode::VerifyOnly, "none", "offline", "default", "");
        let run_id = run.id;
        let findings = vec![
            Finding::fail(run_id, "DoiFormat", "Malformed DOI").with_kind(FindingKind::Malformed),
            Finding::pass(run_id, "MissingSolvent", "Solvent stated"),
        ];
        let artifact = AuditArtifact::assemble(run, Vec::new(), findings).unwrap();

        let text = render_summary(&artifact, false);
        assert!(text.contains("FAIL DoiFormat"));
        assert!(text.contains("[malformed]"));
        assert!(!text.contains("Solvent stated"));
        assert!(text.contains("1 fail, 0 unverified, 1 pass"));

        assert!(render_summary(&artifact, true).contains("Solvent stated"));
    }
}
