//! Command-line interface for chemaudit.
//!
//! Provides commands for auditing text, verifying the hash chain,
//! inspecting stored runs and showing the resolved configuration.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;
use uuid::Uuid;

use crate::adapters::CancelToken;
use crate::config::{self, ResolvedConfig};
use crate::core::{AuditRequest, OutputContract, RiskTier, RunRepository};
use crate::domain::RunStatus;
use crate::provenance::{chain_segments, verify_chain, verify_run_hash};

pub mod summary;

pub use summary::render_summary;

/// chemaudit - Audit AI-generated chemistry text
#[derive(Parser, Debug)]
#[command(name = "chemaudit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Audit text: generate it from a prompt, or verify supplied text
    Audit {
        /// Prompt for the model (omit with --text/--file/--stdin)
        prompt: Option<String>,

        /// Audit this text instead of generating
        #[arg(long, conflicts_with_all = ["file", "stdin"])]
        text: Option<String>,

        /// Audit the contents of a file instead of generating
        #[arg(short, long, conflicts_with = "stdin")]
        file: Option<PathBuf>,

        /// Audit text read from stdin instead of generating
        #[arg(long)]
        stdin: bool,

        /// Policy profile (defaults to the configured profile)
        #[arg(short, long)]
        policy: Option<String>,

        /// Model name (overrides the configured model)
        #[arg(short, long)]
        model: Option<String>,

        /// Output contract to request
        #[arg(short, long, value_enum, default_value = "free-text")]
        contract: ContractArg,

        /// Do not link this run to the latest stored run
        #[arg(long)]
        no_chain: bool,

        /// Print the artifact as JSON
        #[arg(long)]
        json: bool,

        /// Include passing findings in the summary
        #[arg(short, long)]
        verbose: bool,
    },

    /// Verify stored runs against their hashes
    Verify {
        /// Run ID (verifies the whole chain if omitted)
        run_id: Option<String>,
    },

    /// Show a stored run
    Show {
        /// Run ID (UUID)
        run_id: String,

        /// Print the artifact as JSON
        #[arg(long)]
        json: bool,

        /// Include passing findings
        #[arg(short, long)]
        verbose: bool,
    },

    /// List recent runs
    Runs {
        /// Maximum number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Number of newest runs to skip
        #[arg(long, default_value = "0")]
        skip: usize,
    },

    /// Show resolved configuration
    Config,
}

/// Output contract for CLI (maps to OutputContract)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ContractArg {
    /// Any prose
    FreeText,

    /// A list of discrete claims
    StructuredClaims,
}

impl From<ContractArg> for OutputContract {
    fn from(c: ContractArg) -> Self {
        match c {
            ContractArg::FreeText => OutputContract::FreeText,
            ContractArg::StructuredClaims => OutputContract::StructuredClaims,
        }
    }
}

/// Where the audited text comes from
enum TextSource {
    Generate(String),
    Supplied(String),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let cfg = config::load_config()?;

        match self.command {
            Commands::Audit {
                prompt,
                text,
                file,
                stdin,
                policy,
                model,
                contract,
                no_chain,
                json,
                verbose,
            } => {
                let source = read_source(prompt, text, file, stdin)?;
                let request = build_request(&cfg, source, policy, model, contract.into());
                audit(&cfg, request, !no_chain, json, verbose).await
            }
            Commands::Verify { run_id } => verify(&cfg, run_id.as_deref()).await,
            Commands::Show { run_id, json, verbose } => show_run(&cfg, &run_id, json, verbose).await,
            Commands::Runs { limit, skip } => list_runs(&cfg, skip, limit).await,
            Commands::Config => show_config(&cfg),
        }
    }
}

fn read_source(
    prompt: Option<String>,
    text: Option<String>,
    file: Option<PathBuf>,
    use_stdin: bool,
) -> Result<TextSource> {
    let supplied = if let Some(text) = text {
        Some(text)
    } else if let Some(path) = file {
        Some(
            std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read input file: {}", path.display()))?,
        )
    } else if use_stdin || (prompt.is_none() && !io::stdin().is_terminal()) {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        Some(buffer)
    } else {
        None
    };

    match (supplied, prompt) {
        (Some(text), _) => Ok(TextSource::Supplied(text)),
        (None, Some(prompt)) if !prompt.trim().is_empty() => Ok(TextSource::Generate(prompt)),
        _ => anyhow::bail!("No input provided. Give a prompt, or use --text, --file or --stdin"),
    }
}

fn build_request(
    cfg: &ResolvedConfig,
    source: TextSource,
    policy: Option<String>,
    model: Option<String>,
    contract: OutputContract,
) -> AuditRequest {
    let request = match source {
        TextSource::Generate(prompt) => {
            AuditRequest::generate(prompt, model.unwrap_or_else(|| cfg.connector.model.clone()))
        }
        TextSource::Supplied(text) => {
            let request = AuditRequest::verify(text);
            match model {
                Some(model) => request.with_model(model),
                None => request,
            }
        }
    };

    let request = request.with_contract(contract);
    match policy {
        Some(policy) => request.with_policy(policy),
        None => request,
    }
}

/// Run one audit, cancelling on Ctrl-C
async fn audit(cfg: &ResolvedConfig, request: AuditRequest, chain: bool, json: bool, verbose: bool) -> Result<()> {
    let repository = cfg.repository();
    let previous_hash = if chain { repository.latest_hash().await? } else { None };
    let request = request.with_previous_hash(previous_hash);

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; cancelling run");
            on_interrupt.cancel();
        }
    });

    let orchestrator = cfg.orchestrator();
    let artifact = orchestrator.run_audit(request, &cancel).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&artifact).context("Failed to serialize artifact")?
        );
    } else {
        print!("{}", render_summary(&artifact, verbose));
    }

    if artifact.run.status == RunStatus::Failed {
        eprintln!("\n[Run {} failed]", artifact.run.id);
        std::process::exit(1);
    }
    eprintln!("\n[Run {} stored in {}]", artifact.run.id, repository.runs_dir().display());

    Ok(())
}

/// Verify one run, or every stored run oldest to newest
async fn verify(cfg: &ResolvedConfig, run_id: Option<&str>) -> Result<()> {
    let repository = cfg.repository();

    if let Some(run_id_str) = run_id {
        let run_id = parse_run_id(run_id_str)?;
        let artifact = repository
            .get_artifact(run_id)
            .await?
            .with_context(|| format!("Run not found: {}", run_id))?;

        if !verify_run_hash(&artifact.run) {
            eprintln!("[Run {} content does not match its hash]", run_id);
            std::process::exit(1);
        }
        if !artifact.verify() {
            eprintln!("[Run {} result does not match its artifact hash]", run_id);
            std::process::exit(1);
        }
        println!("Run {} verified ({})", run_id, artifact.run.current_hash);
        return Ok(());
    }

    let mut runs = repository.list_runs(0, usize::MAX).await?;
    runs.reverse();

    if let Err(e) = verify_chain(&runs) {
        eprintln!("[Chain broken: {}]", e);
        std::process::exit(1);
    }

    for run in &runs {
        let intact = repository
            .get_artifact(run.id)
            .await?
            .is_some_and(|artifact| artifact.verify());
        if !intact {
            eprintln!("[Run {} result does not match its artifact hash]", run.id);
            std::process::exit(1);
        }
    }

    println!(
        "Chain verified: {} runs in {} segment(s)",
        runs.len(),
        chain_segments(&runs)
    );
    Ok(())
}

/// Show a stored run
async fn show_run(cfg: &ResolvedConfig, run_id_str: &str, json: bool, verbose: bool) -> Result<()> {
    let run_id = parse_run_id(run_id_str)?;
    let artifact = cfg
        .repository()
        .get_artifact(run_id)
        .await?
        .with_context(|| format!("Run not found: {}", run_id))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&artifact).context("Failed to serialize artifact")?
        );
    } else {
        print!("{}", render_summary(&artifact, verbose));
    }

    Ok(())
}

/// List recent runs
async fn list_runs(cfg: &ResolvedConfig, skip: usize, limit: usize) -> Result<()> {
    let runs = cfg.repository().list_runs(skip, limit).await?;

    if runs.is_empty() {
        println!("No runs found");
        return Ok(());
    }

    println!(
        "{:<38} {:<12} {:<12} {:<8} {:<9} {:<20}",
        "RUN ID", "STATUS", "POLICY", "RISK", "TIER", "CREATED"
    );
    println!("{}", "-".repeat(102));

    for run in runs {
        println!(
            "{:<38} {:<12} {:<12} {:<8.3} {:<9} {:<20}",
            run.id,
            run.status.as_str(),
            run.policy_profile,
            run.risk_score,
            RiskTier::from_score(run.risk_score).as_str(),
            run.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    Ok(())
}

fn show_config(cfg: &ResolvedConfig) -> Result<()> {
    let resolver = cfg.policy_resolver();

    println!("chemaudit configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home: {}", cfg.home.display());
    println!("  Runs: {}", cfg.runs_dir().display());
    println!();
    println!("Connector:");
    println!(
        "  Program: {}",
        cfg.connector.program.as_deref().unwrap_or("(none - verify-only)")
    );
    println!("  Args:    {}", cfg.connector.args.join(" "));
    println!("  Model:   {}", cfg.connector.model);
    println!("  Timeout: {}s", cfg.connector.timeout.as_secs());
    println!();
    println!("Scoring weights:");
    println!("  Fail:          {}", cfg.scoring.fail);
    println!("  Unverified:    {}", cfg.scoring.unverified);
    println!("  Not checkable: {}", cfg.scoring.not_checkable);
    println!("  Pass:          {}", cfg.scoring.pass);
    println!();
    println!("Policies (default: {}):", cfg.default_policy);
    for name in resolver.profile_names() {
        let policy = resolver.resolve(Some(name));
        println!(
            "  {:<12} contract={} retries={}",
            policy.profile,
            policy.required_contract,
            policy.retry_budget()
        );
    }

    Ok(())
}

fn parse_run_id(run_id_str: &str) -> Result<Uuid> {
    Uuid::parse_str(run_id_str).with_context(|| format!("Invalid run ID: {}", run_id_str))
}
