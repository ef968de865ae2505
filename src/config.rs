//! Configuration for chemaudit.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (CHEMAUDIT_HOME, CHEMAUDIT_POLICY)
//! 2. Config file (.chemaudit/config.yaml)
//! 3. Defaults (~/.chemaudit, built-in policy profiles, default weights)
//!
//! Config file discovery:
//! - Searches the current directory and its parents for .chemaudit/config.yaml
//! - `paths.home` is relative to the .chemaudit/ directory
//!
//! The resolved configuration is returned by value and handed to the
//! resolver, scorer and orchestrator explicitly.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::{CommandConnector, ModelConnector, OfflineConnector};
use crate::core::{
    AuditOrchestrator, FileRepository, PolicyResolver, PolicySettings, RiskScorer, ScoringWeights,
    DEFAULT_CONNECTOR_TIMEOUT, DEFAULT_PROFILE,
};

pub const CONFIG_DIR: &str = ".chemaudit";
pub const CONFIG_FILE: &str = "config.yaml";
pub const HOME_ENV: &str = "CHEMAUDIT_HOME";
pub const POLICY_ENV: &str = "CHEMAUDIT_POLICY";

/// Model name recorded when none is configured
pub const DEFAULT_MODEL: &str = "unspecified";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub connector: Option<ConnectorConfig>,
    #[serde(default)]
    pub scoring: Option<ScoringWeights>,
    #[serde(default)]
    pub default_policy: Option<String>,
    /// Replaces the built-in profile table when present
    #[serde(default)]
    pub policies: BTreeMap<String, PolicySettings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .chemaudit/)
    pub home: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectorConfig {
    /// Generation command, e.g. `ollama`
    pub program: Option<String>,
    /// Arguments; `{model}` is replaced by the model name
    #[serde(default)]
    pub args: Vec<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// Connector settings after defaults are applied
#[derive(Debug, Clone)]
pub struct ConnectorSettings {
    /// None means verify-only (offline)
    pub program: Option<String>,
    pub args: Vec<String>,
    pub model: String,
    pub timeout: Duration,
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_CONNECTOR_TIMEOUT,
        }
    }
}

impl ConnectorSettings {
    fn from_config(config: Option<ConnectorConfig>) -> Self {
        let Some(config) = config else {
            return Self::default();
        };
        Self {
            program: config.program.filter(|p| !p.trim().is_empty()),
            args: config.args,
            model: config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout: config
                .timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_CONNECTOR_TIMEOUT),
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to the state directory
    pub home: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub connector: ConnectorSettings,
    pub scoring: ScoringWeights,
    pub default_policy: String,
    /// Configured profiles; empty means the built-in table
    pub policies: BTreeMap<String, PolicySettings>,
}

impl ResolvedConfig {
    /// Directory holding one subdirectory per stored run
    pub fn runs_dir(&self) -> PathBuf {
        self.home.join("runs")
    }

    pub fn repository(&self) -> FileRepository {
        FileRepository::new(self.runs_dir())
    }

    pub fn policy_resolver(&self) -> PolicyResolver {
        let resolver = if self.policies.is_empty() {
            PolicyResolver::with_builtin()
        } else {
            PolicyResolver::from_map(self.policies.clone())
        };
        resolver.with_default_profile(self.default_policy.clone())
    }

    pub fn scorer(&self) -> RiskScorer {
        RiskScorer::new(self.scoring)
    }

    /// Connector for generation; offline when no program is configured
    pub fn model_connector(&self) -> Arc<dyn ModelConnector> {
        match &self.connector.program {
            Some(program) => Arc::new(
                CommandConnector::new(program.clone())
                    .with_args(self.connector.args.clone())
                    .with_model(self.connector.model.clone()),
            ),
            None => Arc::new(OfflineConnector),
        }
    }

    /// Orchestrator wired to this configuration and the file repository
    pub fn orchestrator(&self) -> AuditOrchestrator {
        AuditOrchestrator::new(self.model_connector())
            .with_policies(self.policy_resolver())
            .with_scorer(self.scorer())
            .with_connector_timeout(self.connector.timeout)
            .with_repository(Arc::new(self.repository()))
    }
}

/// Find config file by searching a directory and its parents
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to a base directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Load configuration from all sources, discovering from the current directory
pub fn load_config() -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(CONFIG_DIR);

    resolve_config(
        find_config_file(&cwd).as_deref(),
        default_home,
        env_var(HOME_ENV),
        env_var(POLICY_ENV),
    )
}

/// Combine an optional config file with env overrides and defaults
pub fn resolve_config(
    config_path: Option<&Path>,
    default_home: PathBuf,
    env_home: Option<String>,
    env_policy: Option<String>,
) -> Result<ResolvedConfig> {
    let config = match config_path {
        Some(path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    let home = if let Some(env_home) = env_home {
        PathBuf::from(env_home)
    } else if let (Some(home_path), Some(path)) = (&config.paths.home, config_path) {
        let config_dir = path.parent().unwrap_or(Path::new("."));
        resolve_path(config_dir, home_path)
    } else {
        default_home
    };

    let default_policy = env_policy
        .or(config.default_policy)
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string());

    Ok(ResolvedConfig {
        home,
        config_file: config_path.map(Path::to_path_buf),
        connector: ConnectorSettings::from_config(config.connector),
        scoring: config.scoring.unwrap_or_default(),
        default_policy,
        policies: config.policies,
    })
}
