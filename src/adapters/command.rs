//! Subprocess model connector.
//!
//! Spawns a configured command (e.g. `ollama run llama3`, `fabric -p raw`),
//! writes the prompt to stdin and reads the generated text from stdout.
//! The child is killed if the call is cancelled or dropped.

use std::io::ErrorKind;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{CancelToken, ConnectorError, ModelConnector};

/// Placeholder in arguments replaced by the model name
pub const MODEL_PLACEHOLDER: &str = "{model}";

/// Connector backed by an external CLI
#[derive(Debug, Clone)]
pub struct CommandConnector {
    program: String,
    args: Vec<String>,
    model: Option<String>,
}

impl CommandConnector {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            model: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments with the model placeholder substituted
    pub fn resolved_args(&self) -> Vec<String> {
        let model = self.model.as_deref().unwrap_or_default();
        self.args
            .iter()
            .map(|a| a.replace(MODEL_PLACEHOLDER, model))
            .collect()
    }

    async fn run(&self, prompt: &str) -> Result<String, ConnectorError> {
        let mut child = Command::new(&self.program)
            .args(self.resolved_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ConnectorError::Unavailable(format!("'{}' not found", self.program)),
                _ => ConnectorError::Failed(format!("Failed to spawn '{}': {}", self.program, e)),
            })?;

        // Feed stdin while stdout drains so a child that echoes cannot fill both pipes
        let stdin = child.stdin.take();
        let feed = async move {
            match stdin {
                // Dropping stdin afterwards signals EOF
                Some(mut stdin) => stdin.write_all(prompt.as_bytes()).await,
                None => Ok(()),
            }
        };
        let (written, output) = tokio::join!(feed, child.wait_with_output());

        let output = output
            .map_err(|e| ConnectorError::Failed(format!("Failed to wait for '{}': {}", self.program, e)))?;
        // A child may exit without consuming its input
        if let Err(e) = written {
            if e.kind() != ErrorKind::BrokenPipe {
                return Err(ConnectorError::Failed(format!("Failed to write prompt: {}", e)));
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            return Err(ConnectorError::Failed(format!(
                "'{}' exited with code {}: {}",
                self.program,
                exit_code,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| ConnectorError::Failed("Output is not valid UTF-8".to_string()))?;
        if stdout.trim().is_empty() {
            return Err(ConnectorError::EmptyOutput);
        }

        debug!(program = %self.program, bytes = stdout.len(), "Generation finished");
        Ok(stdout)
    }
}

#[async_trait]
impl ModelConnector for CommandConnector {
    fn name(&self) -> &str {
        "command"
    }

    async fn generate(&self, prompt: &str, cancel: &CancelToken) -> Result<String, ConnectorError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(ConnectorError::Cancelled),
            result = self.run(prompt) => result,
        }
    }
}
