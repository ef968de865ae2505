//! Model connector interfaces.
//!
//! A connector turns a prompt into generated text. The audit pipeline
//! treats every connector error, including cancellation, as a pipeline
//! failure.

pub mod cancel;
pub mod command;

use async_trait::async_trait;
use thiserror::Error;

pub use cancel::CancelToken;
pub use command::CommandConnector;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    #[error("Generation cancelled")]
    Cancelled,

    #[error("Generation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Connector unavailable: {0}")]
    Unavailable(String),

    #[error("Generation failed: {0}")]
    Failed(String),

    #[error("Connector returned empty output")]
    EmptyOutput,
}

/// Trait for generation backends
#[async_trait]
pub trait ModelConnector: Send + Sync {
    /// Human-readable connector name, recorded on each run
    fn name(&self) -> &str;

    /// Generate text for a prompt; must return promptly once `cancel` fires
    async fn generate(&self, prompt: &str, cancel: &CancelToken) -> Result<String, ConnectorError>;
}

/// Connector for verify-only use; every generation request fails
#[derive(Debug, Default, Clone)]
pub struct OfflineConnector;

#[async_trait]
impl ModelConnector for OfflineConnector {
    fn name(&self) -> &str {
        "offline"
    }

    async fn generate(&self, _prompt: &str, _cancel: &CancelToken) -> Result<String, ConnectorError> {
        Err(ConnectorError::Unavailable(
            "no model connector configured (verify-only)".to_string(),
        ))
    }
}
