//! HTTP-boundary error taxonomy. Everything else in the pipeline is
//! recovered into an [`bridge_types::AgentResponse`] and never reaches here.

use thiserror::Error;
use tool_host_client::ClientError;

use crate::llm::LlmError;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("prompt is missing or empty")]
    InvalidPrompt,
    #[error("invalid local endpoint url: {0}")]
    InvalidEndpoint(String),
    #[error("missing LLM credentials")]
    MissingCredentials,
    #[error("upstream tool host error: {0}")]
    Upstream(#[from] ClientError),
    #[error("llm error: {0}")]
    Llm(String),
}

impl From<LlmError> for BridgeError {
    fn from(value: LlmError) -> Self {
        BridgeError::Llm(value.to_string())
    }
}

impl BridgeError {
    pub fn status(&self) -> u16 {
        match self {
            BridgeError::InvalidPrompt | BridgeError::InvalidEndpoint(_) => 400,
            BridgeError::MissingCredentials | BridgeError::Upstream(_) | BridgeError::Llm(_) => 500,
        }
    }
}
