//! Errors raised by the tool-host client's JSON-RPC transport.

/// Errors that can occur when talking to the tool host. Mirrors the
/// taxonomy recovered by the orchestrator: everything here is surfaced to
/// the caller as a synthesized agent response, never left to propagate to
/// the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl ClientError {
    /// The `mcpStatus` an agent response should carry for this failure.
    pub fn status(&self) -> u16 {
        match self {
            ClientError::Transport(_) => 502,
            ClientError::Http { status, .. } => *status,
            ClientError::Protocol(_) => 502,
        }
    }
}
