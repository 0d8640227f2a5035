//! The A2A (agent-to-agent) envelope carried onto the SSE channel for
//! observability, and the scalar-only progress payloads it wraps.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Standard envelope used between the Orchestrator and agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct A2aMessage {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub timestamp: String,
    pub payload: Value,
}

pub const A2A_PROTOCOL_VERSION: &str = "1.0";

impl A2aMessage {
    pub fn new(
        request_id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        message_type: impl Into<String>,
        payload: Value,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            protocol_version: A2A_PROTOCOL_VERSION.to_string(),
            request_id: request_id.into(),
            from: from.into(),
            to: to.into(),
            message_type: message_type.into(),
            timestamp: timestamp.into(),
            payload,
        }
    }

    /// Same as `new`, but stamps `timestamp` with the current UTC time
    /// (RFC 3339) rather than taking it from the caller.
    pub fn now(
        request_id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        message_type: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self::new(request_id, from, to, message_type, payload, chrono::Utc::now().to_rfc3339())
    }
}

/// A single progress event. Payloads must stay scalar-only so they can be
/// safely re-serialised onto the SSE channel (spec.md §9 "Progress emission").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub step: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ProgressEvent {
    pub fn new(step: impl Into<String>) -> Self {
        Self {
            event_type: "progress".to_string(),
            step: step.into(),
            tool: None,
            status: None,
        }
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}
