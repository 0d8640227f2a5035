//! JSON-RPC client for the local tool host (spec.md §4.1).
//!
//! Implements the standard bootstrap — `initialize` with legacy-mode
//! fallback on 404, manifest GET (non-fatal), `tools/list` merge, and
//! `tools/call` — plus response normalisation into [`bridge_types::CallResult`].

mod error;
mod manifest_url;

pub use error::ClientError;
pub use manifest_url::manifest_url;

use std::sync::atomic::{AtomicU64, Ordering};

use bridge_types::{merge_tool_descriptors, CallResult, ManifestContext, ToolDescriptor};
use serde_json::Value;
use tracing::{debug, info, warn};

/// One turn of the caller-supplied conversation, forwarded verbatim in
/// legacy mode.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub text: String,
}

/// Outcome of `initialize`: either the server speaks MCP-style JSON-RPC, or
/// it 404'd and the client has switched to legacy plain-POST mode.
#[derive(Debug, Clone)]
pub enum BootstrapMode {
    Standard,
    Legacy,
}

/// Client for the downstream JSON-RPC tool host.
pub struct ToolHostClient {
    endpoint: String,
    http: reqwest::Client,
    bearer_token: Option<String>,
    request_id: AtomicU64,
}

impl ToolHostClient {
    pub fn new(endpoint: impl Into<String>, bearer_token: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: reqwest::Client::new(),
            bearer_token,
            request_id: AtomicU64::new(1),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    fn auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Low-level JSON-RPC 2.0 call: `call(endpoint, method, params)`.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": self.next_id(),
            "method": method,
            "params": params,
        });

        let response = self
            .auth(self.http.post(&self.endpoint))
            .json(&request)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Transport(format!("invalid JSON body: {e}")))?;

        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("tool host request failed");
            return Err(ClientError::Http {
                status: status.as_u16(),
                body: message.to_string(),
            });
        }

        if body.get("jsonrpc").is_none() && body.get("result").is_none() && body.get("error").is_none() {
            return Err(ClientError::Protocol("malformed JSON-RPC envelope".into()));
        }

        Ok(body)
    }

    /// `initialize` with legacy-mode detection: a 404 response switches the
    /// driver to plain-POST mode for the remainder of the request.
    #[tracing::instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn initialize(&self) -> Result<BootstrapMode, ClientError> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": self.next_id(),
            "method": "initialize",
            "params": { "protocolVersion": "2025-06-18", "capabilities": {} },
        });

        let response = self
            .auth(self.http.post(&self.endpoint))
            .json(&request)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            info!("tool host returned 404 on initialize, switching to legacy mode");
            return Ok(BootstrapMode::Legacy);
        }

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Transport(format!("invalid JSON body: {e}")))?;

        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("initialize failed");
            return Err(ClientError::Http {
                status: status.as_u16(),
                body: message.to_string(),
            });
        }

        if body.get("result").is_none() && body.get("error").is_none() {
            return Err(ClientError::Protocol("malformed JSON-RPC envelope".into()));
        }

        Ok(BootstrapMode::Standard)
    }

    /// Legacy mode: POST `{prompt, conversation}` directly and treat the
    /// plain response as the final answer.
    #[tracing::instrument(skip(self, conversation))]
    pub async fn legacy_complete(
        &self,
        prompt: &str,
        conversation: &[ConversationTurn],
    ) -> Result<String, ClientError> {
        let request = serde_json::json!({ "prompt": prompt, "conversation": conversation });

        let response = self
            .auth(self.http.post(&self.endpoint))
            .json(&request)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Transport(format!("invalid JSON body: {e}")))?;

        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
                body: body.to_string(),
            });
        }

        let answer = body
            .get("answer")
            .or_else(|| body.get("text"))
            .or_else(|| body.get("response"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| body.to_string());

        Ok(answer)
    }

    /// GET the manifest. Failures are non-fatal; an empty tool list is
    /// returned alongside the error so the caller can still proceed.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_manifest(&self) -> ManifestContext {
        let target_url = manifest_url(&self.endpoint);

        let response = match self.auth(self.http.get(&target_url)).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "manifest fetch transport error");
                return ManifestContext {
                    ok: false,
                    status: 0,
                    target_url,
                    tools: vec![],
                    manifest_attempt: true,
                    error: Some(e.to_string()),
                };
            }
        };

        let status = response.status();
        if !status.is_success() {
            debug!(%status, "manifest fetch non-success status");
            return ManifestContext {
                ok: false,
                status: status.as_u16(),
                target_url,
                tools: vec![],
                manifest_attempt: true,
                error: Some(format!("manifest returned {status}")),
            };
        }

        match response.json::<ManifestResponse>().await {
            Ok(parsed) => ManifestContext {
                ok: true,
                status: status.as_u16(),
                target_url,
                tools: parsed.tools.into_iter().filter(|t| t.is_valid()).collect(),
                manifest_attempt: true,
                error: None,
            },
            Err(e) => ManifestContext {
                ok: false,
                status: status.as_u16(),
                target_url,
                tools: vec![],
                manifest_attempt: true,
                error: Some(format!("invalid manifest JSON: {e}")),
            },
        }
    }

    /// `tools/list`, merged with the manifest tools per spec.md §4.1 step 3.
    #[tracing::instrument(skip(self, manifest_tools))]
    pub async fn list_tools(&self, manifest_tools: &[ToolDescriptor]) -> Result<Vec<ToolDescriptor>, ClientError> {
        let response = self.call("tools/list", serde_json::json!({})).await?;

        let tools = response
            .get("result")
            .and_then(|r| r.get("tools"))
            .ok_or_else(|| ClientError::Protocol("missing tools in tools/list response".into()))?;

        let tools_list: Vec<ToolDescriptor> = serde_json::from_value(tools.clone())
            .map_err(|e| ClientError::Protocol(format!("failed to parse tools: {e}")))?;

        if manifest_tools.is_empty() {
            return Ok(tools_list.into_iter().filter(|t| t.is_valid()).collect());
        }

        Ok(merge_tool_descriptors(manifest_tools, &tools_list))
    }

    /// `tools/call`, normalised into a [`CallResult`].
    #[tracing::instrument(skip(self, arguments), fields(tool.name = %name))]
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallResult, ClientError> {
        let response = self
            .call(
                "tools/call",
                serde_json::json!({ "name": name, "arguments": arguments }),
            )
            .await?;

        if let Some(error) = response.get("error") {
            let status = error.get("code").and_then(|c| c.as_u64()).unwrap_or(500) as u16;
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("tool call failed")
                .to_string();
            return Ok(CallResult {
                status: if status < 400 { 500 } else { status },
                error: Some(message),
                raw: Some(response),
                ..Default::default()
            });
        }

        let result = response.get("result").cloned().unwrap_or(Value::Null);

        if let Some(err) = result.get("error") {
            let message = err
                .get("message")
                .and_then(|m| m.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| err.to_string());
            return Ok(CallResult {
                status: 500,
                error: Some(message),
                raw: Some(result),
                ..Default::default()
            });
        }

        let structured_content = result.get("structuredContent").cloned();

        let content_text = result.get("content").and_then(|c| c.as_array()).map(|arr| {
            arr.iter()
                .filter_map(|item| item.get("text").and_then(|t| t.as_str()))
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
        });

        Ok(CallResult {
            status: 200,
            structured_content,
            content_text,
            error: None,
            raw: Some(result),
        })
    }
}

#[derive(Debug, serde::Deserialize)]
struct ManifestResponse {
    #[serde(default)]
    tools: Vec<ToolDescriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_client_stores_endpoint() {
        let client = ToolHostClient::new("http://localhost:4000/api/mcp/chat", None);
        assert_eq!(client.endpoint(), "http://localhost:4000/api/mcp/chat");
    }
}
