//! HTTP endpoints (spec.md §6): `/api/mcp/chat`, `/api/mcp/chat/stream`,
//! `/api/mcp/query`, `/health`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bridge_core::{BridgeError, NullEmitter, Runtime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tool_host_client::{ConversationTurn, ToolHostClient};

use crate::sse::{frames_to_sse, ChannelEmitter};

#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<Runtime>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    #[serde(rename = "localEndpoint", default)]
    pub local_endpoint: Option<String>,
    #[serde(default)]
    pub conversation: Vec<ConversationTurn>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Newtype so the HTTP boundary can implement `IntoResponse` for a
/// foreign error type (orphan-rule workaround).
pub struct HttpError(pub BridgeError);

impl From<BridgeError> for HttpError {
    fn from(value: BridgeError) -> Self {
        HttpError(value)
    }
}

impl From<tool_host_client::ClientError> for HttpError {
    fn from(value: tool_host_client::ClientError) -> Self {
        HttpError(BridgeError::Upstream(value))
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

#[tracing::instrument(skip(state, request))]
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, HttpError> {
    let emitter = NullEmitter;
    let response = state
        .runtime
        .handle_request(&request.prompt, &request.conversation, request.local_endpoint.as_deref(), &emitter)
        .await?;
    Ok(Json(response).into_response())
}

#[tracing::instrument(skip(state, request))]
pub async fn chat_stream(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let (emitter, rx) = ChannelEmitter::new(request_id);

    tokio::spawn(async move {
        match state
            .runtime
            .handle_request(&request.prompt, &request.conversation, request.local_endpoint.as_deref(), &emitter)
            .await
        {
            Ok(response) => {
                emitter.send_final(&response);
                emitter.send_done(true);
            }
            Err(e) => {
                emitter.send_error(e.to_string());
                emitter.send_done(false);
            }
        }
    });

    frames_to_sse(rx).into_response()
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(rename = "localEndpoint", default)]
    pub local_endpoint: Option<String>,
}

#[tracing::instrument(skip(state, request))]
pub async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<Value>, HttpError> {
    let endpoint = request.local_endpoint.unwrap_or_else(|| state.runtime.default_endpoint().to_string());
    let client = ToolHostClient::new(endpoint, state.runtime.default_token().cloned());
    let result = client.call(&request.method, request.params).await?;
    Ok(Json(result))
}

pub async fn health() -> Json<Value> {
    Json(serde_json::json!({ "ok": true, "service": "local-mcp-bridge" }))
}
