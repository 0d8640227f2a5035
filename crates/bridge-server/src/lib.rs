//! Axum HTTP server for the bridge orchestrator.

pub mod routes;
pub mod sse;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use bridge_core::{BridgeConfig, OpenAiLlmClient, Runtime};
use tower_http::cors::{Any, CorsLayer};

use routes::AppState;

/// Build the runtime from configuration. Panics are avoided: a missing
/// OpenAI key still produces a runtime, since credential absence is only a
/// failure once a request actually needs the LLM (spec.md §7 "missing LLM
/// credentials" is a per-request 500, not a startup failure).
pub fn build_runtime(config: &BridgeConfig) -> Arc<Runtime> {
    let has_credentials = config.openai_api_key.is_some();
    let llm = Arc::new(OpenAiLlmClient::new(
        config.openai_api_key.clone().unwrap_or_default(),
        config.openai_model.clone(),
    ));

    Arc::new(Runtime::new(
        llm,
        has_credentials,
        config.local_mcp_endpoint.clone(),
        config.local_mcp_token.clone(),
        config.default_paths.clone(),
    ))
}

pub fn build_router(runtime: Arc<Runtime>, front_origin: Option<&str>) -> Router {
    let state = AppState { runtime };

    let cors = match front_origin {
        Some(origin) => match origin.parse::<axum::http::HeaderValue>() {
            Ok(value) => CorsLayer::new().allow_origin(value).allow_methods(Any).allow_headers(Any),
            Err(_) => CorsLayer::new().allow_methods(Any).allow_headers(Any),
        },
        None => CorsLayer::new().allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/api/mcp/chat", post(routes::chat))
        .route("/api/mcp/chat/stream", post(routes::chat_stream))
        .route("/api/mcp/query", post(routes::query))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}
