//! Integration tests for the tool-host bootstrap against a mocked host.

use serde_json::json;
use tool_host_client::{BootstrapMode, ToolHostClient};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn initialize_succeeds_against_standard_host() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": { "protocolVersion": "2025-06-18", "capabilities": {} },
        })))
        .mount(&server)
        .await;

    let client = ToolHostClient::new(format!("{}/mcp", server.uri()), None);
    let mode = client.initialize().await.unwrap();
    assert!(matches!(mode, BootstrapMode::Standard));
}

#[tokio::test]
async fn initialize_404_switches_to_legacy_mode() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/mcp/chat"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = ToolHostClient::new(format!("{}/api/mcp/chat", server.uri()), None);
    let mode = client.initialize().await.unwrap();
    assert!(matches!(mode, BootstrapMode::Legacy));
}

#[tokio::test]
async fn tools_list_merges_with_manifest() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "tools": [
                    {"name": "search", "description": "base search", "inputSchema": {"properties": {}, "required": []}},
                ]
            }
        })))
        .mount(&server)
        .await;

    let client = ToolHostClient::new(format!("{}/mcp", server.uri()), None);

    let manifest_tools: Vec<bridge_types::ToolDescriptor> = serde_json::from_value(json!([
        {"name": "search", "description": "manifest search", "inputSchema": {"properties": {"q": {"type": "string"}}, "required": ["q"]}},
        {"name": "list_docs", "description": "list docs", "inputSchema": {"properties": {}, "required": []}},
    ]))
    .unwrap();

    let merged = client.list_tools(&manifest_tools).await.unwrap();
    assert_eq!(merged.len(), 2);

    let search = merged.iter().find(|t| t.name == "search").unwrap();
    assert_eq!(search.description.as_deref(), Some("base search"));
    assert!(search.input_schema.has_property("q"));
}

#[tokio::test]
async fn call_tool_surfaces_jsonrpc_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32000, "message": "tool exploded" }
        })))
        .mount(&server)
        .await;

    let client = ToolHostClient::new(format!("{}/mcp", server.uri()), None);
    let result = client.call_tool("search", json!({})).await.unwrap();
    assert!(!result.is_success());
    assert_eq!(result.error.as_deref(), Some("tool exploded"));
}

#[tokio::test]
async fn legacy_complete_posts_prompt_and_conversation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/mcp/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "answer": "legacy reply" })))
        .mount(&server)
        .await;

    let client = ToolHostClient::new(format!("{}/api/mcp/chat", server.uri()), None);
    let answer = client.legacy_complete("hi", &[]).await.unwrap();
    assert_eq!(answer, "legacy reply");
}
