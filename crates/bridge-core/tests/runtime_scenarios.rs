//! Orchestrator-level integration tests (spec.md §8's end-to-end scenarios
//! 2-6) against a wiremock-backed tool host and a fake language model.

use std::sync::Arc;

use async_trait::async_trait;
use bridge_core::{ChatMessage, LlmClient, LlmError, NullEmitter, Runtime};
use bridge_types::Route;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A deterministic stand-in for a real model: the route call returns a
/// fixed route, the tool-selector and evaluator calls always fail (driving
/// callers onto their documented fallbacks), and the writer call echoes the
/// draft back unchanged so formatter output survives to the final answer.
struct FakeLlmClient {
    route: Route,
}

impl FakeLlmClient {
    fn new(route: Route) -> Self {
        Self { route }
    }
}

#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn complete_text(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        if messages.first().is_some_and(|m| m.content.contains("final-answer writer")) {
            let user = &messages[1].content;
            if let Some(start) = user.find("current draft: ") {
                let after = &user[start + "current draft: ".len()..];
                let end = after.find("\nfeedback:").unwrap_or(after.len());
                return Ok(after[..end].to_string());
            }
        }
        Ok("fake chat answer".to_string())
    }

    async fn complete_json(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        if messages.first().is_some_and(|m| m.content.contains("routing agent")) {
            let prompt = messages.get(1).map(|m| m.content.as_str()).unwrap_or_default();
            let route = match self.route {
                Route::ChatOnly => "chat_only",
                Route::LocalMcp => "local_mcp",
            };
            return Ok(json!({ "route": route, "query": prompt, "explanation": "" }).to_string());
        }
        // Tool-selector and evaluator calls: force the heuristic/default fallback.
        Err(LlmError::EmptyResponse)
    }
}

fn rpc_result(result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": 1, "result": result })
}

/// Mounts `initialize`, an empty manifest GET, and a `tools/list` reply
/// carrying `tools`, onto the single JSON-RPC endpoint `{server}/mcp`.
async fn mount_bootstrap(server: &MockServer, tools: Value) {
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_partial_json(json!({ "method": "initialize" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(json!({
            "protocolVersion": "2025-06-18",
            "capabilities": {},
        }))))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/mcp/manifest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tools": [] })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_partial_json(json!({ "method": "tools/list" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(json!({ "tools": tools }))))
        .mount(server)
        .await;
}

fn mock_tool_call(name: &str, result: Value) -> Mock {
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_partial_json(json!({ "method": "tools/call", "params": { "name": name } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(result)))
}

fn tool_names_called(server: &MockServer, requests: &[wiremock::Request]) -> Vec<String> {
    let _ = server;
    requests
        .iter()
        .filter_map(|r| serde_json::from_slice::<Value>(&r.body).ok())
        .filter(|body| body.get("method").and_then(|m| m.as_str()) == Some("tools/call"))
        .filter_map(|body| body.get("params")?.get("name")?.as_str().map(|s| s.to_string()))
        .collect()
}

#[tokio::test]
async fn summary_request_discovers_paths_then_calls_rebuild_summary() {
    let server = MockServer::start().await;
    let tools = json!([
        {
            "name": "rebuild_summary",
            "description": "rebuild the notes summary",
            "inputSchema": { "properties": { "paths": {"type": "array"}, "output_path": {"type": "string"} }, "required": ["paths", "output_path"] },
        },
        {
            "name": "list_docs",
            "description": "list markdown docs",
            "inputSchema": { "properties": { "extensions": {"type": "array"} }, "required": [] },
        },
    ]);
    mount_bootstrap(&server, tools).await;

    mock_tool_call("list_docs", json!({ "structuredContent": { "paths": ["notes/a.md", "notes/b.md"] } }))
        .mount(&server)
        .await;
    mock_tool_call(
        "rebuild_summary",
        json!({ "structuredContent": { "summary": "done", "output_path": "output.md" } }),
    )
    .mount(&server)
    .await;

    let llm = Arc::new(FakeLlmClient::new(Route::LocalMcp));
    let runtime = Runtime::new(llm, true, format!("{}/mcp", server.uri()), None, vec![]);

    let response = runtime
        .handle_request("오늘 노트 요약해줘", &[], None, &NullEmitter)
        .await
        .unwrap();

    assert_eq!(response.tool.as_deref(), Some("rebuild_summary"));
    let arguments = response.arguments.expect("arguments present");
    assert_eq!(arguments.get("paths"), Some(&json!(["notes/a.md", "notes/b.md"])));
    assert_eq!(arguments.get("output_path"), Some(&json!("output.md")));

    let trace = response.agent_trace.expect("trace present");
    assert!(trace.discovery_attempted);
    assert_eq!(trace.discovery_paths, vec!["notes/a.md".to_string(), "notes/b.md".to_string()]);

    let requests = server.received_requests().await.unwrap();
    let calls = tool_names_called(&server, &requests);
    assert_eq!(calls, vec!["list_docs".to_string(), "rebuild_summary".to_string()]);
}

#[tokio::test]
async fn search_with_empty_hits_retries_with_discovered_paths() {
    let server = MockServer::start().await;
    let tools = json!([
        {
            "name": "search",
            "description": "search notes",
            "inputSchema": { "properties": { "query": {"type": "string"}, "paths": {"type": "array"} }, "required": ["query"] },
        },
        {
            "name": "list_docs",
            "description": "list markdown docs",
            "inputSchema": { "properties": { "extensions": {"type": "array"} }, "required": [] },
        },
    ]);
    mount_bootstrap(&server, tools).await;

    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_partial_json(json!({
            "method": "tools/call",
            "params": { "name": "search", "arguments": { "paths": ["notes"] } },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(json!({ "structuredContent": { "hits": [] } }))))
        .mount(&server)
        .await;
    mock_tool_call("list_docs", json!({ "structuredContent": { "paths": ["notes/react.md"] } }))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_partial_json(json!({ "method": "tools/call", "params": { "name": "search", "arguments": { "paths": ["notes/react.md"] } } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(
            json!({ "structuredContent": { "hits": [{"path": "notes/react.md", "title": "React notes"}] } }),
        )))
        .mount(&server)
        .await;

    let llm = Arc::new(FakeLlmClient::new(Route::LocalMcp));
    let runtime = Runtime::new(llm, true, format!("{}/mcp", server.uri()), None, vec!["notes".to_string()]);

    let response = runtime
        .handle_request("React 관련 내용 찾아줘", &[], None, &NullEmitter)
        .await
        .unwrap();

    let trace = response.agent_trace.expect("trace present");
    assert!(trace.search_retried);

    let hits = response.result.as_ref().and_then(|r| r.get("hits")).and_then(|h| h.as_array());
    assert_eq!(hits.map(|h| h.len()).unwrap_or(0), 1);

    let requests = server.received_requests().await.unwrap();
    let calls = tool_names_called(&server, &requests);
    assert_eq!(calls, vec!["search".to_string(), "list_docs".to_string(), "search".to_string()]);
}

#[tokio::test]
async fn github_pr_workflow_blocked_when_workspace_not_ready() {
    let server = MockServer::start().await;
    let tools = json!([
        { "name": "sync_status", "description": "sync state", "inputSchema": { "properties": {}, "required": [] } },
        { "name": "pull_changes", "description": "pull", "inputSchema": { "properties": {}, "required": [] } },
        { "name": "create_pr", "description": "open a pr", "inputSchema": { "properties": {}, "required": [] } },
    ]);
    mount_bootstrap(&server, tools).await;

    mock_tool_call(
        "sync_status",
        json!({ "structuredContent": { "is_clean": false, "ready_for_pr": false, "ready_for_pull": false } }),
    )
    .mount(&server)
    .await;

    let llm = Arc::new(FakeLlmClient::new(Route::LocalMcp));
    let runtime = Runtime::new(llm, true, format!("{}/mcp", server.uri()), None, vec![]);

    let response = runtime.handle_request("PR 생성해줘", &[], None, &NullEmitter).await.unwrap();

    assert_eq!(response.requires_input, Some(true));
    assert_eq!(response.missing, Some(bridge_types::MissingSentinel::WorkspaceState));

    let trace = response.agent_trace.expect("trace present");
    assert_eq!(trace.workflow_proceeded, Some(false));
    assert_eq!(trace.workflow_steps.len(), 3);
    assert!(trace.workflow_steps.iter().all(|s| !s.executed));

    let requests = server.received_requests().await.unwrap();
    let calls = tool_names_called(&server, &requests);
    assert_eq!(calls, vec!["sync_status".to_string()]);
}

#[tokio::test]
async fn legacy_tool_host_skips_manifest_and_returns_plain_answer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_partial_json(json!({ "method": "initialize" })))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_partial_json(json!({ "prompt": "안녕" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "answer": "legacy reply" })))
        .mount(&server)
        .await;

    let llm = Arc::new(FakeLlmClient::new(Route::LocalMcp));
    let runtime = Runtime::new(llm, true, format!("{}/mcp", server.uri()), None, vec![]);

    let response = runtime.handle_request("안녕", &[], None, &NullEmitter).await.unwrap();

    assert!(response.tool.is_none());
    assert!(response.arguments.is_none());
    assert_eq!(response.answer, "legacy reply");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn path_issue_in_first_answer_triggers_one_retry() {
    let server = MockServer::start().await;
    let tools = json!([
        {
            "name": "rebuild_summary",
            "description": "rebuild the notes summary",
            "inputSchema": { "properties": { "paths": {"type": "array"}, "output_path": {"type": "string"} }, "required": ["paths", "output_path"] },
        },
        {
            "name": "list_docs",
            "description": "list markdown docs",
            "inputSchema": { "properties": { "extensions": {"type": "array"} }, "required": [] },
        },
    ]);
    mount_bootstrap(&server, tools).await;

    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_partial_json(json!({
            "method": "tools/call",
            "params": { "name": "rebuild_summary", "arguments": { "paths": ["fallback/default.md"] } },
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "error": { "code": 400, "message": "invalid paths" } })),
        )
        .mount(&server)
        .await;
    mock_tool_call("list_docs", json!({ "structuredContent": { "paths": ["notes/c.md"] } }))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_partial_json(json!({
            "method": "tools/call",
            "params": { "name": "rebuild_summary", "arguments": { "paths": ["notes/c.md"] } },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(
            json!({ "structuredContent": { "summary": "done", "output_path": "output.md" } }),
        )))
        .mount(&server)
        .await;

    let llm = Arc::new(FakeLlmClient::new(Route::LocalMcp));
    let runtime = Runtime::new(llm, true, format!("{}/mcp", server.uri()), None, vec!["fallback/default.md".to_string()]);

    let response = runtime
        .handle_request("please rebuild the report", &[], None, &NullEmitter)
        .await
        .unwrap();

    let trace = response.agent_trace.expect("trace present");
    assert!(trace.retried);
    assert_eq!(response.tool.as_deref(), Some("rebuild_summary"));

    let requests = server.received_requests().await.unwrap();
    let calls = tool_names_called(&server, &requests);
    let summary_calls = calls.iter().filter(|c| *c == "rebuild_summary").count();
    assert!(summary_calls <= 2);
    assert_eq!(calls, vec!["rebuild_summary".to_string(), "list_docs".to_string(), "rebuild_summary".to_string()]);
}
