//! Path-issue Retry Policy (spec.md §4.8): one-shot retry when the response
//! indicates a path problem.

use std::sync::OnceLock;

use bridge_types::{AgentResponse, ExecutionPlan, ManifestContext, MissingSentinel};
use regex::Regex;
use serde_json::{Map, Value};

use crate::args::extract_discovery_paths;
use crate::emitter::Emitter;
use crate::mcp_agent::McpAgent;

fn path_issue_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(경로|path).*(없|누락|못 찾|does not exist|invalid)|no valid files|invalid paths|use list_docs",
        )
        .expect("valid regex")
    })
}

fn looks_like_path_issue(response: &AgentResponse) -> bool {
    if response.requires_input == Some(true) && response.missing == Some(MissingSentinel::Paths) {
        return true;
    }
    path_issue_re().is_match(&response.answer)
}

pub struct PathIssueRetryPolicy<'a> {
    mcp_agent: &'a McpAgent,
}

impl<'a> PathIssueRetryPolicy<'a> {
    pub fn new(mcp_agent: &'a McpAgent) -> Self {
        Self { mcp_agent }
    }

    /// Applies at most one retry. Returns the original response unchanged if
    /// no path issue is detected.
    pub async fn maybe_retry(
        &self,
        manifest: &ManifestContext,
        plan: &ExecutionPlan,
        response: AgentResponse,
        default_paths: &[String],
        emitter: &dyn Emitter,
    ) -> AgentResponse {
        if !looks_like_path_issue(&response) {
            return response;
        }

        let Some(tool_name) = response.tool.clone() else {
            return response;
        };

        emitter.emit_progress(bridge_types::ProgressEvent::new("path_issue_retry").with_tool(tool_name.clone()));

        let previous_args = response.arguments.clone().unwrap_or_default();

        if let Some(discovery_tool) = manifest
            .tools
            .iter()
            .find(|t| t.name == "list_docs" || t.name.contains("list_docs"))
        {
            let mut discovery_args = previous_args.clone();
            discovery_args.insert(
                "extensions".to_string(),
                Value::Array(vec![Value::String(".md".to_string())]),
            );
            discovery_args.insert("glob".to_string(), Value::String("**/*.md".to_string()));

            if let Ok(result) = self
                .mcp_agent
                .call_tool_for_retry(&discovery_tool.name, Value::Object(discovery_args))
                .await
            {
                let paths: Vec<String> = extract_discovery_paths(&result.effective_value())
                    .into_iter()
                    .filter(|p| p.ends_with(".md"))
                    .collect();

                if !paths.is_empty() {
                    return self.reissue(manifest, plan, &tool_name, previous_args, paths, emitter).await;
                }
            }
        }

        if !default_paths.is_empty() {
            return self
                .reissue(manifest, plan, &tool_name, previous_args, default_paths.to_vec(), emitter)
                .await;
        }

        let mut failed = response;
        failed.answer = "요약할 수 있는 문서를 찾지 못했습니다.".to_string();
        if let Some(trace) = &mut failed.agent_trace {
            trace.retried = true;
        }
        failed
    }

    async fn reissue(
        &self,
        manifest: &ManifestContext,
        plan: &ExecutionPlan,
        tool_name: &str,
        mut args: Map<String, Value>,
        paths: Vec<String>,
        emitter: &dyn Emitter,
    ) -> AgentResponse {
        args.insert("paths".to_string(), Value::Array(paths.into_iter().map(Value::String).collect()));

        let retry_plan = ExecutionPlan {
            tool: Some(tool_name.to_string()),
            tool_arguments: args,
            routed_query: plan.routed_query.clone(),
            explanation: plan.explanation.clone(),
            discovery: None,
            workflow: None,
        };

        let mut retried = self.mcp_agent.execute(&retry_plan, manifest, emitter).await;
        if let Some(trace) = &mut retried.agent_trace {
            trace.retried = true;
        }
        retried
    }
}
