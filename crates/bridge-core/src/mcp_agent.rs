//! MCP Agent (spec.md §4.4): single tool invocation with path-discovery
//! fallback, search-retry, and summary-chain.

use std::sync::Arc;
use std::sync::OnceLock;

use bridge_types::{
    AgentResponse, CallResult, ExecutionPlan, ManifestContext, MissingSentinel, PlanTrace, Route,
    ToolDescriptor,
};
use regex::Regex;
use serde_json::{Map, Value};
use tool_host_client::ToolHostClient;

use crate::args::{build_initial_arguments, extract_discovery_paths, sanitize_arguments};
use crate::emitter::Emitter;
use crate::formatters::format_result;
use crate::plan_agent::heuristic_best_tool;

fn search_like_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)search|query|find|lookup").expect("valid regex"))
}

fn discovery_hint_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)search|scan|find|discover|list|index").expect("valid regex"))
}

fn summary_intent_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)요약|정리|summary|summar").expect("valid regex"))
}

fn is_summary_tool_name(name: &str) -> bool {
    matches!(name, "rebuild_summary" | "summary" | "summarize" | "rebuild")
        || name.contains("rebuild_summary")
        || name.contains("summarize")
        || name.contains("summary")
}

pub struct McpAgent {
    tool_host: Arc<ToolHostClient>,
    default_paths: Vec<String>,
}

impl McpAgent {
    pub fn new(tool_host: Arc<ToolHostClient>, default_paths: Vec<String>) -> Self {
        Self { tool_host, default_paths }
    }

    #[tracing::instrument(skip(self, plan, manifest, emitter))]
    pub async fn execute(
        &self,
        plan: &ExecutionPlan,
        manifest: &ManifestContext,
        emitter: &dyn Emitter,
    ) -> AgentResponse {
        let mut trace = PlanTrace { manifest_ok: Some(manifest.ok), ..Default::default() };

        let Some(requested_name) = plan.tool.clone() else {
            return plan_gap_response(plan, trace);
        };

        let Some(tool) = self
            .find_tool(manifest, &requested_name)
            .or_else(|| heuristic_best_tool(&manifest.tools))
        else {
            return plan_gap_response(plan, trace);
        };
        trace.selected_tool = Some(tool.name.clone());
        emitter.emit_progress(bridge_types::ProgressEvent::new("plan").with_tool(tool.name.clone()));

        let mut arguments = sanitize_arguments(tool, &plan.tool_arguments, &plan.routed_query, &self.default_paths);

        if tool.input_schema.requires("paths") && paths_need_discovery(&arguments) {
            trace.discovery_attempted = true;
            emitter.emit_progress(bridge_types::ProgressEvent::new("discovery").with_tool(tool.name.clone()));
            let discovered = self.run_discovery(manifest, plan, tool, &plan.routed_query).await;
            trace.discovery_paths = discovered.clone();
            let paths = if discovered.is_empty() { self.default_paths.clone() } else { discovered };
            arguments.insert("paths".to_string(), Value::Array(paths.into_iter().map(Value::String).collect()));
        }

        emitter.emit_progress(bridge_types::ProgressEvent::new("arguments_ready").with_tool(tool.name.clone()));

        emitter.emit_progress(bridge_types::ProgressEvent::new("tool_call").with_tool(tool.name.clone()));
        let mut result = match self.tool_host.call_tool(&tool.name, Value::Object(arguments.clone())).await {
            Ok(r) => r,
            Err(e) => return transport_failure_response(plan, &tool.name, &arguments, trace, e.status(), e.to_string()),
        };

        if !result.is_success() {
            return tool_error_response(plan, &tool.name, &arguments, trace, result);
        }

        if search_like_re().is_match(&tool.name) && hits_are_empty(&result) {
            trace.search_retried = true;
            emitter.emit_progress(bridge_types::ProgressEvent::new("search_retry").with_tool(tool.name.clone()));
            if let Some((retried_args, retried_result)) =
                self.retry_search(manifest, tool, &plan.routed_query).await
            {
                arguments = retried_args;
                result = retried_result;
            }
        }

        let mut final_tool = tool.clone();
        let mut final_arguments = arguments.clone();

        if summary_intent_re().is_match(&plan.routed_query) {
            if let Some(summary_tool) = manifest
                .tools
                .iter()
                .find(|t| is_summary_tool_name(&t.name) && t.name != tool.name)
            {
                trace.summary_chained = true;
                emitter
                    .emit_progress(bridge_types::ProgressEvent::new("summary_chain").with_tool(summary_tool.name.clone()));
                if let Some((chained_args, chained_result)) =
                    self.run_summary_chain(manifest, summary_tool, &result, &plan.routed_query).await
                {
                    final_tool = summary_tool.clone();
                    final_arguments = chained_args;
                    result = chained_result;
                }
            }
        }

        let effective = result.effective_value();
        let answer = format_result(&effective, &final_tool.name);

        AgentResponse {
            action: "tool-call".to_string(),
            answer,
            route: Route::LocalMcp,
            routed_query: Some(plan.routed_query.clone()),
            explanation: Some(plan.explanation.clone()),
            tool: Some(final_tool.name.clone()),
            arguments: Some(final_arguments),
            result: Some(effective),
            requires_input: None,
            missing: None,
            mcp_status: 200,
            quality_check: None,
            agent_trace: Some(trace),
        }
    }

    /// Direct tool invocation used by the path-issue retry policy's
    /// discovery probe, bypassing the full plan/sanitise pipeline.
    pub async fn call_tool_for_retry(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<CallResult, tool_host_client::ClientError> {
        self.tool_host.call_tool(name, arguments).await
    }

    fn find_tool<'a>(&self, manifest: &'a ManifestContext, name: &str) -> Option<&'a ToolDescriptor> {
        manifest.tools.iter().find(|t| t.name == name)
    }

    /// Pick the discovery tool named by the plan if known; otherwise a
    /// fallback tool matching the discovery-hint keywords that doesn't
    /// itself require `paths`, preferring one distinct from the selected tool.
    fn pick_discovery_tool<'a>(
        &self,
        manifest: &'a ManifestContext,
        plan: &ExecutionPlan,
        selected: &ToolDescriptor,
    ) -> Option<&'a ToolDescriptor> {
        if let Some(hint) = &plan.discovery {
            if let Some(tool) = manifest.tools.iter().find(|t| t.name == hint.tool) {
                return Some(tool);
            }
        }

        manifest
            .tools
            .iter()
            .filter(|t| t.name != selected.name && !t.input_schema.requires("paths"))
            .find(|t| discovery_hint_re().is_match(&t.name))
    }

    async fn run_discovery(
        &self,
        manifest: &ManifestContext,
        plan: &ExecutionPlan,
        selected: &ToolDescriptor,
        seed: &str,
    ) -> Vec<String> {
        let Some(discovery_tool) = self.pick_discovery_tool(manifest, plan, selected) else {
            return Vec::new();
        };

        let seed_args = plan
            .discovery
            .as_ref()
            .filter(|h| h.tool == discovery_tool.name)
            .map(|h| h.tool_arguments.clone())
            .unwrap_or_else(|| build_initial_arguments(discovery_tool, seed));
        let args = sanitize_arguments(discovery_tool, &seed_args, seed, &self.default_paths);

        match self.tool_host.call_tool(&discovery_tool.name, Value::Object(args)).await {
            Ok(result) if result.is_success() => extract_discovery_paths(&result.effective_value()),
            _ => Vec::new(),
        }
    }

    async fn retry_search(
        &self,
        manifest: &ManifestContext,
        search_tool: &ToolDescriptor,
        seed: &str,
    ) -> Option<(Map<String, Value>, CallResult)> {
        let discovery_tool = manifest
            .tools
            .iter()
            .filter(|t| t.name != search_tool.name)
            .find(|t| t.name == "list_docs" || discovery_hint_re().is_match(&t.name))?;

        let mut discovery_args = Map::new();
        discovery_args.insert(
            "paths".to_string(),
            Value::Array(self.default_paths.iter().cloned().map(Value::String).collect()),
        );
        discovery_args.insert(
            "extensions".to_string(),
            Value::Array(vec![Value::String(".md".to_string()), Value::String(".txt".to_string())]),
        );
        let discovery_args = sanitize_arguments(discovery_tool, &discovery_args, seed, &self.default_paths);

        let discovery_result = self.tool_host.call_tool(&discovery_tool.name, Value::Object(discovery_args)).await.ok()?;
        if !discovery_result.is_success() {
            return None;
        }
        let paths = extract_discovery_paths(&discovery_result.effective_value());
        if paths.is_empty() {
            return None;
        }

        let mut retry_args = Map::new();
        retry_args.insert("paths".to_string(), Value::Array(paths.into_iter().map(Value::String).collect()));
        let retry_args = sanitize_arguments(search_tool, &retry_args, seed, &self.default_paths);

        let retry_result = self.tool_host.call_tool(&search_tool.name, Value::Object(retry_args.clone())).await.ok()?;
        if retry_result.is_success() {
            Some((retry_args, retry_result))
        } else {
            None
        }
    }

    async fn run_summary_chain(
        &self,
        manifest: &ManifestContext,
        summary_tool: &ToolDescriptor,
        current_result: &CallResult,
        seed: &str,
    ) -> Option<(Map<String, Value>, CallResult)> {
        let mut paths = extract_discovery_paths(&current_result.effective_value());

        if paths.is_empty() && summary_tool.input_schema.requires("paths") {
            paths = self.run_discovery(manifest, &ExecutionPlan::default(), summary_tool, seed).await;
        }

        if paths.is_empty() {
            return None;
        }

        let mut args = Map::new();
        args.insert("paths".to_string(), Value::Array(paths.into_iter().map(Value::String).collect()));
        args.insert("output_path".to_string(), Value::String("output.md".to_string()));

        let result = self.tool_host.call_tool(&summary_tool.name, Value::Object(args.clone())).await.ok()?;
        if result.is_success() {
            Some((args, result))
        } else {
            None
        }
    }
}

fn paths_need_discovery(arguments: &Map<String, Value>) -> bool {
    match arguments.get("paths") {
        None => true,
        Some(Value::Array(items)) => {
            items.is_empty() || (items.len() == 1 && items[0].as_str() == Some("."))
        }
        _ => true,
    }
}

fn hits_are_empty(result: &CallResult) -> bool {
    result
        .structured_content
        .as_ref()
        .and_then(|v| v.get("hits"))
        .and_then(|h| h.as_array())
        .map(|arr| arr.is_empty())
        .unwrap_or(false)
}

fn plan_gap_response(plan: &ExecutionPlan, trace: PlanTrace) -> AgentResponse {
    AgentResponse {
        action: "tool-call".to_string(),
        answer: "사용할 수 있는 도구를 찾지 못했습니다.".to_string(),
        route: Route::LocalMcp,
        routed_query: Some(plan.routed_query.clone()),
        explanation: Some(plan.explanation.clone()),
        tool: None,
        arguments: None,
        result: None,
        requires_input: None,
        missing: None,
        mcp_status: 200,
        quality_check: None,
        agent_trace: Some(trace),
    }
    .requires_input(MissingSentinel::ExecutionPlan)
}

fn transport_failure_response(
    plan: &ExecutionPlan,
    tool_name: &str,
    arguments: &Map<String, Value>,
    trace: PlanTrace,
    status: u16,
    message: String,
) -> AgentResponse {
    AgentResponse {
        action: "tool-call".to_string(),
        answer: message,
        route: Route::LocalMcp,
        routed_query: Some(plan.routed_query.clone()),
        explanation: Some(plan.explanation.clone()),
        tool: Some(tool_name.to_string()),
        arguments: Some(arguments.clone()),
        result: None,
        requires_input: None,
        missing: None,
        mcp_status: status,
        quality_check: None,
        agent_trace: Some(trace),
    }
}

fn tool_error_response(
    plan: &ExecutionPlan,
    tool_name: &str,
    arguments: &Map<String, Value>,
    trace: PlanTrace,
    result: CallResult,
) -> AgentResponse {
    AgentResponse {
        action: "tool-call".to_string(),
        answer: result.error.clone().unwrap_or_else(|| "tool call failed".to_string()),
        route: Route::LocalMcp,
        routed_query: Some(plan.routed_query.clone()),
        explanation: Some(plan.explanation.clone()),
        tool: Some(tool_name.to_string()),
        arguments: Some(arguments.clone()),
        result: result.raw.clone(),
        requires_input: None,
        missing: None,
        mcp_status: result.status,
        quality_check: None,
        agent_trace: Some(trace),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_need_discovery_treats_dot_as_missing() {
        let mut args = Map::new();
        args.insert("paths".to_string(), Value::Array(vec![Value::String(".".to_string())]));
        assert!(paths_need_discovery(&args));
    }

    #[test]
    fn paths_need_discovery_false_when_populated() {
        let mut args = Map::new();
        args.insert("paths".to_string(), Value::Array(vec![Value::String("notes/a.md".to_string())]));
        assert!(!paths_need_discovery(&args));
    }

    #[test]
    fn hits_are_empty_detects_empty_array() {
        let result = CallResult {
            status: 200,
            structured_content: Some(serde_json::json!({"hits": []})),
            ..Default::default()
        };
        assert!(hits_are_empty(&result));
    }
}
