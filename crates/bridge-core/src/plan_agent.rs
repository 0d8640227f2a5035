//! Plan Agent (spec.md §4.3): route decision, manifest-aware execution
//! planning, GitHub-PR workflow probe, LLM tool-selector with heuristic
//! fallback.

use std::sync::Arc;

use bridge_types::{
    DiscoveryHint, ExecutionPlan, ManifestContext, Route, RouteDecision, ToolDescriptor, WhenClause,
    WorkflowSpec, WorkflowStep,
};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

use crate::args::sanitize_arguments;
use crate::llm::{ChatMessage, LlmClient};

fn github_pr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)pr|pull request|github|sync|깃허브|commit|push|deploy").expect("valid regex")
    })
}

fn best_tool_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)summary|검색|찾|search|lookup|find|query|list|rebuild").expect("valid regex")
    })
}

pub struct PlanAgent {
    llm: Arc<dyn LlmClient>,
}

impl PlanAgent {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Route decision LLM call. Any parse failure defaults to
    /// `{route: local_mcp, query: <prompt>, explanation: ""}`.
    pub async fn decide_route(&self, prompt: &str) -> RouteDecision {
        let messages = [
            ChatMessage::system(
                "You are a routing agent. Reply with strict JSON only: \
                 {\"route\": \"local_mcp\"|\"chat_only\", \"query\": string, \"explanation\": string}. \
                 Choose local_mcp when the request needs file/tool access, chat_only for general knowledge.",
            ),
            ChatMessage::user(prompt),
        ];

        match self.llm.complete_json(&messages).await {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|_| default_route(prompt)),
            Err(_) => default_route(prompt),
        }
    }

    /// Manifest-aware planning: workflow probe, then LLM tool-selector with
    /// heuristic fallback. Returns `None` if the manifest is unusable.
    pub async fn plan_execution_from_manifest(
        &self,
        manifest: &ManifestContext,
        routed_query: &str,
    ) -> Option<ExecutionPlan> {
        if !manifest.ok || manifest.tools.is_empty() {
            return None;
        }

        if let Some(plan) = self.probe_github_pr_workflow(manifest, routed_query) {
            return Some(plan);
        }

        match self.llm_tool_selector(manifest, routed_query).await {
            Some(plan) => Some(plan),
            None => self.heuristic_plan(manifest, routed_query),
        }
    }

    fn probe_github_pr_workflow(&self, manifest: &ManifestContext, routed_query: &str) -> Option<ExecutionPlan> {
        if !github_pr_re().is_match(routed_query) {
            return None;
        }

        let sync_status = find_tool(manifest, "sync_status")?;
        let create_pr = find_tool(manifest, "create_pr")?;
        let pull_like = manifest
            .tools
            .iter()
            .find(|t| t.name.contains("pull"))
            .map(|t| t.name.clone())
            .unwrap_or_else(|| "pull_changes".to_string());

        let steps = vec![
            WorkflowStep {
                id: "pull_if_needed".to_string(),
                tool: pull_like,
                tool_arguments: Map::new(),
                when: Some(WhenClause::SyncFieldEquals {
                    field: "ready_for_pull".to_string(),
                    equals: Value::Bool(true),
                }),
            },
            WorkflowStep {
                id: "sync_refresh_after_pull".to_string(),
                tool: sync_status.name.clone(),
                tool_arguments: Map::new(),
                when: Some(WhenClause::StepExecuted { step_id: "pull_if_needed".to_string() }),
            },
            WorkflowStep {
                id: "create_pr_if_ready".to_string(),
                tool: create_pr.name.clone(),
                tool_arguments: Map::new(),
                when: Some(WhenClause::SyncFieldEquals {
                    field: "ready_for_pr".to_string(),
                    equals: Value::Bool(true),
                }),
            },
        ];

        Some(ExecutionPlan {
            tool: Some(sync_status.name.clone()),
            tool_arguments: Map::new(),
            routed_query: routed_query.to_string(),
            explanation: "github pr workflow detected".to_string(),
            discovery: None,
            workflow: Some(WorkflowSpec::sequential("github_pr", steps)),
        })
    }

    async fn llm_tool_selector(&self, manifest: &ManifestContext, routed_query: &str) -> Option<ExecutionPlan> {
        let catalogue = serde_json::to_string(&manifest.tools).ok()?;
        let messages = [
            ChatMessage::system(format!(
                "You select which tool to call given a catalogue and a user query. \
                 Reply with strict JSON only: {{\"tool\": string, \"tool_arguments\": object, \
                 \"routed_query\": string, \"explanation\": string, \
                 \"discovery\": {{\"tool\": string, \"tool_arguments\": object, \"expected_paths\": [string]}} | null}}. \
                 Available tools: {catalogue}"
            )),
            ChatMessage::user(routed_query),
        ];

        let text = self.llm.complete_json(&messages).await.ok()?;

        #[derive(serde::Deserialize)]
        struct SelectorReply {
            tool: Option<String>,
            #[serde(default)]
            tool_arguments: Map<String, Value>,
            #[serde(default)]
            routed_query: String,
            #[serde(default)]
            explanation: String,
            #[serde(default)]
            discovery: Option<DiscoveryHint>,
        }

        let reply: SelectorReply = serde_json::from_str(&text).ok()?;
        let tool_name = reply.tool?;
        let tool = find_tool(manifest, &tool_name)?;

        let routed = if reply.routed_query.is_empty() { routed_query.to_string() } else { reply.routed_query };
        let sanitised = sanitize_arguments(tool, &reply.tool_arguments, &routed, &[]);

        Some(ExecutionPlan {
            tool: Some(tool.name.clone()),
            tool_arguments: sanitised,
            routed_query: routed,
            explanation: reply.explanation,
            discovery: reply.discovery,
            workflow: None,
        })
    }

    fn heuristic_plan(&self, manifest: &ManifestContext, routed_query: &str) -> Option<ExecutionPlan> {
        let tool = heuristic_best_tool(&manifest.tools)?;
        let seed = routed_query.to_string();
        let initial = crate::args::build_initial_arguments(tool, &seed);
        let sanitised = sanitize_arguments(tool, &initial, &seed, &[]);

        Some(ExecutionPlan {
            tool: Some(tool.name.clone()),
            tool_arguments: sanitised,
            routed_query: seed,
            explanation: "heuristic best-tool fallback".to_string(),
            discovery: None,
            workflow: None,
        })
    }
}

fn default_route(prompt: &str) -> RouteDecision {
    RouteDecision { route: Route::LocalMcp, query: prompt.to_string(), explanation: String::new() }
}

fn find_tool<'a>(manifest: &'a ManifestContext, name: &str) -> Option<&'a ToolDescriptor> {
    manifest.tools.iter().find(|t| t.name == name)
}

/// Keyword match against tool names; else the first tool in the list.
pub fn heuristic_best_tool(tools: &[ToolDescriptor]) -> Option<&ToolDescriptor> {
    tools
        .iter()
        .find(|t| best_tool_re().is_match(&t.name))
        .or_else(|| tools.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_types::InputSchema;

    fn tool(name: &str) -> ToolDescriptor {
        ToolDescriptor { name: name.to_string(), description: None, input_schema: InputSchema::default() }
    }

    #[test]
    fn heuristic_best_tool_matches_search_keyword() {
        let tools = vec![tool("frobnicate"), tool("search_notes")];
        let picked = heuristic_best_tool(&tools).unwrap();
        assert_eq!(picked.name, "search_notes");
    }

    #[test]
    fn heuristic_best_tool_falls_back_to_first() {
        let tools = vec![tool("frobnicate"), tool("other_thing")];
        let picked = heuristic_best_tool(&tools).unwrap();
        assert_eq!(picked.name, "frobnicate");
    }

    #[test]
    fn default_route_uses_local_mcp() {
        let decision = default_route("hello");
        assert_eq!(decision.route, Route::LocalMcp);
        assert_eq!(decision.query, "hello");
    }
}
