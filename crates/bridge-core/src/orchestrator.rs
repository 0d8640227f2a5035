//! Orchestrator (spec.md §9 "Closure-based agent wiring", made explicit as
//! `Runtime`/`Context` in SPEC_FULL.md §4.10): the single in-process object
//! that drives Plan → Execute → Workflow → Retry → Writer → Evaluator →
//! Output for one request.

use std::sync::Arc;

use bridge_types::{AgentResponse, ManifestContext, Route, SyncPayload};
use tool_host_client::{BootstrapMode, ConversationTurn, ToolHostClient};

use crate::chat_agent::ChatAgent;
use crate::emitter::Emitter;
use crate::error::BridgeError;
use crate::llm::LlmClient;
use crate::mcp_agent::McpAgent;
use crate::plan_agent::PlanAgent;
use crate::retry::PathIssueRetryPolicy;
use crate::workflow::WorkflowRunner;
use crate::writer_evaluator::WriterEvaluator;

pub struct Runtime {
    llm: Arc<dyn LlmClient>,
    has_credentials: bool,
    default_endpoint: String,
    default_token: Option<String>,
    default_paths: Vec<String>,
    plan_agent: PlanAgent,
    chat_agent: ChatAgent,
    writer_evaluator: WriterEvaluator,
}

impl Runtime {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        has_credentials: bool,
        default_endpoint: impl Into<String>,
        default_token: Option<String>,
        default_paths: Vec<String>,
    ) -> Self {
        Self {
            plan_agent: PlanAgent::new(llm.clone()),
            chat_agent: ChatAgent::new(llm.clone()),
            writer_evaluator: WriterEvaluator::new(llm.clone()),
            llm,
            has_credentials,
            default_endpoint: default_endpoint.into(),
            default_token,
            default_paths,
        }
    }

    /// Run one request through the full pipeline. `local_endpoint` overrides
    /// the configured tool-host endpoint for this call only — no client is
    /// reused across requests.
    pub async fn handle_request(
        &self,
        prompt: &str,
        conversation: &[ConversationTurn],
        local_endpoint: Option<&str>,
        emitter: &dyn Emitter,
    ) -> Result<AgentResponse, BridgeError> {
        if prompt.trim().is_empty() {
            return Err(BridgeError::InvalidPrompt);
        }
        if !self.has_credentials {
            return Err(BridgeError::MissingCredentials);
        }

        let endpoint = match local_endpoint {
            Some(url) => {
                url::Url::parse(url).map_err(|_| BridgeError::InvalidEndpoint(url.to_string()))?;
                url.to_string()
            }
            None => self.default_endpoint.clone(),
        };

        let tool_host = Arc::new(ToolHostClient::new(endpoint, self.default_token.clone()));
        let mcp_agent = McpAgent::new(tool_host.clone(), self.default_paths.clone());

        let route_decision = self.plan_agent.decide_route(prompt).await;
        emitter.emit_progress(bridge_types::ProgressEvent::new("route").with_status(format!("{:?}", route_decision.route)));

        if route_decision.route == Route::ChatOnly {
            let response = self.chat_agent.answer(&route_decision.query).await;
            return Ok(response);
        }

        let mode = tool_host.initialize().await?;
        if matches!(mode, BootstrapMode::Legacy) {
            let answer = tool_host.legacy_complete(&route_decision.query, conversation).await?;
            let response = AgentResponse {
                action: "tool-call".to_string(),
                answer,
                route: Route::LocalMcp,
                routed_query: Some(route_decision.query),
                explanation: Some(route_decision.explanation),
                tool: None,
                arguments: None,
                result: None,
                requires_input: None,
                missing: None,
                mcp_status: 200,
                quality_check: None,
                agent_trace: None,
            };
            let response = self.writer_evaluator.polish(prompt, response).await;
            return Ok(response);
        }

        emitter.emit_progress(bridge_types::ProgressEvent::new("manifest_fetch"));
        let manifest_ctx = tool_host.fetch_manifest().await;
        emitter.emit_progress(bridge_types::ProgressEvent::new("tools_list"));
        let tools = tool_host.list_tools(&manifest_ctx.tools).await?;
        let manifest = ManifestContext { tools, ..manifest_ctx };

        let plan = self
            .plan_agent
            .plan_execution_from_manifest(&manifest, &route_decision.query)
            .await
            .unwrap_or_default();

        let mut response = mcp_agent.execute(&plan, &manifest, emitter).await;

        if let Some(workflow) = &plan.workflow {
            let runner = WorkflowRunner::new(&mcp_agent);
            let initial_sync = response
                .result
                .as_ref()
                .map(bridge_types::parse_sync_payload)
                .unwrap_or_else(SyncPayload::new);
            let outcome = runner.run(workflow, &manifest, emitter, initial_sync, response).await;
            response = outcome.last_response;
            if let Some(trace) = &mut response.agent_trace {
                trace.workflow_steps = outcome.steps;
                trace.workflow_proceeded = Some(outcome.proceeded);
            }
        }

        let retry_policy = PathIssueRetryPolicy::new(&mcp_agent);
        let response = retry_policy
            .maybe_retry(&manifest, &plan, response, &self.default_paths, emitter)
            .await;

        let response = self.writer_evaluator.polish(prompt, response).await;

        Ok(response)
    }

    pub fn llm(&self) -> &Arc<dyn LlmClient> {
        &self.llm
    }

    pub fn default_endpoint(&self) -> &str {
        &self.default_endpoint
    }

    pub fn default_token(&self) -> Option<&String> {
        self.default_token.as_ref()
    }
}
