//! Workflow Runner (spec.md §4.5): sequential `when`-gated step execution
//! over accumulated sync state, with the GitHub-PR termination rule.

use bridge_types::{
    parse_sync_payload, AgentResponse, ExecutionPlan, ManifestContext, MissingSentinel, SyncPayload,
    WhenClause, WorkflowSpec, WorkflowStepTrace,
};
use serde_json::Value;
use std::collections::HashSet;

use crate::emitter::Emitter;
use crate::mcp_agent::McpAgent;

pub struct WorkflowOutcome {
    pub steps: Vec<WorkflowStepTrace>,
    pub proceeded: bool,
    pub last_response: AgentResponse,
}

pub struct WorkflowRunner<'a> {
    mcp_agent: &'a McpAgent,
}

impl<'a> WorkflowRunner<'a> {
    pub fn new(mcp_agent: &'a McpAgent) -> Self {
        Self { mcp_agent }
    }

    /// `initial_response` is the pre-workflow response (the plan's own
    /// `tool` call, e.g. the `sync_status` probe) — it seeds `last_response`
    /// so the GitHub-PR termination rule still has something to annotate
    /// when every step is gated off (spec.md §8 scenario 4).
    pub async fn run(
        &self,
        workflow: &WorkflowSpec,
        manifest: &ManifestContext,
        emitter: &dyn Emitter,
        mut sync_payload: SyncPayload,
        initial_response: AgentResponse,
    ) -> WorkflowOutcome {
        let mut executed_steps: HashSet<String> = HashSet::new();
        let mut traces = Vec::new();
        let mut last_response = initial_response;

        for step in &workflow.steps {
            if let Some(reason) = self.skip_reason(&step.when, &sync_payload, &executed_steps) {
                traces.push(WorkflowStepTrace { id: step.id.clone(), executed: false, skip_reason: Some(reason) });
                continue;
            }

            emitter.emit_progress(bridge_types::ProgressEvent::new("workflow_step").with_tool(step.tool.clone()));

            let plan = ExecutionPlan {
                tool: Some(step.tool.clone()),
                tool_arguments: step.tool_arguments.clone(),
                routed_query: String::new(),
                explanation: format!("workflow step {}", step.id),
                discovery: None,
                workflow: None,
            };

            let response = self.mcp_agent.execute(&plan, manifest, emitter).await;

            if response.is_success() {
                executed_steps.insert(step.id.clone());
                traces.push(WorkflowStepTrace { id: step.id.clone(), executed: true, skip_reason: None });
                if step.tool.contains("sync") {
                    if let Some(result) = &response.result {
                        sync_payload = parse_sync_payload(result);
                    }
                }
            } else {
                traces.push(WorkflowStepTrace {
                    id: step.id.clone(),
                    executed: false,
                    skip_reason: Some("tool call failed".to_string()),
                });
            }

            last_response = response;
        }

        let mut proceeded = true;
        if workflow.workflow_type == "github_pr" {
            let create_pr_ran = traces.iter().any(|t| t.id.contains("create_pr") && t.executed);
            if !create_pr_ran {
                proceeded = false;
                last_response.answer = format!("작업 공간 상태로 인해 진행할 수 없습니다. {}", last_response.answer);
                last_response.requires_input = Some(true);
                last_response.missing = Some(MissingSentinel::WorkspaceState);
            }
        }

        WorkflowOutcome { steps: traces, proceeded, last_response }
    }

    fn skip_reason(
        &self,
        when: &Option<WhenClause>,
        sync_payload: &SyncPayload,
        executed_steps: &HashSet<String>,
    ) -> Option<String> {
        match when {
            None => None,
            Some(WhenClause::SyncFieldEquals { field, equals }) => {
                let actual = sync_payload.get(field).cloned().unwrap_or(Value::Null);
                if &actual == equals {
                    None
                } else {
                    Some(format!("{field} != {equals}"))
                }
            }
            Some(WhenClause::StepExecuted { step_id }) => {
                if executed_steps.contains(step_id) {
                    None
                } else {
                    Some(format!("{step_id} not executed"))
                }
            }
        }
    }
}
