//! Execution plans and the declarative workflow spec.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Discovery hint attached to a plan: which tool to run to harvest paths, and
/// which paths the planner expects to find.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DiscoveryHint {
    pub tool: String,
    #[serde(rename = "toolArguments", default)]
    pub tool_arguments: Map<String, Value>,
    #[serde(rename = "expected_paths", default)]
    pub expected_paths: Vec<String>,
}

/// A `when` gate evaluated against accumulated workflow state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WhenClause {
    SyncFieldEquals { field: String, equals: Value },
    StepExecuted { #[serde(rename = "stepId")] step_id: String },
}

/// A single step of a `workflow.steps.v1` workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: String,
    pub tool: String,
    #[serde(rename = "toolArguments", default)]
    pub tool_arguments: Map<String, Value>,
    #[serde(default)]
    pub when: Option<WhenClause>,
}

/// `workflow.steps.v1`: a sequential list of gated tool calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSpec {
    #[serde(rename = "type")]
    pub workflow_type: String,
    pub mode: String,
    pub steps: Vec<WorkflowStep>,
}

impl WorkflowSpec {
    pub fn sequential(workflow_type: impl Into<String>, steps: Vec<WorkflowStep>) -> Self {
        Self {
            workflow_type: workflow_type.into(),
            mode: "sequential".to_string(),
            steps,
        }
    }
}

/// The Plan Agent's decision: which tool to call with what arguments, or
/// `tool = None` meaning execution cannot proceed.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExecutionPlan {
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(rename = "toolArguments", default)]
    pub tool_arguments: Map<String, Value>,
    #[serde(rename = "routedQuery", default)]
    pub routed_query: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub discovery: Option<DiscoveryHint>,
    #[serde(default)]
    pub workflow: Option<WorkflowSpec>,
}

impl ExecutionPlan {
    pub fn can_execute(&self) -> bool {
        self.tool.is_some()
    }
}

/// The Plan Agent's route decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    #[default]
    LocalMcp,
    ChatOnly,
}

/// Raw JSON returned by the route-decision LLM call, parsed defensively.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteDecision {
    pub route: Route,
    pub query: String,
    #[serde(default)]
    pub explanation: String,
}
