//! The agent response returned at the end of the pipeline, and its trace.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::plan::Route;

/// Sentinel naming what input is missing when `requires_input` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSentinel {
    Paths,
    ExecutionPlan,
    WorkspaceState,
}

/// `{pass, score, feedback}` from the Evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityCheck {
    pub pass: bool,
    pub score: u8,
    #[serde(default)]
    pub feedback: String,
}

impl Default for QualityCheck {
    fn default() -> Self {
        Self {
            pass: true,
            score: 80,
            feedback: String::new(),
        }
    }
}

/// Observability trace attached to the final response: manifest status,
/// selected tool, discovery attempts, search-retry, workflow outcomes.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlanTrace {
    #[serde(default)]
    pub manifest_ok: Option<bool>,
    #[serde(default)]
    pub selected_tool: Option<String>,
    #[serde(default)]
    pub discovery_attempted: bool,
    #[serde(default)]
    pub discovery_paths: Vec<String>,
    #[serde(default)]
    pub search_retried: bool,
    #[serde(default)]
    pub workflow_steps: Vec<WorkflowStepTrace>,
    #[serde(default)]
    pub workflow_proceeded: Option<bool>,
    #[serde(default)]
    pub retried: bool,
    #[serde(default)]
    pub summary_chained: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStepTrace {
    pub id: String,
    pub executed: bool,
    #[serde(default)]
    pub skip_reason: Option<String>,
}

/// The terminal (per-agent-call) response shape, merged and revised as it
/// flows through Writer/Evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub action: String,
    pub answer: String,
    pub route: Route,
    #[serde(rename = "routedQuery", default, skip_serializing_if = "Option::is_none")]
    pub routed_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(rename = "requiresInput", default, skip_serializing_if = "Option::is_none")]
    pub requires_input: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<MissingSentinel>,
    #[serde(rename = "mcpStatus")]
    pub mcp_status: u16,
    #[serde(rename = "qualityCheck", default, skip_serializing_if = "Option::is_none")]
    pub quality_check: Option<QualityCheck>,
    #[serde(rename = "agentTrace", default, skip_serializing_if = "Option::is_none")]
    pub agent_trace: Option<PlanTrace>,
}

impl AgentResponse {
    pub fn is_success(&self) -> bool {
        self.mcp_status < 400
    }

    pub fn requires_input(mut self, missing: MissingSentinel) -> Self {
        self.requires_input = Some(true);
        self.missing = Some(missing);
        self
    }
}
