//! Shared domain types for the bridge orchestrator: tool descriptors and
//! manifest context, execution plans and workflows, the agent response, the
//! A2A envelope, and the workflow sync payload.

pub mod a2a;
pub mod plan;
pub mod response;
pub mod sync;
pub mod tool;

pub use a2a::{A2aMessage, ProgressEvent};
pub use plan::{DiscoveryHint, ExecutionPlan, Route, RouteDecision, WhenClause, WorkflowSpec, WorkflowStep};
pub use response::{AgentResponse, MissingSentinel, PlanTrace, QualityCheck, WorkflowStepTrace};
pub use sync::{parse_sync_payload, SyncPayload};
pub use tool::{merge_tool_descriptors, CallResult, InputSchema, ManifestContext, PropertySchema, ToolDescriptor};
