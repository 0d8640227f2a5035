//! Chat Agent (spec.md §4.7): passthrough LLM answer for the `chat_only`
//! route.

use std::sync::Arc;

use bridge_types::{AgentResponse, Route};

use crate::llm::{ChatMessage, LlmClient};

const CHAT_ONLY_SYSTEM_PROMPT: &str = "You are a helpful assistant answering directly, without any tools.";

pub struct ChatAgent {
    llm: Arc<dyn LlmClient>,
}

impl ChatAgent {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn answer(&self, prompt: &str) -> AgentResponse {
        let messages = [ChatMessage::system(CHAT_ONLY_SYSTEM_PROMPT), ChatMessage::user(prompt)];
        let answer = self
            .llm
            .complete_text(&messages)
            .await
            .unwrap_or_else(|_| "죄송합니다, 답변을 생성하지 못했습니다.".to_string());

        AgentResponse {
            action: "chat-only".to_string(),
            answer,
            route: Route::ChatOnly,
            routed_query: None,
            explanation: None,
            tool: None,
            arguments: None,
            result: None,
            requires_input: None,
            missing: None,
            mcp_status: 200,
            quality_check: None,
            agent_trace: None,
        }
    }
}
