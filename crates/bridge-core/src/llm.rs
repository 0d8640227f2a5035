//! Language-model boundary: a small trait so the orchestrator never talks
//! to a provider SDK directly, plus an `async-openai`-backed implementation.

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs, ResponseFormat,
};
use async_openai::Client;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm request failed: {0}")]
    Request(String),
    #[error("llm returned no content")]
    EmptyResponse,
}

/// Everything the orchestrator needs from a language model: free text, and
/// JSON-mode text for the planner/evaluator's structured replies.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete_text(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;
    async fn complete_json(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;
}

pub struct OpenAiLlmClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiLlmClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key.into());
        Self {
            client: Client::with_config(config),
            model: model.into(),
        }
    }

    fn to_request_messages(
        messages: &[ChatMessage],
    ) -> Result<Vec<ChatCompletionRequestMessage>, LlmError> {
        messages
            .iter()
            .map(|m| match m.role {
                Role::System => ChatCompletionRequestSystemMessageArgs::default()
                    .content(m.content.clone())
                    .build()
                    .map(Into::into)
                    .map_err(|e| LlmError::Request(e.to_string())),
                Role::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(m.content.clone())
                    .build()
                    .map(Into::into)
                    .map_err(|e| LlmError::Request(e.to_string())),
                Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(m.content.clone())
                    .build()
                    .map(Into::into)
                    .map_err(|e| LlmError::Request(e.to_string())),
            })
            .collect()
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        json_mode: bool,
    ) -> Result<String, LlmError> {
        let request_messages = Self::to_request_messages(messages)?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(&self.model).messages(request_messages);
        if json_mode {
            builder.response_format(ResponseFormat::JsonObject);
        }
        let request = builder.build().map_err(|e| LlmError::Request(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl LlmClient for OpenAiLlmClient {
    #[tracing::instrument(skip(self, messages))]
    async fn complete_text(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.complete(messages, false).await
    }

    #[tracing::instrument(skip(self, messages))]
    async fn complete_json(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.complete(messages, true).await
    }
}
