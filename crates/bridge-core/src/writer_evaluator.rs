//! Writer/Evaluator pipeline (spec.md §4.6): a two-pass fixed-point loop
//! bounded at exactly two LLM calls per polishing phase.

use std::sync::Arc;

use bridge_types::{AgentResponse, QualityCheck};

use crate::llm::{ChatMessage, LlmClient};

const WRITER_SYSTEM_PROMPT: &str =
    "You are the final-answer writer. Hide tool names, file paths, and debug \
     details from the user. Be concise and user-facing. Reply in Korean.";

const EVALUATOR_SYSTEM_PROMPT: &str =
    "You are a quality judge. Reply with strict JSON only: \
     {\"pass\": bool, \"score\": 0-100, \"feedback\": string}.";

pub struct WriterEvaluator {
    llm: Arc<dyn LlmClient>,
}

impl WriterEvaluator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn polish(&self, user_prompt: &str, mut response: AgentResponse) -> AgentResponse {
        let draft = self.write(user_prompt, &response.answer, None).await;
        let evaluation = self.evaluate(user_prompt, &draft).await;

        if evaluation.pass {
            response.answer = draft;
            response.quality_check = Some(evaluation);
            return response;
        }

        let revised = self.write(user_prompt, &draft, Some(&evaluation.feedback)).await;
        let revised_evaluation = self.evaluate(user_prompt, &revised).await;

        response.answer = revised;
        response.quality_check = Some(revised_evaluation);
        response
    }

    async fn write(&self, user_prompt: &str, draft: &str, feedback: Option<&str>) -> String {
        let mut user_content = format!("user prompt: {user_prompt}\ncurrent draft: {draft}");
        if let Some(feedback) = feedback {
            user_content.push_str(&format!("\nfeedback: {feedback}"));
        }

        let messages = [ChatMessage::system(WRITER_SYSTEM_PROMPT), ChatMessage::user(user_content)];
        self.llm.complete_text(&messages).await.unwrap_or_else(|_| draft.to_string())
    }

    async fn evaluate(&self, user_prompt: &str, candidate: &str) -> QualityCheck {
        let user_content = format!("user prompt: {user_prompt}\ncandidate answer: {candidate}");
        let messages = [ChatMessage::system(EVALUATOR_SYSTEM_PROMPT), ChatMessage::user(user_content)];

        match self.llm.complete_json(&messages).await {
            Ok(text) => serde_json::from_str(&text).unwrap_or_default(),
            Err(_) => QualityCheck::default(),
        }
    }
}
