use crate::core::errors::ApiError;
use crate::history::Turn;
use crate::llm::{ChatMessage, LlmService};

use super::prompts::ReformulationPrompt;

/// Rewrites follow-up questions into standalone ones using the session history.
#[derive(Clone)]
pub struct QueryReformulator {
    llm: LlmService,
    prompt: ReformulationPrompt,
}

impl QueryReformulator {
    pub fn new(llm: LlmService, prompt: ReformulationPrompt) -> Self {
        Self { llm, prompt }
    }

    /// Without history the question is already standalone and no model call
    /// is made. An empty model reply also falls back to the original question.
    pub async fn reformulate(&self, history: &[Turn], question: &str) -> Result<String, ApiError> {
        if history.is_empty() {
            return Ok(question.to_string());
        }

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(self.prompt.system_message()));
        messages.extend(history.iter().map(Turn::to_chat_message));
        messages.push(ChatMessage::user(question));

        let standalone = self.llm.chat(messages).await?;
        let standalone = standalone.trim();
        if standalone.is_empty() {
            tracing::warn!("Reformulation returned nothing; using the original question");
            return Ok(question.to_string());
        }

        tracing::debug!("Reformulated {:?} as {:?}", question, standalone);
        Ok(standalone.to_string())
    }
}
