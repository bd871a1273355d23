use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;
use crate::history::Turn;
use crate::llm::{ChatMessage, LlmService};
use crate::rag::RetrievalIndex;

use super::prompts::PlainChatPrompt;
use super::reformulator::QueryReformulator;
use super::synthesizer::AnswerSynthesizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    PlainChat,
    RetrievalAugmented,
}

impl PipelineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::PlainChat => "plain_chat",
            PipelineKind::RetrievalAugmented => "retrieval_augmented",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineInput {
    pub session_id: String,
    pub question: String,
    /// Prior turns of the session, oldest first, excluding `question`.
    pub history: Vec<Turn>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineAnswer {
    pub answer: String,
    pub kind: PipelineKind,
    /// The question actually answered; differs from the input after reformulation.
    pub standalone_question: String,
    /// Pages the grounding context came from. Empty for plain chat.
    pub sources: Vec<String>,
}

/// Answers from the model and the session history alone.
#[derive(Clone)]
pub struct PlainChatChain {
    llm: LlmService,
    prompt: PlainChatPrompt,
}

impl PlainChatChain {
    pub fn new(llm: LlmService, prompt: PlainChatPrompt) -> Self {
        Self { llm, prompt }
    }

    pub async fn invoke(&self, input: &PipelineInput) -> Result<PipelineAnswer, ApiError> {
        let mut messages = Vec::with_capacity(input.history.len() + 2);
        messages.push(ChatMessage::system(self.prompt.system_message()));
        messages.extend(input.history.iter().map(Turn::to_chat_message));
        messages.push(ChatMessage::user(input.question.as_str()));

        let answer = self.llm.chat(messages).await?;
        Ok(PipelineAnswer {
            answer: answer.trim().to_string(),
            kind: PipelineKind::PlainChat,
            standalone_question: input.question.clone(),
            sources: Vec::new(),
        })
    }
}

/// Reformulates, retrieves from the shared index, then answers from the
/// retrieved chunks.
#[derive(Clone)]
pub struct RagChain {
    index: RetrievalIndex,
    reformulator: QueryReformulator,
    synthesizer: AnswerSynthesizer,
    top_k: usize,
    partition_by_session: bool,
}

impl RagChain {
    pub fn new(
        index: RetrievalIndex,
        reformulator: QueryReformulator,
        synthesizer: AnswerSynthesizer,
        top_k: usize,
    ) -> Self {
        Self {
            index,
            reformulator,
            synthesizer,
            top_k,
            partition_by_session: false,
        }
    }

    /// Restricts retrieval to chunks ingested by the asking session.
    pub fn partitioned(mut self, partition_by_session: bool) -> Self {
        self.partition_by_session = partition_by_session;
        self
    }

    pub async fn invoke(&self, input: &PipelineInput) -> Result<PipelineAnswer, ApiError> {
        let standalone = self
            .reformulator
            .reformulate(&input.history, &input.question)
            .await?;

        let scope = self
            .partition_by_session
            .then_some(input.session_id.as_str());
        let retrieved = self.index.query(&standalone, self.top_k, scope).await?;
        tracing::debug!(
            "Retrieved {} chunks for session {}",
            retrieved.len(),
            input.session_id
        );

        let grounded = self
            .synthesizer
            .synthesize(&standalone, &retrieved, &input.history)
            .await?;

        Ok(PipelineAnswer {
            answer: grounded.answer,
            kind: PipelineKind::RetrievalAugmented,
            standalone_question: standalone,
            sources: grounded.sources,
        })
    }
}

/// The answering strategy in effect process-wide.
#[derive(Clone)]
pub enum Pipeline {
    PlainChat(PlainChatChain),
    RetrievalAugmented(RagChain),
}

impl Pipeline {
    pub fn kind(&self) -> PipelineKind {
        match self {
            Pipeline::PlainChat(_) => PipelineKind::PlainChat,
            Pipeline::RetrievalAugmented(_) => PipelineKind::RetrievalAugmented,
        }
    }

    pub async fn invoke(&self, input: &PipelineInput) -> Result<PipelineAnswer, ApiError> {
        match self {
            Pipeline::PlainChat(chain) => chain.invoke(input).await,
            Pipeline::RetrievalAugmented(chain) => chain.invoke(input).await,
        }
    }
}
