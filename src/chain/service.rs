use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::config::AppConfig;
use crate::core::errors::ApiError;
use crate::history::{HistoryStore, Turn};
use crate::llm::LlmService;
use crate::rag::{ContextBuilderConfig, RagContextBuilder, RecursiveTextSplitter, RetrievalIndex, SourceDocument};

use super::invoker::ResilientInvoker;
use super::pipeline::{Pipeline, PipelineAnswer, PipelineInput, PipelineKind, PlainChatChain, RagChain};
use super::prompts::PromptConfig;
use super::reformulator::QueryReformulator;
use super::selector::PipelineSelector;
use super::synthesizer::AnswerSynthesizer;

/// Page content submitted by the extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContext {
    pub content: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub ingestion_id: String,
    pub chunks: usize,
    pub pipeline: PipelineKind,
    /// Whether this ingestion moved the process onto the retrieval pipeline.
    pub switched: bool,
}

/// Entry point for the two core operations: ingesting page context and
/// answering a query for a session.
#[derive(Clone)]
pub struct ChatService {
    llm: LlmService,
    history: HistoryStore,
    index: RetrievalIndex,
    splitter: RecursiveTextSplitter,
    selector: Arc<PipelineSelector>,
    invoker: ResilientInvoker,
    prompts: PromptConfig,
    context: ContextBuilderConfig,
    top_k: usize,
    partition_by_session: bool,
    history_window: usize,
}

impl ChatService {
    pub fn new(llm: LlmService, history: HistoryStore, index: RetrievalIndex, config: &AppConfig) -> Self {
        let plain = Pipeline::PlainChat(PlainChatChain::new(llm.clone(), config.prompts.chat.clone()));

        Self {
            llm,
            history,
            index,
            splitter: RecursiveTextSplitter::new(
                config.chunking.chunk_size,
                config.chunking.chunk_overlap,
            ),
            selector: Arc::new(PipelineSelector::new(plain)),
            invoker: ResilientInvoker::new(config.retry.policy()),
            prompts: config.prompts.clone(),
            context: config.retrieval.context_builder(),
            top_k: config.retrieval.top_k,
            partition_by_session: config.retrieval.partition_by_session,
            history_window: config.chat_history.window,
        }
    }

    pub fn pipeline_kind(&self) -> PipelineKind {
        self.selector.kind()
    }

    pub fn invoker(&self) -> &ResilientInvoker {
        &self.invoker
    }

    pub async fn indexed_chunks(&self) -> Result<usize, ApiError> {
        self.index.count().await
    }

    /// Chunks and indexes `context`, then switches every session onto the
    /// retrieval pipeline if that has not happened yet. Blank content is
    /// rejected and leaves the pipeline untouched.
    pub async fn ingest_context(
        &self,
        session_id: &str,
        context: PageContext,
    ) -> Result<IngestReport, ApiError> {
        require_session_id(session_id)?;
        if context.content.trim().is_empty() {
            return Err(ApiError::BadRequest("context.content must not be empty".to_string()));
        }

        let ingestion_id = Uuid::new_v4().to_string();
        let document = SourceDocument {
            content: context.content,
            title: context.title,
            url: context.url,
            session_id: session_id.to_string(),
        };
        let chunks = self.splitter.split_document(&document, &ingestion_id);
        let chunks = self.index.add(chunks).await?;

        let switched = self.selector.upgrade_to_rag(|| self.build_rag_pipeline());

        tracing::info!(
            "Ingested {} chunks from {} for session {}",
            chunks,
            document.url.as_deref().unwrap_or("<no url>"),
            session_id
        );

        Ok(IngestReport {
            ingestion_id,
            chunks,
            pipeline: self.selector.kind(),
            switched,
        })
    }

    /// Answers `query` with the active pipeline, retrying per the configured
    /// policy. The exchange is recorded only when an answer was produced.
    pub async fn answer(&self, session_id: &str, query: &str) -> Result<PipelineAnswer, ApiError> {
        require_session_id(session_id)?;
        if query.trim().is_empty() {
            return Err(ApiError::BadRequest("query must not be empty".to_string()));
        }

        let input = PipelineInput {
            session_id: session_id.to_string(),
            question: query.to_string(),
            history: self.history.history(session_id, self.history_window).await,
        };
        let pipeline = self.selector.current();

        let answer = self
            .invoker
            .invoke_with_retry(&pipeline, &input)
            .await
            .map_err(|exhausted| {
                tracing::error!("Giving up on session {}: {}", session_id, exhausted);
                ApiError::from(exhausted)
            })?;

        self.history
            .append_exchange(session_id, query, &answer.answer)
            .await;

        Ok(answer)
    }

    pub async fn session_turns(&self, session_id: &str) -> Result<Vec<Turn>, ApiError> {
        self.history
            .existing_history(session_id)
            .await
            .ok_or_else(|| ApiError::NotFound(format!("Session {} not found", session_id)))
    }

    fn build_rag_pipeline(&self) -> Pipeline {
        let reformulator = QueryReformulator::new(self.llm.clone(), self.prompts.reformulation.clone());
        let synthesizer = AnswerSynthesizer::new(
            self.llm.clone(),
            self.prompts.grounded_answer.clone(),
            RagContextBuilder::new(self.context.clone()),
        );
        Pipeline::RetrievalAugmented(
            RagChain::new(self.index.clone(), reformulator, synthesizer, self.top_k)
                .partitioned(self.partition_by_session),
        )
    }
}

fn require_session_id(session_id: &str) -> Result<(), ApiError> {
    if session_id.trim().is_empty() {
        return Err(ApiError::BadRequest("session_id must not be empty".to_string()));
    }
    Ok(())
}
