use std::sync::Arc;

use crate::core::errors::ApiError;
use crate::llm::LlmService;

use super::store::{DocumentChunk, MemoryRagStore, RagStore, RetrievedChunk};

/// Embedding-backed chunk index shared by every session.
#[derive(Clone)]
pub struct RetrievalIndex {
    store: Arc<dyn RagStore>,
    llm: LlmService,
}

impl RetrievalIndex {
    pub fn new(store: Arc<dyn RagStore>, llm: LlmService) -> Self {
        Self { store, llm }
    }

    pub fn in_memory(llm: LlmService) -> Self {
        Self::new(Arc::new(MemoryRagStore::new()), llm)
    }

    /// Embeds every chunk in one batch and stores them. Nothing is stored
    /// when the embedding call fails.
    pub async fn add(&self, chunks: Vec<DocumentChunk>) -> Result<usize, ApiError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.llm.embed(&texts).await?;

        let added = chunks.len();
        self.store
            .insert_batch(chunks.into_iter().zip(embeddings).collect())
            .await?;

        tracing::debug!("Indexed {} chunks", added);
        Ok(added)
    }

    /// Top `k` chunks for `text`. `session_scope` limits the search to one
    /// session's chunks; `None` searches the whole index.
    pub async fn query(
        &self,
        text: &str,
        k: usize,
        session_scope: Option<&str>,
    ) -> Result<Vec<RetrievedChunk>, ApiError> {
        if k == 0 || self.store.count(session_scope).await? == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.llm.embed_one(text).await?;
        self.store.search(&embedding, k, session_scope).await
    }

    pub async fn count(&self) -> Result<usize, ApiError> {
        self.store.count(None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::{service_with, MockProvider};
    use crate::rag::splitter::{RecursiveTextSplitter, SourceDocument};

    fn document(session: &str, content: &str) -> SourceDocument {
        SourceDocument {
            content: content.to_string(),
            title: Some("Page".to_string()),
            url: Some("http://x".to_string()),
            session_id: session.to_string(),
        }
    }

    #[tokio::test]
    async fn add_embeds_in_a_single_batch() {
        let provider = Arc::new(MockProvider::grounded());
        let index = RetrievalIndex::in_memory(service_with(provider.clone()));
        let chunks = RecursiveTextSplitter::new(20, 0).split_document(
            &document("s", "The sky is blue. Grass is green. Snow is white."),
            "ing-1",
        );
        assert!(chunks.len() > 1);

        let added = index.add(chunks.clone()).await.expect("add");

        assert_eq!(added, chunks.len());
        assert_eq!(provider.embed_calls(), 1);
        assert_eq!(index.count().await.expect("count"), chunks.len());
    }

    #[tokio::test]
    async fn query_returns_most_similar_chunk_first() {
        let provider = Arc::new(MockProvider::grounded());
        let index = RetrievalIndex::in_memory(service_with(provider));
        let chunks = RecursiveTextSplitter::new(20, 0).split_document(
            &document("s", "The sky is blue. Grass is green. Snow is white."),
            "ing-1",
        );
        index.add(chunks).await.expect("add");

        let hits = index.query("is grass green", 1, None).await.expect("query");

        assert_eq!(hits.len(), 1);
        assert!(hits[0].chunk.content.contains("Grass"));
    }

    #[tokio::test]
    async fn query_on_empty_index_skips_embedding() {
        let provider = Arc::new(MockProvider::grounded());
        let index = RetrievalIndex::in_memory(service_with(provider.clone()));

        assert!(index.query("anything", 4, None).await.expect("query").is_empty());
        assert_eq!(provider.embed_calls(), 0);
    }

    #[tokio::test]
    async fn failed_embedding_stores_nothing() {
        let provider = Arc::new(MockProvider::grounded().fail_next_embeds(1));
        let index = RetrievalIndex::in_memory(service_with(provider));
        let chunks = RecursiveTextSplitter::new(500, 0)
            .split_document(&document("s", "The sky is blue."), "ing-1");

        assert!(matches!(index.add(chunks).await, Err(ApiError::Upstream(_))));
        assert_eq!(index.count().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn concurrent_add_and_query() {
        let provider = Arc::new(MockProvider::grounded());
        let index = RetrievalIndex::in_memory(service_with(provider));
        let splitter = RecursiveTextSplitter::new(500, 0);

        let mut tasks = Vec::new();
        for i in 0..8 {
            let index = index.clone();
            let chunks = splitter.split_document(
                &document(&format!("s{}", i), &format!("Fact number {} about rivers.", i)),
                &format!("ing-{}", i),
            );
            tasks.push(tokio::spawn(async move {
                index.add(chunks).await.expect("add");
                index.query("rivers", 3, None).await.expect("query").len()
            }));
        }
        for task in tasks {
            let hits = task.await.expect("task");
            assert!(hits >= 1);
        }

        assert_eq!(index.count().await.expect("count"), 8);
    }
}
