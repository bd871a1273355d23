//! RagStore trait: storage backend for embedded page chunks.
//!
//! The only implementation kept in-process is `MemoryRagStore`; chunks live
//! until the process exits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::core::errors::ApiError;
use crate::vector_math::rank_descending_by_cosine;

/// A chunk of page text with the metadata of the page it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// `{ingestion_id}-{chunk_index}`.
    pub chunk_id: String,
    pub content: String,
    pub title: Option<String>,
    /// Page URL, when the extension sent one.
    pub source: Option<String>,
    pub session_id: String,
    pub ingestion_id: String,
    pub chunk_index: usize,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: DocumentChunk,
    /// Cosine similarity, higher is closer.
    pub score: f32,
}

#[async_trait]
pub trait RagStore: Send + Sync {
    /// Inserts chunks with their embeddings. All-or-nothing: a batch whose
    /// vectors do not match the store's dimension is rejected whole.
    async fn insert_batch(&self, items: Vec<(DocumentChunk, Vec<f32>)>) -> Result<(), ApiError>;

    /// Up to `limit` chunks most similar to `query_embedding`, best first.
    /// `session_id` restricts the search to chunks ingested by that session.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        session_id: Option<&str>,
    ) -> Result<Vec<RetrievedChunk>, ApiError>;

    async fn count(&self, session_id: Option<&str>) -> Result<usize, ApiError>;
}

#[derive(Default)]
pub struct MemoryRagStore {
    entries: RwLock<Vec<(DocumentChunk, Vec<f32>)>>,
}

impl MemoryRagStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RagStore for MemoryRagStore {
    async fn insert_batch(&self, items: Vec<(DocumentChunk, Vec<f32>)>) -> Result<(), ApiError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut entries = self.entries.write().await;
        let expected = entries
            .first()
            .map(|(_, v)| v.len())
            .unwrap_or_else(|| items[0].1.len());

        for (chunk, embedding) in &items {
            if embedding.is_empty() || embedding.len() != expected {
                return Err(ApiError::Upstream(format!(
                    "Embedding for chunk {} has dimension {}, expected {}",
                    chunk.chunk_id,
                    embedding.len(),
                    expected
                )));
            }
        }

        entries.extend(items);
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        session_id: Option<&str>,
    ) -> Result<Vec<RetrievedChunk>, ApiError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let entries = self.entries.read().await;
        let candidates: Vec<&(DocumentChunk, Vec<f32>)> = entries
            .iter()
            .filter(|(chunk, _)| session_id.map_or(true, |id| chunk.session_id == id))
            .collect();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let vectors: Vec<&[f32]> = candidates.iter().map(|(_, v)| v.as_slice()).collect();
        let ranked = rank_descending_by_cosine(query_embedding, &vectors)?;

        Ok(ranked
            .into_iter()
            .take(limit)
            .map(|(idx, score)| RetrievedChunk {
                chunk: candidates[idx].0.clone(),
                score,
            })
            .collect())
    }

    async fn count(&self, session_id: Option<&str>) -> Result<usize, ApiError> {
        let entries = self.entries.read().await;
        Ok(match session_id {
            Some(id) => entries.iter().filter(|(c, _)| c.session_id == id).count(),
            None => entries.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, session: &str, content: &str) -> DocumentChunk {
        DocumentChunk {
            chunk_id: id.to_string(),
            content: content.to_string(),
            title: None,
            source: None,
            session_id: session.to_string(),
            ingestion_id: "ing".to_string(),
            chunk_index: 0,
        }
    }

    #[tokio::test]
    async fn search_ranks_by_similarity_and_honours_limit() {
        let store = MemoryRagStore::new();
        store
            .insert_batch(vec![
                (chunk("a", "s1", "far"), vec![0.0, 1.0]),
                (chunk("b", "s1", "near"), vec![1.0, 0.1]),
                (chunk("c", "s2", "middle"), vec![0.7, 0.7]),
            ])
            .await
            .expect("insert");

        let hits = store.search(&[1.0, 0.0], 2, None).await.expect("search");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.chunk_id, "b");
        assert_eq!(hits[1].chunk.chunk_id, "c");
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn search_can_be_scoped_to_a_session() {
        let store = MemoryRagStore::new();
        store
            .insert_batch(vec![
                (chunk("a", "s1", "one"), vec![1.0, 0.0]),
                (chunk("b", "s2", "two"), vec![1.0, 0.0]),
            ])
            .await
            .expect("insert");

        let hits = store.search(&[1.0, 0.0], 10, Some("s2")).await.expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.chunk_id, "b");
        assert_eq!(store.count(Some("s1")).await.expect("count"), 1);
        assert_eq!(store.count(None).await.expect("count"), 2);
    }

    #[tokio::test]
    async fn empty_store_returns_nothing() {
        let store = MemoryRagStore::new();
        assert!(store.search(&[1.0], 4, None).await.expect("search").is_empty());
        assert!(store.search(&[1.0], 0, None).await.expect("search").is_empty());
    }

    #[tokio::test]
    async fn mismatched_dimensions_reject_the_whole_batch() {
        let store = MemoryRagStore::new();
        store
            .insert_batch(vec![(chunk("a", "s", "x"), vec![1.0, 0.0])])
            .await
            .expect("insert");

        let result = store
            .insert_batch(vec![
                (chunk("b", "s", "y"), vec![1.0, 0.0]),
                (chunk("c", "s", "z"), vec![1.0, 0.0, 0.0]),
            ])
            .await;

        assert!(matches!(result, Err(ApiError::Upstream(_))));
        assert_eq!(store.count(None).await.expect("count"), 1);
    }

    #[tokio::test]
    async fn query_of_another_dimension_is_an_upstream_error() {
        let store = MemoryRagStore::new();
        store
            .insert_batch(vec![(chunk("a", "s", "x"), vec![1.0, 0.0])])
            .await
            .expect("insert");

        let result = store.search(&[1.0, 0.0, 0.0], 4, None).await;

        assert!(matches!(result, Err(ApiError::Upstream(_))));
    }
}
