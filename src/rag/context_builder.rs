//! Grounding context builder.
//!
//! Formats retrieved chunks into the numbered block handed to the answer
//! model and lists the pages those chunks came from.

use serde::{Deserialize, Serialize};

use super::store::RetrievedChunk;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextBuilderConfig {
    /// Maximum total context length in characters. The best chunk is always
    /// kept even when it alone exceeds the limit.
    pub max_context_length: usize,
    pub include_citations: bool,
}

impl Default for ContextBuilderConfig {
    fn default() -> Self {
        Self {
            max_context_length: 8000,
            include_citations: true,
        }
    }
}

/// Grounding block plus the distinct sources of the chunks it contains.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RagContext {
    pub text: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RagContextBuilder {
    config: ContextBuilderConfig,
}

impl RagContextBuilder {
    pub fn new(config: ContextBuilderConfig) -> Self {
        Self { config }
    }

    /// Chunks are expected best first, as returned by the index. Chunks cut
    /// by the length limit contribute neither text nor sources.
    pub fn build_context(&self, chunks: &[RetrievedChunk]) -> RagContext {
        let mut text = String::new();
        let mut sources: Vec<String> = Vec::new();
        let mut current_length = 0;

        for (i, retrieved) in chunks.iter().enumerate() {
            let source = citation(retrieved);
            let block = if self.config.include_citations {
                format!(
                    "[{}] (Source: {})\n{}\n\n",
                    i + 1,
                    source,
                    retrieved.chunk.content.trim()
                )
            } else {
                format!("{}\n\n", retrieved.chunk.content.trim())
            };

            let block_length = block.chars().count();
            if i > 0 && current_length + block_length > self.config.max_context_length {
                tracing::debug!(
                    "Context limit reached; dropped {} of {} chunks",
                    chunks.len() - i,
                    chunks.len()
                );
                break;
            }
            text.push_str(&block);
            current_length += block_length;
            if !sources.contains(&source) {
                sources.push(source);
            }
        }

        RagContext {
            text: text.trim().to_string(),
            sources,
        }
    }
}

fn citation(retrieved: &RetrievedChunk) -> String {
    let chunk = &retrieved.chunk;
    match (chunk.title.as_deref(), chunk.source.as_deref()) {
        (Some(title), Some(url)) if !title.is_empty() => format!("{}, {}", title, url),
        (_, Some(url)) => url.to_string(),
        (Some(title), None) if !title.is_empty() => title.to_string(),
        _ => "unknown".to_string(),
    }
}
