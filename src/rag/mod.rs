//! Retrieval layer.
//!
//! - `RecursiveTextSplitter`: splits submitted pages into chunks
//! - `RetrievalIndex`: embeds chunks and answers similarity queries
//! - `RagContextBuilder`: turns retrieved chunks into the grounding block

pub mod context_builder;
pub mod index;
pub mod splitter;
pub mod store;

pub use context_builder::{ContextBuilderConfig, RagContext, RagContextBuilder};
pub use index::RetrievalIndex;
pub use splitter::{RecursiveTextSplitter, SourceDocument};
pub use store::{DocumentChunk, MemoryRagStore, RagStore, RetrievedChunk};
