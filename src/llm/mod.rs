pub mod ollama;
pub mod openai;
pub mod provider;
pub mod service;
pub mod types;

#[cfg(test)]
pub mod mock;

pub use provider::LlmProvider;
pub use service::{LlmService, ModelBinding};
pub use types::{ChatMessage, ChatRequest};
