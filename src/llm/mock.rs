//! Scripted provider used by the unit tests in place of a live backend.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::provider::LlmProvider;
use super::service::{LlmService, ModelBinding};
use super::types::{ChatMessage, ChatRequest};
use crate::core::errors::ApiError;

const EMBEDDING_DIM: usize = 64;

type Responder = dyn Fn(&[ChatMessage]) -> Result<String, ApiError> + Send + Sync;

pub struct MockProvider {
    responder: Box<Responder>,
    failing_chats: AtomicUsize,
    failing_embeds: AtomicUsize,
    chat_calls: AtomicUsize,
    embed_calls: AtomicUsize,
    transcripts: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockProvider {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&[ChatMessage]) -> Result<String, ApiError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            failing_chats: AtomicUsize::new(0),
            failing_embeds: AtomicUsize::new(0),
            chat_calls: AtomicUsize::new(0),
            embed_calls: AtomicUsize::new(0),
            transcripts: Mutex::new(Vec::new()),
        }
    }

    /// Answers from the `<context>` block when one is present, echoes otherwise.
    pub fn grounded() -> Self {
        Self::new(|messages| Ok(grounded_reply(messages)))
    }

    /// Fails the next `count` chat calls before behaving normally.
    pub fn fail_next_chats(self, count: usize) -> Self {
        self.failing_chats.store(count, Ordering::SeqCst);
        self
    }

    pub fn fail_next_embeds(self, count: usize) -> Self {
        self.failing_embeds.store(count, Ordering::SeqCst);
        self
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    pub fn transcripts(&self) -> Vec<Vec<ChatMessage>> {
        self.transcripts.lock().map(|t| t.clone()).unwrap_or_default()
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(true)
    }

    async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, ApiError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut transcripts) = self.transcripts.lock() {
            transcripts.push(request.messages.clone());
        }
        if Self::take_failure(&self.failing_chats) {
            return Err(ApiError::Upstream("model unavailable".to_string()));
        }
        (self.responder)(&request.messages)
    }

    async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.failing_embeds) {
            return Err(ApiError::Upstream("embedder unavailable".to_string()));
        }
        Ok(inputs.iter().map(|text| keyword_embedding(text)).collect())
    }
}

/// Builds an `LlmService` whose chat and embedding calls both go to `provider`.
pub fn service_with(provider: Arc<MockProvider>) -> LlmService {
    LlmService::new(
        ModelBinding::new(provider.clone(), "mock-chat"),
        ModelBinding::new(provider, "mock-embed"),
    )
}

/// Hashed bag-of-words vector; texts sharing words point the same way.
pub fn keyword_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; EMBEDDING_DIM];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(str::to_lowercase)
    {
        let mut hasher = DefaultHasher::new();
        word.hash(&mut hasher);
        vector[(hasher.finish() as usize) % EMBEDDING_DIM] += 1.0;
    }
    // keeps texts without keywords from producing a zero vector
    vector[0] += 0.01;
    vector
}

fn grounded_reply(messages: &[ChatMessage]) -> String {
    let question = messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.clone())
        .unwrap_or_default();

    let system = messages
        .iter()
        .filter(|m| m.role == "system")
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    if system.contains("standalone question") {
        return question;
    }

    let Some(context) = extract_context(&system) else {
        return format!("Plain answer to: {}", question);
    };

    let facts = context
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('['))
        .collect::<Vec<_>>();

    if facts.is_empty() {
        "I don't know.".to_string()
    } else {
        format!("According to the page: {}", facts.join(" "))
    }
}

fn extract_context(system: &str) -> Option<&str> {
    let start = system.find("<context>")? + "<context>".len();
    let end = system[start..].find("</context>")? + start;
    Some(&system[start..end])
}
