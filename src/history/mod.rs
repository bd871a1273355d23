//! Per-session conversation memory.
//!
//! Sessions are created lazily on first reference and live for the whole
//! process. The outer map lock is only held to find or insert a session; each
//! session has its own mutex so traffic on one session never waits on another.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::llm::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage {
            role: self.role.as_str().to_string(),
            content: self.content.clone(),
        }
    }
}

#[derive(Debug)]
pub struct Session {
    id: String,
    turns: Vec<Turn>,
    created_at: DateTime<Utc>,
}

impl Session {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            turns: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// The last `window` turns, oldest first.
    pub fn recent(&self, window: usize) -> Vec<Turn> {
        let start = self.turns.len().saturating_sub(window);
        self.turns[start..].to_vec()
    }
}

pub type SessionHandle = Arc<Mutex<Session>>;

#[derive(Clone, Default)]
pub struct HistoryStore {
    sessions: Arc<RwLock<HashMap<String, SessionHandle>>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_create(&self, session_id: &str) -> SessionHandle {
        if let Some(existing) = self.sessions.read().await.get(session_id) {
            return existing.clone();
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::debug!("Created session {}", session_id);
                Arc::new(Mutex::new(Session::new(session_id)))
            })
            .clone()
    }

    pub async fn append(&self, session_id: &str, role: Role, text: impl Into<String>) {
        let handle = self.get_or_create(session_id).await;
        handle.lock().await.push(Turn::new(role, text));
    }

    /// Records a question and its answer back to back under one session lock.
    pub async fn append_exchange(&self, session_id: &str, user: &str, assistant: &str) {
        let handle = self.get_or_create(session_id).await;
        let mut session = handle.lock().await;
        session.push(Turn::new(Role::User, user));
        session.push(Turn::new(Role::Assistant, assistant));
    }

    pub async fn history(&self, session_id: &str, window: usize) -> Vec<Turn> {
        let handle = self.get_or_create(session_id).await;
        let session = handle.lock().await;
        session.recent(window)
    }

    /// Full history without creating the session when it is unknown.
    pub async fn existing_history(&self, session_id: &str) -> Option<Vec<Turn>> {
        let handle = self.sessions.read().await.get(session_id).cloned()?;
        let session = handle.lock().await;
        Some(session.turns().to_vec())
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn turn_count(&self, session_id: &str) -> usize {
        match self.sessions.read().await.get(session_id).cloned() {
            Some(handle) => handle.lock().await.turns().len(),
            None => 0,
        }
    }
}
