//! Typed view of the merged configuration tree.
//!
//! Every field carries a serde default so an empty `config.yml` (or none at
//! all) yields a working local setup: Ollama serving `orca-mini` for both chat
//! and embeddings on `127.0.0.1:8000`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chain::prompts::PromptConfig;
use crate::chain::{Backoff, RetryPolicy};
use crate::rag::ContextBuilderConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: ModelEndpointConfig,
    pub embeddings: ModelEndpointConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub retry: RetryConfig,
    pub chat_history: ChatHistoryConfig,
    pub prompts: PromptConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Empty list allows any origin.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Ollama,
    /// OpenAI itself, or any other `/v1` server when `base_url` is set.
    #[serde(alias = "openai_compatible")]
    OpenAi,
    /// Mistral's hosted API; same wire format as OpenAI.
    Mistral,
    /// A local LM Studio server.
    LmStudio,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "ollama",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Mistral => "mistral",
            ProviderKind::LmStudio => "lmstudio",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "http://localhost:11434",
            ProviderKind::OpenAi => "https://api.openai.com",
            ProviderKind::Mistral => "https://api.mistral.ai",
            ProviderKind::LmStudio => "http://localhost:1234",
        }
    }

    /// Whether the backend is reached through `OpenAiCompatibleProvider`.
    pub fn speaks_openai_api(&self) -> bool {
        !matches!(self, ProviderKind::Ollama)
    }
}

/// Which backend to call and how, for either the chat model or the embedder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelEndpointConfig {
    pub provider: ProviderKind,
    pub base_url: Option<String>,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: Option<f64>,
    /// Completion length cap; the backend's own limit applies when unset.
    pub max_tokens: Option<u32>,
    pub request_timeout_secs: u64,
}

impl ModelEndpointConfig {
    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| self.provider.default_base_url())
            .to_string()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ModelEndpointConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Ollama,
            base_url: None,
            model: "orca-mini".to_string(),
            api_key: None,
            temperature: None,
            max_tokens: None,
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Trailing characters repeated at the start of the next chunk.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Restrict retrieval to chunks ingested by the asking session.
    pub partition_by_session: bool,
    /// Character budget for the grounding block; the best chunk is always kept.
    pub max_context_chars: usize,
    pub include_citations: bool,
}

impl RetrievalConfig {
    pub fn context_builder(&self) -> ContextBuilderConfig {
        ContextBuilderConfig {
            max_context_length: self.max_context_chars,
            include_citations: self.include_citations,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            partition_by_session: false,
            max_context_chars: 8000,
            include_citations: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_secs: u64,
    pub backoff: BackoffKind,
    pub max_delay_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    #[default]
    Fixed,
    Exponential,
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        let backoff = match self.backoff {
            BackoffKind::Fixed => Backoff::Fixed,
            BackoffKind::Exponential => Backoff::Exponential {
                max_delay: Duration::from_secs(self.max_delay_secs),
            },
        };
        RetryPolicy::new(self.max_attempts, Duration::from_secs(self.delay_secs))
            .with_backoff(backoff)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            delay_secs: 60,
            backoff: BackoffKind::Fixed,
            max_delay_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatHistoryConfig {
    /// Most recent turns handed to the model; the store itself keeps everything.
    pub window: usize,
}

impl Default for ChatHistoryConfig {
    fn default() -> Self {
        Self { window: 40 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_tree_yields_local_defaults() {
        let config: AppConfig = serde_json::from_value(json!({})).expect("defaults");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.llm.provider, ProviderKind::Ollama);
        assert_eq!(config.llm.model, "orca-mini");
        assert_eq!(config.embeddings.resolved_base_url(), "http://localhost:11434");
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 0);
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.delay_secs, 60);
        assert!(!config.retrieval.partition_by_session);
        assert_eq!(config.llm.max_tokens, None);
    }

    #[test]
    fn retrieval_section_drives_the_context_builder() {
        let config: AppConfig = serde_json::from_value(json!({
            "retrieval": { "max_context_chars": 1200, "include_citations": false },
            "llm": { "max_tokens": 256 }
        }))
        .expect("config");

        let builder = config.retrieval.context_builder();
        assert_eq!(builder.max_context_length, 1200);
        assert!(!builder.include_citations);
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.llm.max_tokens, Some(256));
    }

    #[test]
    fn hosted_providers_default_to_their_own_hosts() {
        let config: ModelEndpointConfig = serde_json::from_value(json!({
            "provider": "mistral",
            "model": "codestral-2405",
            "api_key": "mistral-secret"
        }))
        .expect("endpoint");
        assert_eq!(config.provider, ProviderKind::Mistral);
        assert!(config.provider.speaks_openai_api());
        assert_eq!(config.resolved_base_url(), "https://api.mistral.ai");

        let lmstudio: ModelEndpointConfig =
            serde_json::from_value(json!({"provider": "lmstudio"})).expect("endpoint");
        assert_eq!(lmstudio.resolved_base_url(), "http://localhost:1234");

        let generic: ModelEndpointConfig =
            serde_json::from_value(json!({"provider": "openai_compatible"})).expect("endpoint");
        assert_eq!(generic.provider, ProviderKind::OpenAi);
        assert_eq!(generic.resolved_base_url(), "https://api.openai.com");
    }

    #[test]
    fn exponential_retry_config_builds_capped_policy() {
        let retry = RetryConfig {
            max_attempts: 4,
            delay_secs: 10,
            backoff: BackoffKind::Exponential,
            max_delay_secs: 25,
        };
        let policy = retry.policy();
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(
            policy.backoff(),
            Backoff::Exponential {
                max_delay: Duration::from_secs(25)
            }
        );
        assert_eq!(policy.delay_before_attempt(2), Duration::from_secs(10));
        assert_eq!(policy.delay_before_attempt(3), Duration::from_secs(20));
        assert_eq!(policy.delay_before_attempt(4), Duration::from_secs(25));
    }
}
