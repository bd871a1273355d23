use std::sync::Arc;

use reqwest::Client;

use crate::core::config::{AppConfig, ModelEndpointConfig};
use crate::core::errors::ApiError;
use crate::llm::ollama::OllamaProvider;
use crate::llm::openai::OpenAiCompatibleProvider;
use crate::llm::provider::LlmProvider;
use crate::llm::types::{ChatMessage, ChatRequest};

/// A provider bound to the model it should be asked for.
#[derive(Clone)]
pub struct ModelBinding {
    pub provider: Arc<dyn LlmProvider>,
    pub model_id: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl ModelBinding {
    pub fn new(provider: Arc<dyn LlmProvider>, model_id: impl Into<String>) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn from_config(config: &ModelEndpointConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(ApiError::internal)?;
        let base_url = config.resolved_base_url();

        let provider: Arc<dyn LlmProvider> = if config.provider.speaks_openai_api() {
            Arc::new(OpenAiCompatibleProvider::new(
                base_url,
                config.api_key.clone(),
                client,
            ))
        } else {
            Arc::new(OllamaProvider::new(base_url, client))
        };

        Ok(Self {
            provider,
            model_id: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

/// Entry point for every model and embedding call made by the chains.
#[derive(Clone)]
pub struct LlmService {
    chat: ModelBinding,
    embeddings: ModelBinding,
}

impl LlmService {
    pub fn new(chat: ModelBinding, embeddings: ModelBinding) -> Self {
        Self { chat, embeddings }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ApiError> {
        Ok(Self::new(
            ModelBinding::from_config(&config.llm)?,
            ModelBinding::from_config(&config.embeddings)?,
        ))
    }

    pub fn chat_model(&self) -> &str {
        &self.chat.model_id
    }

    pub fn embedding_model(&self) -> &str {
        &self.embeddings.model_id
    }

    pub async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, ApiError> {
        let request = ChatRequest::new(messages)
            .with_temperature(self.chat.temperature)
            .with_max_tokens(self.chat.max_tokens);
        tracing::debug!(
            "Chat request to {} via {}",
            self.chat.model_id,
            self.chat.provider.name()
        );
        self.chat
            .provider
            .chat(request, &self.chat.model_id)
            .await
    }

    pub async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self
            .embeddings
            .provider
            .embed(inputs, &self.embeddings.model_id)
            .await?;

        if vectors.len() != inputs.len() {
            return Err(ApiError::Upstream(format!(
                "Embedding backend returned {} vectors for {} inputs",
                vectors.len(),
                inputs.len()
            )));
        }
        if vectors.iter().any(|v| v.is_empty()) {
            return Err(ApiError::Upstream(
                "Embedding backend returned an empty vector".to_string(),
            ));
        }

        Ok(vectors)
    }

    pub async fn embed_one(&self, input: &str) -> Result<Vec<f32>, ApiError> {
        let mut vectors = self.embed(&[input.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| ApiError::Upstream("Embedding backend returned nothing".to_string()))
    }

    /// Reachability of the chat and embedding backends.
    pub async fn health(&self) -> (bool, bool) {
        let chat = self.chat.provider.health_check().await.unwrap_or(false);
        let embeddings = self
            .embeddings
            .provider
            .health_check()
            .await
            .unwrap_or(false);
        (chat, embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ProviderKind;

    #[test]
    fn hosted_backends_use_the_openai_client() {
        let config = ModelEndpointConfig {
            provider: ProviderKind::Mistral,
            model: "mistral-embed".to_string(),
            api_key: Some("mistral-secret".to_string()),
            max_tokens: Some(512),
            ..ModelEndpointConfig::default()
        };

        let binding = ModelBinding::from_config(&config).expect("binding");

        assert_eq!(binding.provider.name(), "openai");
        assert_eq!(binding.model_id, "mistral-embed");
        assert_eq!(binding.max_tokens, Some(512));
        assert_eq!(config.resolved_base_url(), "https://api.mistral.ai");
    }

    #[test]
    fn default_backend_is_ollama() {
        let binding = ModelBinding::from_config(&ModelEndpointConfig::default()).expect("binding");
        assert_eq!(binding.provider.name(), "ollama");
        assert_eq!(binding.model_id, "orca-mini");
    }
}
