use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};

use super::provider::LlmProvider;
use super::types::ChatRequest;
use crate::core::errors::ApiError;

#[derive(Clone)]
pub struct OllamaProvider {
    base_url: String,
    client: Client,
}

impl OllamaProvider {
    pub fn new(base_url: String, client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, ApiError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = json!({
            "model": model_id,
            "messages": request.messages,
            "stream": false,
            "options": chat_options(&request),
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!("Ollama chat error ({}): {}", status, text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        if let Some(err) = payload["error"].as_str() {
            return Err(ApiError::Upstream(format!("Ollama chat error: {}", err)));
        }

        payload["message"]["content"]
            .as_str()
            .map(|content| content.to_string())
            .ok_or_else(|| ApiError::Upstream("Ollama chat returned no message".to_string()))
    }

    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        let url = format!("{}/api/embed", self.base_url);
        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!("Ollama embed error ({}): {}", status, text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        Ok(parse_embeddings(&payload))
    }
}

fn chat_options(request: &ChatRequest) -> Value {
    let mut options = Map::new();
    if let Some(t) = request.temperature {
        options.insert("temperature".to_string(), json!(t));
    }
    if let Some(n) = request.max_tokens {
        options.insert("num_predict".to_string(), json!(n));
    }
    Value::Object(options)
}

fn parse_embeddings(payload: &Value) -> Vec<Vec<f32>> {
    payload["embeddings"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|row| row.as_array())
                .map(|vals| vals.iter().filter_map(|v| v.as_f64().map(|f| f as f32)).collect())
                .collect()
        })
        .unwrap_or_default()
}
