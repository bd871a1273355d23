use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::ChatRequest;
use crate::core::errors::ApiError;

/// Backend speaking the OpenAI `/v1` REST API (OpenAI, Mistral, LM Studio).
#[derive(Clone)]
pub struct OpenAiCompatibleProvider {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(base_url: String, api_key: Option<String>, client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        if self.base_url.ends_with("/v1") {
            format!("{}/{}", self.base_url, path)
        } else {
            format!("{}/v1/{}", self.base_url, path)
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let res = self.authorized(self.client.get(self.url("models"))).send().await;
        match res {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, ApiError> {
        let mut body = json!({
            "model": model_id,
            "messages": request.messages,
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature { obj.insert("temperature".to_string(), json!(t)); }
            if let Some(t) = request.max_tokens { obj.insert("max_tokens".to_string(), json!(t)); }
        }

        let res = self
            .authorized(self.client.post(self.url("chat/completions")))
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!("Chat completion failed ({}): {}", status, text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|content| content.to_string())
            .ok_or_else(|| ApiError::Upstream("Chat completion returned no content".to_string()))
    }

    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let res = self
            .authorized(self.client.post(self.url("embeddings")))
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!("Embedding request failed ({}): {}", status, text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        Ok(parse_embeddings(&payload))
    }
}

fn parse_embeddings(payload: &Value) -> Vec<Vec<f32>> {
    let mut embeddings = Vec::new();
    if let Some(data) = payload["data"].as_array() {
        for item in data {
            if let Some(vals) = item["embedding"].as_array() {
                let vec: Vec<f32> = vals.iter().filter_map(|v| v.as_f64().map(|f| f as f32)).collect();
                embeddings.push(vec);
            }
        }
    }
    embeddings
}
