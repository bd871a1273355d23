use async_trait::async_trait;

use super::types::ChatRequest;
use crate::core::errors::ApiError;

/// A model server reachable over HTTP. Transport and protocol failures are
/// reported as `ApiError::Upstream`.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the server answers at all; never fails on network errors.
    async fn health_check(&self) -> Result<bool, ApiError>;

    /// Non-streaming completion; returns the assistant text.
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, ApiError>;

    /// One vector per input, in input order.
    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, ApiError>;
}
