use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let (chat_ok, embeddings_ok) = state.llm.health().await;
    let indexed_chunks = state.chat.indexed_chunks().await?;
    let status = if chat_ok && embeddings_ok { "ok" } else { "degraded" };

    Ok(Json(json!({
        "status": status,
        "pipeline": state.chat.pipeline_kind().as_str(),
        "sessions": state.history.session_count().await,
        "indexed_chunks": indexed_chunks,
        "models": {
            "chat": { "model": state.llm.chat_model(), "reachable": chat_ok },
            "embeddings": { "model": state.llm.embedding_model(), "reachable": embeddings_ok },
        },
    })))
}
