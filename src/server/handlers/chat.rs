use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::chain::PageContext;
use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub query: String,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PageContentBody {
    pub context: PageContext,
    pub session_id: String,
}

/// The extension parses the body as JSON, so the answer goes out as a JSON string.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatBody>,
) -> Result<Json<String>, ApiError> {
    let answer = state.chat.answer(&body.session_id, &body.query).await?;
    Ok(Json(answer.answer))
}

pub async fn ingest_page_content(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PageContentBody>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .chat
        .ingest_context(&body.session_id, body.context)
        .await?;

    Ok(Json(json!({
        "status": "ok",
        "chunks": report.chunks,
        "pipeline": report.pipeline.as_str(),
    })))
}
