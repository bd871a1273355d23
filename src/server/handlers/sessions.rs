use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::state::AppState;

/// Read-only view of a session's turns, oldest first. `limit` keeps the most
/// recent turns.
pub async fn get_session_messages(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let turns = state.chat.session_turns(&session_id).await?;
    let limit = params
        .get("limit")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(turns.len());
    let start = turns.len().saturating_sub(limit);

    let messages: Vec<Value> = turns[start..]
        .iter()
        .map(|turn| {
            json!({
                "role": turn.role.as_str(),
                "content": turn.content,
                "timestamp": turn.created_at.to_rfc3339(),
            })
        })
        .collect();

    Ok(Json(json!({
        "session_id": session_id,
        "messages": messages,
    })))
}
