use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::config::settings::ServerConfig;
use crate::server::handlers::{chat, health, sessions};
use crate::state::AppState;

/// Creates the application router.
///
/// Both chat routes accept a trailing slash because the browser extension
/// posts to `/chat/` and `/chat/page-content/`.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.config.server);
    Router::new()
        .route("/health", get(health::health))
        .route("/chat", post(chat::chat))
        .route("/chat/", post(chat::chat))
        .route("/chat/page-content", post(chat::ingest_page_content))
        .route("/chat/page-content/", post(chat::ingest_page_content))
        .route(
            "/api/sessions/:session_id/messages",
            get(sessions::get_session_messages),
        )
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

/// Any origin when none are configured, otherwise only the listed ones.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let allowed_origins = config
        .cors_allowed_origins
        .iter()
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect::<Vec<_>>();

    let allow_origin = if allowed_origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed_origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}
