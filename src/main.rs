use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use pagechat_backend::core::config::{AppPaths, ConfigService};
use pagechat_backend::core::logging;
use pagechat_backend::server;
use pagechat_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ConfigService::load_dotenv();

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let config = ConfigService::new(paths.clone());
    let effective = config.redact_sensitive_values(&config.load_raw());
    tracing::info!("Effective configuration: {}", effective);

    let state = AppState::initialize(&config)?;
    let policy = state.chat.invoker().policy();
    tracing::info!(
        "Chat model {}, embedding model {}, up to {} attempts per request with {:?} backoff (worst-case wait {:?})",
        state.llm.chat_model(),
        state.llm.embedding_model(),
        policy.max_attempts(),
        policy.backoff(),
        policy.worst_case_delay()
    );

    let bind_addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
