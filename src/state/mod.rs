use std::sync::Arc;

use crate::chain::ChatService;
use crate::core::config::{AppConfig, AppPaths, ConfigService};
use crate::history::HistoryStore;
use crate::llm::LlmService;
use crate::rag::RetrievalIndex;

pub mod error;

use error::InitializationError;

/// Shared state handed to every route.
///
/// Everything here lives in memory for the lifetime of the process:
/// session histories, the retrieval index and the active pipeline.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: Arc<AppConfig>,
    pub history: HistoryStore,
    pub llm: LlmService,
    pub chat: ChatService,
}

impl AppState {
    /// Loads configuration through `config` and wires the model clients,
    /// session store, retrieval index and chat service.
    pub fn initialize(config: &ConfigService) -> Result<Arc<Self>, InitializationError> {
        let app_config = config
            .load_config()
            .map_err(|e| InitializationError::Config(e.into()))?;
        let llm =
            LlmService::from_config(&app_config).map_err(|e| InitializationError::Llm(e.into()))?;

        Ok(Self::with_llm(
            Arc::new(config.paths().clone()),
            app_config,
            llm,
        ))
    }

    pub fn with_llm(paths: Arc<AppPaths>, config: AppConfig, llm: LlmService) -> Arc<Self> {
        let history = HistoryStore::new();
        let index = RetrievalIndex::in_memory(llm.clone());
        let chat = ChatService::new(llm.clone(), history.clone(), index, &config);

        Arc::new(Self {
            paths,
            config: Arc::new(config),
            history,
            llm,
            chat,
        })
    }
}
