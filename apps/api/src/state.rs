use std::sync::Arc;

use crate::config::Config;
use crate::indexing::EmbeddingIndexer;
use crate::llm_client::LlmClient;
use crate::retrieval::store::ResumeStore;
use crate::retrieval::ContextRetriever;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Direct store access for persona settings; retrieval goes through `retriever`.
    pub store: Arc<dyn ResumeStore>,
    pub retriever: Arc<ContextRetriever>,
    pub llm: LlmClient,
    pub indexer: Arc<EmbeddingIndexer>,
}
