mod chat;
mod config;
mod db;
mod embedding;
mod errors;
mod indexing;
mod intent;
mod llm_client;
mod models;
mod retrieval;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::embedding::{Embedder, FallbackEmbedder, HuggingFaceEmbedder, OpenAiEmbedder};
use crate::indexing::{DocumentIndex, EmbeddingIndexer};
use crate::llm_client::{LlmClient, ProviderKeys};
use crate::retrieval::enrichment::GithubEnricher;
use crate::retrieval::store::{PgResumeStore, ResumeStore};
use crate::retrieval::ContextRetriever;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Folio API v{}", env!("CARGO_PKG_VERSION"));

    let pool = create_pool(&config.database_url).await?;
    let pg = Arc::new(PgResumeStore::new(pool));
    let store: Arc<dyn ResumeStore> = pg.clone();
    let index: Arc<dyn DocumentIndex> = pg;

    let http = reqwest::Client::new();
    let embedder: Arc<dyn Embedder> = Arc::new(FallbackEmbedder::new(vec![
        Arc::new(HuggingFaceEmbedder::new(
            http.clone(),
            config.huggingface_api_key.clone(),
        )) as Arc<dyn Embedder>,
        Arc::new(OpenAiEmbedder::new(
            http.clone(),
            config.openai_api_key.clone(),
        )),
    ]));
    let enricher = GithubEnricher::new(http, config.github_token.clone());

    let retriever = ContextRetriever::new(store.clone(), embedder.clone(), Arc::new(enricher))
        .with_vector_params(config.vector_threshold, config.vector_top_k);
    info!(
        "Retriever ready (threshold {}, top_k {})",
        config.vector_threshold, config.vector_top_k
    );

    let indexer = EmbeddingIndexer::new(store.clone(), index, embedder);

    let llm = LlmClient::new(ProviderKeys {
        openai: config.openai_api_key.clone(),
        anthropic: config.anthropic_api_key.clone(),
        google: config.google_api_key.clone(),
    })?;
    info!(
        "LLM client ready (default {} / {})",
        config.default_model.provider, config.default_model.model
    );

    let state = AppState {
        config: config.clone(),
        store,
        retriever: Arc::new(retriever),
        llm,
        indexer: Arc::new(indexer),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
