//! Query embedding with an ordered provider fallback.
//!
//! Primary: EmbeddingGemma on the Hugging Face router. Secondary: OpenAI
//! `text-embedding-3-small` truncated to the index's 768 dimensions.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

const HUGGINGFACE_URL: &str =
    "https://router.huggingface.co/hf-inference/models/google/embeddinggemma-300m/pipeline/feature-extraction";
const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
const OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";
/// Dimension of the `document_embeddings` vector column.
pub const EMBEDDING_DIMENSIONS: usize = 768;
/// Anything shorter is a similarity score, not an embedding.
const MIN_EMBEDDING_LEN: usize = 100;
/// Per-provider request budget.
pub const EMBEDDING_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("{0} is not configured")]
    MissingApiKey(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} returned status {status}: {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("unexpected response shape from {0}")]
    Shape(&'static str),

    #[error("all embedding providers failed; last error: {0}")]
    Exhausted(Box<EmbeddingError>),
}

#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &'static str;
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Hugging Face (EmbeddingGemma)
// ────────────────────────────────────────────────────────────────────────────

pub struct HuggingFaceEmbedder {
    client: Client,
    api_key: Option<String>,
    url: String,
}

impl HuggingFaceEmbedder {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            url: HUGGINGFACE_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// Accepts `[f32]`, `[[f32]]` or `{"embeddings": ...}`; rejects short similarity arrays.
pub fn parse_hf_embedding(value: &Value) -> Option<Vec<f32>> {
    fn as_vector(value: &Value) -> Option<Vec<f32>> {
        let items = value.as_array()?;
        if items.len() <= MIN_EMBEDDING_LEN {
            return None;
        }
        items.iter().map(|v| v.as_f64().map(|f| f as f32)).collect()
    }

    match value {
        Value::Array(items) => match items.first() {
            Some(Value::Array(_)) => items.first().and_then(as_vector),
            _ => as_vector(value),
        },
        Value::Object(map) => map.get("embeddings").and_then(parse_hf_embedding),
        _ => None,
    }
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    fn name(&self) -> &'static str {
        "huggingface"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(EmbeddingError::MissingApiKey("HUGGINGFACE_API_KEY"))?;

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .timeout(EMBEDDING_TIMEOUT)
            .json(&json!({
                "inputs": text,
                "options": { "wait_for_model": true },
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbeddingError::Api {
                provider: self.name(),
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: Value = response.json().await?;
        parse_hf_embedding(&body).ok_or(EmbeddingError::Shape(self.name()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAI
// ────────────────────────────────────────────────────────────────────────────

pub struct OpenAiEmbedder {
    client: Client,
    api_key: Option<String>,
    url: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingItem {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            url: OPENAI_EMBEDDINGS_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(EmbeddingError::MissingApiKey("OPENAI_API_KEY"))?;

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .timeout(EMBEDDING_TIMEOUT)
            .json(&json!({
                "model": OPENAI_EMBEDDING_MODEL,
                "input": text,
                "dimensions": EMBEDDING_DIMENSIONS,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbeddingError::Api {
                provider: self.name(),
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: OpenAiEmbeddingResponse = response.json().await?;
        body.data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or(EmbeddingError::Shape(self.name()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Fallback chain
// ────────────────────────────────────────────────────────────────────────────

/// Tries each provider in order; the next provider is the only retry.
pub struct FallbackEmbedder {
    providers: Vec<Arc<dyn Embedder>>,
}

impl FallbackEmbedder {
    pub fn new(providers: Vec<Arc<dyn Embedder>>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl Embedder for FallbackEmbedder {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut last_error = None;
        for provider in &self.providers {
            match provider.embed(text).await {
                Ok(embedding) => {
                    debug!(
                        "Embedded query with {} ({} dims)",
                        provider.name(),
                        embedding.len()
                    );
                    return Ok(embedding);
                }
                Err(e) => {
                    warn!("Embedding provider {} failed: {e}", provider.name());
                    last_error = Some(e);
                }
            }
        }
        Err(EmbeddingError::Exhausted(Box::new(
            last_error.unwrap_or(EmbeddingError::Shape("no providers")),
        )))
    }
}
