use anyhow::{Context, Result};

use crate::chat::sanitize::MetadataMode;
use crate::llm_client::{ModelConfig, ModelProvider};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub huggingface_api_key: Option<String>,
    /// Enables pinned-repository lookups during GitHub enrichment.
    pub github_token: Option<String>,
    pub default_model: ModelConfig,
    pub metadata_mode: MetadataMode,
    pub vector_threshold: f64,
    pub vector_top_k: i32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let provider: ModelProvider = optional_env("DEFAULT_MODEL_PROVIDER")
            .unwrap_or_else(|| "openai".to_string())
            .parse()
            .context("DEFAULT_MODEL_PROVIDER must be one of openai, anthropic, google")?;
        let model = optional_env("DEFAULT_MODEL_NAME").unwrap_or_else(|| "gpt-4o-mini".to_string());

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            openai_api_key: optional_env("OPENAI_API_KEY"),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            google_api_key: optional_env("GOOGLE_GEMINI_API_KEY"),
            huggingface_api_key: optional_env("HUGGINGFACE_API_KEY"),
            github_token: optional_env("GITHUB_TOKEN"),
            default_model: ModelConfig::new(provider, model),
            metadata_mode: optional_env("METADATA_MODE")
                .unwrap_or_else(|| "full".to_string())
                .parse()
                .context("METADATA_MODE must be 'full' or 'redacted'")?,
            vector_threshold: optional_env("VECTOR_THRESHOLD")
                .map(|v| v.parse::<f64>())
                .transpose()
                .context("VECTOR_THRESHOLD must be a number")?
                .unwrap_or(0.7),
            vector_top_k: optional_env("VECTOR_TOP_K")
                .map(|v| v.parse::<i32>())
                .transpose()
                .context("VECTOR_TOP_K must be an integer")?
                .unwrap_or(5),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Reads an optional variable, treating an empty value as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
