/// LLM Client: the single point of entry for all chat-completion calls.
///
/// ARCHITECTURAL RULE: No other module may call a model provider directly.
/// Each provider has its own request envelope (built in `requests`) and its own
/// streaming response shape (decoded in `shapes`); callers only ever see the
/// normalized `StreamEvent` sequence of a `ProviderStream`.
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use futures::TryStreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod requests;
pub mod shapes;
pub mod stream;

pub use stream::{ProviderStream, StreamEvent};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const GOOGLE_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2500;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// From request start until the provider answers with status and headers.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);
/// Longest silence tolerated between two body chunks.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0} is not configured")]
    MissingApiKey(&'static str),

    #[error("provider did not respond within {0:?}")]
    Timeout(Duration),

    #[error("provider reported a stream error: {0}")]
    Stream(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Model selection
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    OpenAi,
    Anthropic,
    Google,
}

impl ModelProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelProvider::OpenAi => "openai",
            ModelProvider::Anthropic => "anthropic",
            ModelProvider::Google => "google",
        }
    }

    pub fn api_key_var(&self) -> &'static str {
        match self {
            ModelProvider::OpenAi => "OPENAI_API_KEY",
            ModelProvider::Anthropic => "ANTHROPIC_API_KEY",
            ModelProvider::Google => "GOOGLE_GEMINI_API_KEY",
        }
    }
}

impl fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown model provider '{0}'")]
pub struct UnknownProvider(pub String);

impl FromStr for ModelProvider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ModelProvider::OpenAi),
            "anthropic" => Ok(ModelProvider::Anthropic),
            "google" => Ok(ModelProvider::Google),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub provider: ModelProvider,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ModelConfig {
    pub fn new(provider: ModelProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// One prior message of the conversation, as forwarded to the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ProviderKeys {
    pub openai: Option<String>,
    pub anthropic: Option<String>,
    pub google: Option<String>,
}

#[derive(Debug, Clone)]
struct Endpoints {
    openai: String,
    anthropic: String,
    google: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            openai: OPENAI_API_URL.to_string(),
            anthropic: ANTHROPIC_API_URL.to_string(),
            google: GOOGLE_API_URL.to_string(),
        }
    }
}

/// Opens streaming completions against any of the three providers.
/// Streams are never retried: a failed turn is reported to the caller.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    keys: ProviderKeys,
    endpoints: Endpoints,
}

impl LlmClient {
    pub fn new(keys: ProviderKeys) -> Result<Self, LlmError> {
        let client = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        Ok(Self {
            client,
            keys,
            endpoints: Endpoints::default(),
        })
    }

    /// Points every provider at one base URL; used against mock servers.
    #[cfg(test)]
    pub fn with_base_url(mut self, base: &str) -> Self {
        self.endpoints = Endpoints {
            openai: format!("{base}/v1/chat/completions"),
            anthropic: format!("{base}/v1/messages"),
            google: format!("{base}/v1beta/models"),
        };
        self
    }

    fn api_key(&self, provider: ModelProvider) -> Result<&str, LlmError> {
        let key = match provider {
            ModelProvider::OpenAi => &self.keys.openai,
            ModelProvider::Anthropic => &self.keys.anthropic,
            ModelProvider::Google => &self.keys.google,
        };
        key.as_deref()
            .ok_or(LlmError::MissingApiKey(provider.api_key_var()))
    }

    /// Sends the request and returns once the provider has answered with a
    /// success status; the body is consumed through `ProviderStream::events`.
    pub async fn open_stream(
        &self,
        config: &ModelConfig,
        history: &[ChatTurn],
        system_prompt: &str,
    ) -> Result<ProviderStream, LlmError> {
        let api_key = self.api_key(config.provider)?;

        let request = match config.provider {
            ModelProvider::OpenAi => self
                .client
                .post(&self.endpoints.openai)
                .bearer_auth(api_key)
                .json(&requests::openai_body(config, history, system_prompt)),
            ModelProvider::Anthropic => self
                .client
                .post(&self.endpoints.anthropic)
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&requests::anthropic_body(config, history, system_prompt)),
            ModelProvider::Google => self
                .client
                .post(format!(
                    "{}/{}:streamGenerateContent",
                    self.endpoints.google, config.model
                ))
                .query(&[("alt", "sse"), ("key", api_key)])
                .json(&requests::google_body(config, history, system_prompt)),
        };

        debug!(
            provider = %config.provider,
            model = %config.model,
            history_len = history.len(),
            "Opening provider stream"
        );

        let response = tokio::time::timeout(RESPONSE_TIMEOUT, request.send())
            .await
            .map_err(|_| LlmError::Timeout(RESPONSE_TIMEOUT))??;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = provider_error_message(&body);
            warn!("{} returned {status}: {message}", config.provider);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes_stream().map_err(LlmError::Http);
        Ok(ProviderStream::new(config.provider, body).with_idle_timeout(IDLE_TIMEOUT))
    }
}

/// All three providers wrap failures as `{"error": {"message": ...}}`; fall back to the raw body.
fn provider_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        error: Inner,
    }
    #[derive(Deserialize)]
    struct Inner {
        message: String,
    }

    serde_json::from_str::<Envelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}
