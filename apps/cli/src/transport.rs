//! HTTP side of the client: opens `/chat` and `/greeting` and hands back the raw
//! response body. Frame decoding happens in the session.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::message::HistoryTurn;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    pub message: String,
    pub history: Vec<HistoryTurn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn chat(&self, payload: &ChatPayload) -> Result<ByteStream, TransportError>;
    async fn greeting(&self) -> Result<ByteStream, TransportError>;
}

pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let client = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn open(&self, request: reqwest::RequestBuilder) -> Result<ByteStream, TransportError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        Ok(response.bytes_stream().map_err(TransportError::from).boxed())
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn chat(&self, payload: &ChatPayload) -> Result<ByteStream, TransportError> {
        self.open(self.client.post(format!("{}/chat", self.base_url)).json(payload))
            .await
    }

    async fn greeting(&self) -> Result<ByteStream, TransportError> {
        self.open(self.client.get(format!("{}/greeting", self.base_url)))
            .await
    }
}

/// Pulls `error.message` out of the server's error envelope, or echoes the body.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        error: Detail,
    }
    #[derive(Deserialize)]
    struct Detail {
        message: String,
    }

    serde_json::from_str::<Envelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect())
}
