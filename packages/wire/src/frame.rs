use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::tag::PresentationTag;

/// Prefix carried by every frame line.
pub const DATA_PREFIX: &str = "data: ";
/// Payload of the terminal line.
pub const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Error)]
pub enum WireError {
    #[error("Failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Malformed frame payload: {source}")]
    Malformed {
        payload: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A JSON-carrying frame. The terminal marker is not a frame: see [`encode_done`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamFrame {
    Metadata {
        #[serde(rename = "componentType")]
        component_type: PresentationTag,
        data: Value,
    },
    Text {
        content: String,
    },
}

impl StreamFrame {
    pub fn text(content: impl Into<String>) -> Self {
        StreamFrame::Text {
            content: content.into(),
        }
    }

    /// Serializes the frame as one complete `data: <json>\n\n` line.
    ///
    /// serde_json never emits raw newlines, so a frame can never span two lines.
    pub fn encode(&self) -> Result<Bytes, WireError> {
        let json = serde_json::to_string(self).map_err(WireError::Encode)?;
        Ok(Bytes::from(format!("{DATA_PREFIX}{json}\n\n")))
    }
}

pub fn encode_done() -> Bytes {
    Bytes::from(format!("{DATA_PREFIX}{DONE_MARKER}\n\n"))
}
