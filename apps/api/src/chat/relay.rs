//! Stream Relay: re-encodes normalized provider events as wire frames.

use axum::body::Body;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use folio_wire::{encode_done, StreamFrame, WireError};
use futures::stream::{self, BoxStream};
use futures::{future, StreamExt};
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm_client::{LlmError, StreamEvent};

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Encode(#[from] WireError),

    #[error("upstream stream failed: {0}")]
    Upstream(#[from] LlmError),
}

/// Metadata frame first, then one text frame per event, then the done marker.
/// An upstream failure ends the body with an error instead of a done marker.
pub fn relay_stream(
    metadata: StreamFrame,
    events: BoxStream<'static, Result<StreamEvent, LlmError>>,
) -> BoxStream<'static, Result<Bytes, RelayError>> {
    let head = stream::once(future::ready(metadata.encode().map_err(RelayError::from)));

    let body = events.scan((0usize, false), |(text_frames, finished), event| {
        if *finished {
            return future::ready(None);
        }
        let item = match event {
            Ok(StreamEvent::Text(content)) => {
                *text_frames += 1;
                StreamFrame::text(content).encode().map_err(RelayError::from)
            }
            Ok(StreamEvent::Done) => {
                *finished = true;
                debug!(text_frames = *text_frames, "Relayed turn complete");
                Ok(encode_done())
            }
            Err(e) => {
                *finished = true;
                warn!("Upstream stream failed after {text_frames} text frames: {e}");
                Err(RelayError::Upstream(e))
            }
        };
        future::ready(Some(item))
    });

    head.chain(body).boxed()
}

pub fn sse_response(frames: BoxStream<'static, Result<Bytes, RelayError>>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Body::from_stream(frames),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_wire::{FrameDecoder, PresentationTag};
    use serde_json::json;

    fn metadata() -> StreamFrame {
        StreamFrame::Metadata {
            component_type: PresentationTag::SkillCard,
            data: json!({ "skills": [{ "name": "Rust" }] }),
        }
    }

    async fn collect(
        events: Vec<Result<StreamEvent, LlmError>>,
    ) -> Vec<Result<Bytes, RelayError>> {
        relay_stream(metadata(), stream::iter(events).boxed())
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_metadata_precedes_text_and_done_terminates() {
        let items = collect(vec![
            Ok(StreamEvent::Text("Hello".to_string())),
            Ok(StreamEvent::Text(" world".to_string())),
            Ok(StreamEvent::Done),
        ])
        .await;

        let bytes: Vec<u8> = items
            .into_iter()
            .flat_map(|i| i.unwrap().to_vec())
            .collect();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("data: {\"type\":\"metadata\""));
        assert!(text.ends_with("data: [DONE]\n\n"));

        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(&bytes);
        assert!(decoder.is_done());
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], metadata());
        assert_eq!(frames[1], StreamFrame::text("Hello"));
        assert_eq!(frames[2], StreamFrame::text(" world"));
    }

    #[tokio::test]
    async fn test_every_frame_is_a_complete_line_pair() {
        let items = collect(vec![
            Ok(StreamEvent::Text("줄\n바꿈".to_string())),
            Ok(StreamEvent::Done),
        ])
        .await;
        for item in items {
            let bytes = item.unwrap();
            assert!(bytes.starts_with(b"data: "));
            assert!(bytes.ends_with(b"\n\n"));
            assert_eq!(bytes.iter().filter(|b| **b == b'\n').count(), 2);
        }
    }

    #[tokio::test]
    async fn test_upstream_error_ends_body_with_error() {
        let items = collect(vec![
            Ok(StreamEvent::Text("partial".to_string())),
            Err(LlmError::Timeout(std::time::Duration::from_secs(60))),
        ])
        .await;
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        assert!(items[1].is_ok());
        assert!(matches!(items[2], Err(RelayError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_nothing_relayed_after_done() {
        let items = collect(vec![
            Ok(StreamEvent::Done),
            Ok(StreamEvent::Text("late".to_string())),
        ])
        .await;
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_sse_headers() {
        let response = sse_response(relay_stream(
            metadata(),
            stream::iter(vec![Ok(StreamEvent::Done)]).boxed(),
        ));
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
        assert_eq!(headers["x-accel-buffering"], "no");
        assert!(headers.get(header::CONNECTION).is_none(), "hop-by-hop header set");
    }
}
