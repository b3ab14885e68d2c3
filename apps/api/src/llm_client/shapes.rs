//! Streaming response shapes of the three providers, normalized to `StreamEvent`.
//!
//! | shape     | text                                  | completion                    |
//! |-----------|---------------------------------------|-------------------------------|
//! | openai    | `choices[0].delta.content`            | `data: [DONE]`                |
//! | anthropic | `content_block_delta` → `delta.text`  | `type == "message_stop"`      |
//! | google    | `candidates[0].content.parts[0].text` | `candidates[0].finishReason`  |

use serde_json::Value;

use crate::llm_client::{LlmError, ModelProvider, StreamEvent};

/// Decodes one complete SSE line. Lines that carry nothing (blank separators,
/// `event:` lines, role-only deltas, pings) yield no events. A single line can
/// carry both text and completion (Gemini's last chunk), in that order.
pub fn decode_line(shape: ModelProvider, line: &str) -> Result<Vec<StreamEvent>, LlmError> {
    let Some(payload) = line.strip_prefix("data:") else {
        return Ok(Vec::new());
    };
    let payload = payload.trim();
    if payload.is_empty() {
        return Ok(Vec::new());
    }
    if payload == "[DONE]" {
        return Ok(vec![StreamEvent::Done]);
    }

    let value: Value = serde_json::from_str(payload)?;
    match shape {
        ModelProvider::OpenAi => Ok(openai_events(&value)),
        ModelProvider::Anthropic => anthropic_events(&value),
        ModelProvider::Google => Ok(google_events(&value)),
    }
}

fn text_event(text: Option<&str>) -> Option<StreamEvent> {
    text.filter(|t| !t.is_empty())
        .map(|t| StreamEvent::Text(t.to_string()))
}

fn openai_events(value: &Value) -> Vec<StreamEvent> {
    text_event(value.pointer("/choices/0/delta/content").and_then(Value::as_str))
        .into_iter()
        .collect()
}

fn anthropic_events(value: &Value) -> Result<Vec<StreamEvent>, LlmError> {
    match value.get("type").and_then(Value::as_str) {
        Some("content_block_delta") => Ok(text_event(
            value.pointer("/delta/text").and_then(Value::as_str),
        )
        .into_iter()
        .collect()),
        Some("message_stop") => Ok(vec![StreamEvent::Done]),
        Some("error") => Err(LlmError::Stream(
            value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        )),
        _ => Ok(Vec::new()),
    }
}

fn google_events(value: &Value) -> Vec<StreamEvent> {
    let candidate = value.pointer("/candidates/0");
    let mut events: Vec<StreamEvent> = text_event(
        candidate
            .and_then(|c| c.pointer("/content/parts/0/text"))
            .and_then(Value::as_str),
    )
    .into_iter()
    .collect();
    if candidate.is_some_and(|c| c.get("finishReason").is_some_and(|r| !r.is_null())) {
        events.push(StreamEvent::Done);
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> StreamEvent {
        StreamEvent::Text(s.to_string())
    }

    #[test]
    fn test_openai_lines() {
        let shape = ModelProvider::OpenAi;
        assert_eq!(
            decode_line(shape, r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#).unwrap(),
            vec![text("Hi")]
        );
        assert!(decode_line(shape, r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#)
            .unwrap()
            .is_empty());
        assert!(decode_line(shape, r#"data: {"choices":[{"delta":{"content":""}}]}"#)
            .unwrap()
            .is_empty());
        assert_eq!(decode_line(shape, "data: [DONE]").unwrap(), vec![StreamEvent::Done]);
    }

    #[test]
    fn test_anthropic_lines() {
        let shape = ModelProvider::Anthropic;
        assert!(decode_line(shape, "event: content_block_delta").unwrap().is_empty());
        assert_eq!(
            decode_line(
                shape,
                r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"저는"}}"#
            )
            .unwrap(),
            vec![text("저는")]
        );
        assert!(decode_line(shape, r#"data: {"type":"ping"}"#).unwrap().is_empty());
        assert_eq!(
            decode_line(shape, r#"data: {"type":"message_stop"}"#).unwrap(),
            vec![StreamEvent::Done]
        );
    }

    #[test]
    fn test_anthropic_error_event() {
        let err = decode_line(
            ModelProvider::Anthropic,
            r#"data: {"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, LlmError::Stream(m) if m == "Overloaded"));
    }

    #[test]
    fn test_google_lines() {
        let shape = ModelProvider::Google;
        assert_eq!(
            decode_line(
                shape,
                r#"data: {"candidates":[{"content":{"parts":[{"text":"Hello"}]}}]}"#
            )
            .unwrap(),
            vec![text("Hello")]
        );
        assert_eq!(
            decode_line(
                shape,
                r#"data: {"candidates":[{"content":{"parts":[{"text":"!"}]},"finishReason":"STOP"}]}"#
            )
            .unwrap(),
            vec![text("!"), StreamEvent::Done]
        );
        assert!(decode_line(
            shape,
            r#"data: {"candidates":[{"content":{"parts":[{"text":"x"}]},"finishReason":null}]}"#
        )
        .unwrap()
        .contains(&text("x")));
    }

    #[test]
    fn test_non_data_and_blank_lines_skipped() {
        for shape in [
            ModelProvider::OpenAi,
            ModelProvider::Anthropic,
            ModelProvider::Google,
        ] {
            assert!(decode_line(shape, "").unwrap().is_empty());
            assert!(decode_line(shape, ": keep-alive").unwrap().is_empty());
            assert!(decode_line(shape, "data:").unwrap().is_empty());
        }
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            decode_line(ModelProvider::OpenAi, "data: {not json"),
            Err(LlmError::Parse(_))
        ));
    }
}
