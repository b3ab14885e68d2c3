use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use folio_wire::StreamFrame;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::chat::history::{context_summary, optimize_history, HISTORY_WINDOW};
use crate::chat::prompt::{build_system_prompt, PersonaSettings};
use crate::chat::relay::{relay_stream, sse_response};
use crate::chat::sanitize::metadata_payload;
use crate::errors::AppError;
use crate::intent::classify;
use crate::llm_client::{ChatTurn, ModelConfig, ModelProvider};
use crate::state::AppState;

/// Fixed opener used by `GET /greeting`.
pub const GREETING_QUERY: &str = "안녕";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Kept untyped so a non-string message is a validation error, not a rejection.
    pub message: Option<Value>,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
    pub model_provider: Option<String>,
    pub model_name: Option<String>,
}

#[derive(Debug)]
struct ValidChat {
    message: String,
    history: Vec<ChatTurn>,
    model: ModelConfig,
}

/// A provider/model pair overrides the default only when both are given.
fn validate(req: ChatRequest, default_model: &ModelConfig) -> Result<ValidChat, AppError> {
    let message = match req.message {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        _ => return Err(AppError::Validation("Message is required".to_string())),
    };

    let model = match (req.model_provider, req.model_name) {
        (Some(provider), Some(name)) if !name.trim().is_empty() => {
            let provider = provider
                .parse::<ModelProvider>()
                .map_err(|e| AppError::Validation(format!("{e}")))?;
            ModelConfig::new(provider, name)
        }
        _ => default_model.clone(),
    };

    Ok(ValidChat {
        message,
        history: req.history,
        model,
    })
}

/// POST /chat
/// Streams one answer as `text/event-stream` wire frames.
pub async fn handle_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let chat = validate(req, &state.config.default_model)?;
    answer(&state, &chat.message, &chat.history, &chat.model).await
}

/// GET /greeting
/// Same pipeline as /chat, seeded with a fixed opener and no history.
pub async fn handle_greeting(State(state): State<AppState>) -> Result<Response, AppError> {
    answer(&state, GREETING_QUERY, &[], &state.config.default_model).await
}

async fn answer(
    state: &AppState,
    message: &str,
    history: &[ChatTurn],
    model: &ModelConfig,
) -> Result<Response, AppError> {
    let summary = context_summary(history);
    let mut turns = optimize_history(history, HISTORY_WINDOW);
    turns.push(ChatTurn::user(message));

    let (settings, context) = tokio::join!(load_persona(state), state.retriever.retrieve(message));
    let component = classify(message, &context, &mut rand::thread_rng());
    info!(
        component = %component,
        provider = %model.provider,
        model = %model.model,
        "Answering chat turn"
    );

    let system_prompt = build_system_prompt(&settings, &context, component, &summary);
    let upstream = state.llm.open_stream(model, &turns, &system_prompt).await?;

    let metadata = StreamFrame::Metadata {
        component_type: component,
        data: metadata_payload(&context, state.config.metadata_mode)
            .map_err(|e| AppError::Internal(e.into()))?,
    };
    Ok(sse_response(relay_stream(metadata, upstream.events())))
}

async fn load_persona(state: &AppState) -> PersonaSettings {
    match state.store.ai_settings().await {
        Ok(rows) => PersonaSettings::from_rows(&rows),
        Err(e) => {
            warn!("Loading persona settings failed, using defaults: {e}");
            PersonaSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn default_model() -> ModelConfig {
        ModelConfig::new(ModelProvider::OpenAi, "gpt-4o-mini")
    }

    fn request(body: Value) -> ChatRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_missing_or_non_string_message_is_rejected() {
        for body in [
            json!({}),
            json!({ "message": 42 }),
            json!({ "message": null }),
            json!({ "message": "   " }),
        ] {
            let err = validate(request(body.clone()), &default_model()).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{body}");
        }
    }

    #[test]
    fn test_default_model_used_without_full_override() {
        let chat = validate(
            request(json!({ "message": "hi", "modelProvider": "anthropic" })),
            &default_model(),
        )
        .unwrap();
        assert_eq!(chat.model, default_model());
        assert!(chat.history.is_empty());
    }

    #[test]
    fn test_model_override() {
        let chat = validate(
            request(json!({
                "message": "hi",
                "history": [{ "role": "user", "content": "earlier" }],
                "modelProvider": "google",
                "modelName": "gemini-2.5-flash"
            })),
            &default_model(),
        )
        .unwrap();
        assert_eq!(chat.model.provider, ModelProvider::Google);
        assert_eq!(chat.model.model, "gemini-2.5-flash");
        assert_eq!(chat.history, vec![ChatTurn::user("earlier")]);
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let err = validate(
            request(json!({ "message": "hi", "modelProvider": "mistral", "modelName": "x" })),
            &default_model(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
