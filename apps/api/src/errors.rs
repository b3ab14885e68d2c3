use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// Non-success answer from a language-model provider; its status is passed through.
    #[error("Upstream provider error (status {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Api { status, message } => AppError::Upstream { status, message },
            other => AppError::Llm(other.to_string()),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::Llm(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = match &self {
            AppError::Validation(msg) => ("VALIDATION_ERROR", msg.clone()),
            AppError::Upstream { status, message } => {
                tracing::error!("Upstream provider error {status}: {message}");
                ("UPSTREAM_ERROR", "Chat API error".to_string())
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                ("LLM_ERROR", "An AI processing error occurred".to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_400() {
        let err = AppError::Validation("Message is required".to_string());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upstream_status_is_passed_through() {
        let err: AppError = LlmError::Api {
            status: 429,
            message: "rate limited".to_string(),
        }
        .into();
        assert_eq!(err.into_response().status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_invalid_upstream_status_becomes_bad_gateway() {
        let err = AppError::Upstream {
            status: 1000,
            message: String::new(),
        };
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_unclassified_failures_are_500() {
        let err = AppError::Internal(anyhow::anyhow!("boom"));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let err: AppError = LlmError::MissingApiKey("OPENAI_API_KEY").into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
