pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::chat::handlers;
use crate::indexing::handlers as indexing;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/chat", post(handlers::handle_chat))
        .route("/greeting", get(handlers::handle_greeting))
        .route(
            "/embeddings/initialize",
            post(indexing::handle_initialize_embeddings),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use folio_wire::{FrameDecoder, PresentationTag, StreamFrame};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::chat::sanitize::MetadataMode;
    use crate::config::Config;
    use crate::indexing::EmbeddingIndexer;
    use crate::llm_client::{LlmClient, ModelConfig, ModelProvider, ProviderKeys};
    use crate::models::context::RagContext;
    use crate::models::resume::fixtures;
    use crate::retrieval::testing::{MockEmbedder, MockEnricher, MockStore};
    use crate::retrieval::ContextRetriever;

    const OPENAI_PATH: &str = "/v1/chat/completions";

    fn test_config() -> Config {
        Config {
            database_url: "postgres://unused".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            openai_api_key: Some("test-key".to_string()),
            anthropic_api_key: None,
            google_api_key: None,
            huggingface_api_key: None,
            github_token: None,
            default_model: ModelConfig::new(ModelProvider::OpenAi, "gpt-4o-mini"),
            metadata_mode: MetadataMode::Full,
            vector_threshold: 0.7,
            vector_top_k: 5,
        }
    }

    /// Full router over in-memory resume data and a mock provider at `llm_base`.
    fn test_app(llm_base: &str) -> Router {
        let store = Arc::new(MockStore {
            data: RagContext {
                profile: Some(fixtures::profile("Owner")),
                projects: vec![fixtures::project("folio")],
                ..Default::default()
            },
            ..Default::default()
        });
        let embedder = Arc::new(MockEmbedder::new(false));
        let llm = LlmClient::new(ProviderKeys {
            openai: Some("test-key".to_string()),
            ..Default::default()
        })
        .unwrap()
        .with_base_url(llm_base);

        build_router(AppState {
            config: test_config(),
            store: store.clone(),
            retriever: Arc::new(ContextRetriever::new(
                store.clone(),
                embedder.clone(),
                Arc::new(MockEnricher::default()),
            )),
            llm,
            indexer: Arc::new(EmbeddingIndexer::new(store.clone(), store, embedder)),
        })
    }

    fn chat_request(body: Value) -> Request<Body> {
        Request::post("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn openai_stream(texts: &[&str]) -> ResponseTemplate {
        let mut body = String::new();
        for text in texts {
            let chunk = json!({ "choices": [{ "delta": { "content": text } }] });
            body.push_str(&format!("data: {chunk}\n\n"));
        }
        body.push_str("data: [DONE]\n\n");
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/event-stream")
            .set_body_string(body)
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn decode(body: &str) -> (Vec<StreamFrame>, bool) {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(body.as_bytes());
        (frames, decoder.is_done())
    }

    #[tokio::test]
    async fn test_health_reports_service() {
        let app = Router::new().route("/health", get(health::health_handler));
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "folio-api");
    }

    #[tokio::test]
    async fn test_upstream_rejection_returns_status_without_frames() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(OPENAI_PATH))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(json!({ "error": { "message": "rate limited" } })),
            )
            .mount(&server)
            .await;

        let response = test_app(&server.uri())
            .oneshot(chat_request(json!({ "message": "프로젝트 알려줘" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let body = body_text(response).await;
        assert!(!body.contains("data:"));
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"]["code"], "UPSTREAM_ERROR");
        assert_eq!(json["error"]["message"], "Chat API error");
    }

    #[tokio::test]
    async fn test_chat_streams_metadata_then_text_then_done() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(OPENAI_PATH))
            .respond_with(openai_stream(&["Hello", ", world"]))
            .mount(&server)
            .await;

        let response = test_app(&server.uri())
            .oneshot(chat_request(json!({ "message": "프로젝트 알려줘" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
        let body = body_text(response).await;
        assert!(body.ends_with("data: [DONE]\n\n"));
        assert_eq!(body.matches("[DONE]").count(), 1);

        let (frames, done) = decode(&body);
        assert!(done);
        let metadata = frames
            .iter()
            .filter(|f| matches!(f, StreamFrame::Metadata { .. }))
            .count();
        assert_eq!(metadata, 1);
        match &frames[0] {
            StreamFrame::Metadata { data, .. } => {
                assert_eq!(data["projects"][0]["title"], "folio");
            }
            other => panic!("expected metadata first, got {other:?}"),
        }
        assert_eq!(
            frames[1..],
            [
                StreamFrame::Text { content: "Hello".to_string() },
                StreamFrame::Text { content: ", world".to_string() },
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_chat_never_reaches_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(openai_stream(&["unused"]))
            .expect(0)
            .mount(&server)
            .await;

        let response = test_app(&server.uri())
            .oneshot(chat_request(json!({ "message": "   " })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_greeting_answers_with_greeting_card() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(OPENAI_PATH))
            .and(body_string_contains("안녕"))
            .respond_with(openai_stream(&["반갑습니다"]))
            .expect(1)
            .mount(&server)
            .await;

        let response = test_app(&server.uri())
            .oneshot(Request::get("/greeting").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let (frames, done) = decode(&body_text(response).await);
        assert!(done);
        assert!(matches!(
            frames[0],
            StreamFrame::Metadata {
                component_type: PresentationTag::GreetingCard,
                ..
            }
        ));
        assert_eq!(
            frames[1],
            StreamFrame::Text { content: "반갑습니다".to_string() }
        );
    }

    #[tokio::test]
    async fn test_initialize_embeddings_reports_counts() {
        let server = MockServer::start().await;
        let response = test_app(&server.uri())
            .oneshot(
                Request::post("/embeddings/initialize")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
        // profile, contact, one project
        assert_eq!(json["indexed"], 3);
        assert_eq!(json["byType"]["project"], 1);
    }
}
