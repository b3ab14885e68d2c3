//! Per-provider request envelopes.

use serde_json::{json, Value};

use crate::llm_client::{ChatRole, ChatTurn, ModelConfig};

/// OpenAI chat completions: the system prompt is the first message.
pub fn openai_body(config: &ModelConfig, history: &[ChatTurn], system_prompt: &str) -> Value {
    let mut messages = vec![json!({ "role": "system", "content": system_prompt })];
    messages.extend(
        history
            .iter()
            .map(|t| json!({ "role": t.role.as_str(), "content": t.content })),
    );

    json!({
        "model": config.model,
        "messages": messages,
        "stream": true,
        "temperature": config.temperature,
        "max_completion_tokens": config.max_tokens,
    })
}

/// Anthropic messages: top-level `system`, roles limited to user/assistant.
pub fn anthropic_body(config: &ModelConfig, history: &[ChatTurn], system_prompt: &str) -> Value {
    let messages: Vec<Value> = history
        .iter()
        .map(|t| json!({ "role": t.role.as_str(), "content": t.content }))
        .collect();

    json!({
        "model": config.model,
        "system": system_prompt,
        "messages": messages,
        "stream": true,
        "temperature": config.temperature,
        "max_tokens": config.max_tokens,
    })
}

/// Gemini `streamGenerateContent`: assistant turns are sent with role `model`.
pub fn google_body(config: &ModelConfig, history: &[ChatTurn], system_prompt: &str) -> Value {
    let contents: Vec<Value> = history
        .iter()
        .map(|t| {
            let role = match t.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "model",
            };
            json!({ "role": role, "parts": [{ "text": t.content }] })
        })
        .collect();

    json!({
        "systemInstruction": { "parts": [{ "text": system_prompt }] },
        "contents": contents,
        "generationConfig": {
            "temperature": config.temperature,
            "maxOutputTokens": config.max_tokens,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::ModelProvider;

    fn history() -> Vec<ChatTurn> {
        vec![
            ChatTurn::user("What do you build?"),
            ChatTurn::assistant("Web apps, mostly."),
            ChatTurn::user("And lately?"),
        ]
    }

    #[test]
    fn test_openai_envelope() {
        let config = ModelConfig::new(ModelProvider::OpenAi, "gpt-4o-mini");
        let body = openai_body(&config, &history(), "be yourself");
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_completion_tokens"], 2500);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "be yourself");
        assert_eq!(body["messages"].as_array().unwrap().len(), 4);
        assert_eq!(body["messages"][2]["role"], "assistant");
    }

    #[test]
    fn test_anthropic_envelope() {
        let config = ModelConfig::new(ModelProvider::Anthropic, "claude-haiku-4-5");
        let body = anthropic_body(&config, &history(), "be yourself");
        assert_eq!(body["system"], "be yourself");
        assert_eq!(body["max_tokens"], 2500);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert!(messages
            .iter()
            .all(|m| m["role"] == "user" || m["role"] == "assistant"));
    }

    #[test]
    fn test_google_envelope() {
        let config = ModelConfig::new(ModelProvider::Google, "gemini-2.5-flash");
        let body = google_body(&config, &history(), "be yourself");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be yourself");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][1]["parts"][0]["text"], "Web apps, mostly.");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2500);
    }
}
