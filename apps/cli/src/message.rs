use chrono::{DateTime, Utc};
use folio_wire::PresentationTag;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A finalized turn. Never mutated once appended to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub component_type: Option<PresentationTag>,
    pub component_data: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into(), None)
    }

    pub fn assistant(content: impl Into<String>, component: Option<(PresentationTag, Value)>) -> Self {
        Self::new(Role::Assistant, content.into(), component)
    }

    fn new(role: Role, content: String, component: Option<(PresentationTag, Value)>) -> Self {
        let (component_type, component_data) = match component {
            Some((tag, data)) => (Some(tag), Some(data)),
            None => (None, None),
        };
        Self {
            id: Uuid::new_v4(),
            role,
            content,
            component_type,
            component_data,
            timestamp: Utc::now(),
        }
    }
}

/// The `{role, content}` pair sent back to the server as history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

impl From<&ChatMessage> for HistoryTurn {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assistant_message_carries_component() {
        let msg = ChatMessage::assistant(
            "Here are my projects",
            Some((PresentationTag::ProjectList, json!({"projects": []}))),
        );
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.component_type, Some(PresentationTag::ProjectList));

        let wire = serde_json::to_value(&msg).unwrap();
        assert_eq!(wire["componentType"], "project-list");
        assert_eq!(wire["role"], "assistant");
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(ChatMessage::user("a").id, ChatMessage::user("a").id);
    }
}
