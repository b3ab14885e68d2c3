//! Keeps the forwarded conversation short.

use crate::llm_client::{ChatRole, ChatTurn};

/// Messages forwarded to the provider per turn.
pub const HISTORY_WINDOW: usize = 6;
const LONG_REPLY_CHARS: usize = 200;
const TRUNCATED_REPLY_CHARS: usize = 150;
const OMISSION_MARKER: &str = "...(omitted)";

/// Topics detected in earlier user messages, in reporting order.
const TOPICS: &[(&str, &[&str])] = &[
    ("skills", &["스킬", "기술", "skill"]),
    ("experience", &["경력", "회사", "career", "experience"]),
    ("projects", &["프로젝트", "project"]),
    ("introduction", &["소개", "누구", "introduce", "who"]),
    ("hobbies", &["취미", "hobby"]),
    ("contact", &["연락", "이메일", "contact", "email"]),
];

/// Returns short histories unchanged. Longer ones keep the last `max_messages`,
/// with long assistant replies cut down.
pub fn optimize_history(history: &[ChatTurn], max_messages: usize) -> Vec<ChatTurn> {
    if history.len() <= max_messages {
        return history.to_vec();
    }

    history[history.len() - max_messages..]
        .iter()
        .map(|turn| match turn.role {
            ChatRole::Assistant if turn.content.chars().count() > LONG_REPLY_CHARS => {
                let head: String = turn.content.chars().take(TRUNCATED_REPLY_CHARS).collect();
                ChatTurn::assistant(format!("{head}{OMISSION_MARKER}"))
            }
            _ => turn.clone(),
        })
        .collect()
}

/// One line naming what the visitor already asked about, or empty.
pub fn context_summary(history: &[ChatTurn]) -> String {
    let user_text: Vec<String> = history
        .iter()
        .filter(|t| t.role == ChatRole::User)
        .map(|t| t.content.to_lowercase())
        .collect();

    let topics: Vec<&str> = TOPICS
        .iter()
        .filter(|(_, keywords)| {
            user_text
                .iter()
                .any(|text| keywords.iter().any(|k| text.contains(k)))
        })
        .map(|(topic, _)| *topic)
        .collect();

    if topics.is_empty() {
        return String::new();
    }
    format!("[Previous conversation topics: {}]", topics.join(", "))
}
