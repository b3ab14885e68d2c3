//! What the metadata frame is allowed to carry.

use std::str::FromStr;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::context::RagContext;

/// Profile fields a redacted metadata frame still exposes.
const PROFILE_ALLOW_LIST: [&str; 4] = ["full_name", "title", "avatar_url", "location"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MetadataMode {
    /// The whole retrieved context is sent to the client.
    #[default]
    Full,
    /// Only allow-listed profile fields survive; other collections are emptied.
    Redacted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown metadata mode '{0}'")]
pub struct UnknownMetadataMode(pub String);

impl FromStr for MetadataMode {
    type Err = UnknownMetadataMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(MetadataMode::Full),
            "redacted" => Ok(MetadataMode::Redacted),
            other => Err(UnknownMetadataMode(other.to_string())),
        }
    }
}

/// The `data` payload of the metadata frame for `context`.
pub fn metadata_payload(context: &RagContext, mode: MetadataMode) -> Result<Value, serde_json::Error> {
    let value = serde_json::to_value(context)?;
    Ok(match mode {
        MetadataMode::Full => value,
        MetadataMode::Redacted => redact(value),
    })
}

fn redact(value: Value) -> Value {
    let Value::Object(fields) = value else {
        return Value::Object(Map::new());
    };

    let redacted = fields
        .into_iter()
        .map(|(key, value)| {
            let kept = match (key.as_str(), value) {
                ("profile", Value::Object(profile)) => Value::Object(
                    profile
                        .into_iter()
                        .filter(|(k, _)| PROFILE_ALLOW_LIST.contains(&k.as_str()))
                        .collect(),
                ),
                (_, Value::Array(_)) => Value::Array(Vec::new()),
                (_, Value::Object(_)) => Value::Object(Map::new()),
                (_, scalar) => scalar,
            };
            (key, kept)
        })
        .collect();
    Value::Object(redacted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::context::ExternalProfiles;
    use crate::models::resume::fixtures;
    use serde_json::json;

    fn context() -> RagContext {
        RagContext {
            profile: Some(fixtures::profile("Owner")),
            skills: vec![fixtures::skill("Rust", 5)],
            external_profiles: Some(ExternalProfiles::default()),
            image_year: Some(2023),
            ..Default::default()
        }
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("full".parse::<MetadataMode>(), Ok(MetadataMode::Full));
        assert_eq!("REDACTED".parse::<MetadataMode>(), Ok(MetadataMode::Redacted));
        assert!("partial".parse::<MetadataMode>().is_err());
    }

    #[test]
    fn test_full_mode_passes_context_through() {
        let payload = metadata_payload(&context(), MetadataMode::Full).unwrap();
        assert_eq!(payload["profile"]["email"], "owner@example.com");
        assert_eq!(payload["skills"][0]["name"], "Rust");
    }

    #[test]
    fn test_redacted_allow_list() {
        let payload = metadata_payload(&context(), MetadataMode::Redacted).unwrap();
        assert_eq!(
            payload,
            json!({
                "profile": {
                    "full_name": "Owner",
                    "title": "Software Engineer",
                    "avatar_url": "https://example.com/avatar.png",
                    "location": "Seoul"
                },
                "skills": [],
                "externalProfiles": {},
                "imageYear": 2023
            })
        );
    }

    #[test]
    fn test_redacted_empty_context() {
        let payload = metadata_payload(&RagContext::default(), MetadataMode::Redacted).unwrap();
        assert_eq!(payload, json!({}));
    }
}
