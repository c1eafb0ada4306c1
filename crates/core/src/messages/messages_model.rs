//! Message domain models.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, ValidationError};

/// A persisted chat message.
///
/// `id`, `content` and `timestamp` never change once stored. Mirror links are
/// attached after the fact as remotes acknowledge the commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub github_url: Option<String>,
    #[serde(default)]
    pub mirrors: Vec<MirrorLink>,
}

/// A successful mirror of a message into one repository target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MirrorLink {
    pub target: usize,
    pub repository: String,
    pub url: String,
    pub commit_sha: Option<String>,
}

/// Validated content for a message that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    content: String,
}

impl NewMessage {
    /// Fails with [`ValidationError::EmptyMessage`] if `content` is blank.
    pub fn new(content: impl Into<String>) -> Result<Self> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }
        Ok(Self { content })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_content(self) -> String {
        self.content
    }
}

/// Parameters of a history read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageQuery {
    pub limit: usize,
    /// Only messages strictly newer than this instant.
    pub since: Option<DateTime<Utc>>,
}

impl MessageQuery {
    pub fn latest(limit: usize) -> Self {
        Self { limit, since: None }
    }
}

/// Current UTC time truncated to the precision the store keeps.
pub(crate) fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn new_message_rejects_blank_content() {
        for blank in ["", "   ", "\n\t "] {
            let err = NewMessage::new(blank).unwrap_err();
            assert!(matches!(
                err,
                Error::Validation(ValidationError::EmptyMessage)
            ));
        }
    }

    #[test]
    fn new_message_keeps_content_verbatim() {
        let msg = NewMessage::new("  hello  ").unwrap();
        assert_eq!(msg.content(), "  hello  ");
    }

    #[test]
    fn message_serializes_with_snake_case_fields() {
        let msg = Message {
            id: 7,
            content: "hi".to_string(),
            timestamp: DateTime::parse_from_rfc3339("2024-05-01T10:00:00.250Z")
                .unwrap()
                .with_timezone(&Utc),
            github_url: None,
            mirrors: vec![],
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["github_url"], serde_json::Value::Null);
        assert_eq!(value["timestamp"], "2024-05-01T10:00:00.250Z");
    }
}
