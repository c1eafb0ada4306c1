//! Database models for messages and their mirror outcomes.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use bookchat_core::messages::{Message, MirrorLink};
use bookchat_core::mirror::{MirrorOutcome, MirrorResult};

use crate::utils::to_utc;

#[derive(Queryable, Identifiable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::messages)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MessageDB {
    pub id: i64,
    pub content: String,
    pub created_at: NaiveDateTime,
    pub github_url: Option<String>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::messages)]
pub struct NewMessageDB {
    pub content: String,
    pub created_at: NaiveDateTime,
}

/// One row per (message, target) attempt. Exactly one of `url` and
/// `error_kind` is set.
#[derive(Insertable, Queryable, Selectable, Associations, PartialEq, Debug, Clone)]
#[diesel(belongs_to(MessageDB, foreign_key = message_id))]
#[diesel(table_name = crate::schema::message_mirrors)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MessageMirrorDB {
    pub message_id: i64,
    pub target_index: i64,
    pub repository: String,
    pub url: Option<String>,
    pub commit_sha: Option<String>,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
    pub created_at: NaiveDateTime,
}

impl MessageMirrorDB {
    pub fn from_result(message_id: i64, result: &MirrorResult, created_at: NaiveDateTime) -> Self {
        let (url, commit_sha, error_kind, error_message) = match &result.outcome {
            MirrorOutcome::Mirrored { url, commit_sha } => {
                (Some(url.clone()), commit_sha.clone(), None, None)
            }
            MirrorOutcome::Failed { error } => (
                None,
                None,
                Some(error.kind().as_str().to_string()),
                Some(error.to_string()),
            ),
        };
        Self {
            message_id,
            target_index: result.target as i64,
            repository: result.repository.clone(),
            url,
            commit_sha,
            error_kind,
            error_message,
            created_at,
        }
    }

    /// Link for a successful row; failed rows yield `None`.
    pub fn into_link(self) -> Option<MirrorLink> {
        let url = self.url?;
        Some(MirrorLink {
            target: usize::try_from(self.target_index).unwrap_or_default(),
            repository: self.repository,
            url,
            commit_sha: self.commit_sha,
        })
    }
}

impl MessageDB {
    pub fn into_domain(self, mirrors: Vec<MirrorLink>) -> Message {
        Message {
            id: self.id,
            content: self.content,
            timestamp: to_utc(self.created_at),
            github_url: self.github_url,
            mirrors,
        }
    }
}

impl From<MessageDB> for Message {
    fn from(db: MessageDB) -> Self {
        db.into_domain(Vec::new())
    }
}
