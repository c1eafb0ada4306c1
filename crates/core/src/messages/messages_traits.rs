use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::Result;
use crate::messages::messages_model::{Message, MessageQuery, NewMessage};
use crate::mirror::MirrorResult;

/// Trait for message persistence.
#[async_trait]
pub trait MessageRepositoryTrait: Send + Sync {
    /// Stores a message, assigning the next identifier and the current time.
    ///
    /// Implementations must serialize identifier assignment and keep
    /// timestamps non-decreasing in identifier order.
    async fn insert_message(&self, new_message: NewMessage) -> Result<Message>;

    /// Newest first, ordered by `(timestamp DESC, id DESC)`.
    fn list_messages(&self, query: &MessageQuery) -> Result<Vec<Message>>;

    fn get_message(&self, message_id: i64) -> Result<Message>;

    /// Persists per-target outcomes and sets `github_url` to the first
    /// success when the message has none yet.
    async fn record_mirror_results(&self, message_id: i64, results: Vec<MirrorResult>)
        -> Result<()>;
}

/// Trait for the message store service.
#[async_trait]
pub trait MessageServiceTrait: Send + Sync {
    async fn append(&self, content: &str) -> Result<Message>;
    fn list_recent(
        &self,
        limit: Option<usize>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Message>>;
    fn get(&self, message_id: i64) -> Result<Message>;
    async fn record_mirrors(&self, message_id: i64, results: &[MirrorResult]) -> Result<()>;
}
