use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;

use crate::constants::{DEFAULT_MESSAGES_LIMIT, MAX_MESSAGES_LIMIT};
use crate::errors::Result;
use crate::mirror::MirrorResult;

use super::cache::{CacheConfig, MessageCache};
use super::messages_model::{Message, MessageQuery, NewMessage};
use super::messages_traits::{MessageRepositoryTrait, MessageServiceTrait};

/// The message store: validation, persistence, and the recent-message cache.
pub struct MessageService {
    repository: Arc<dyn MessageRepositoryTrait>,
    cache: MessageCache,
    default_limit: usize,
}

impl MessageService {
    pub fn new(repository: Arc<dyn MessageRepositoryTrait>) -> Self {
        Self::with_cache(repository, CacheConfig::default())
    }

    pub fn with_cache(repository: Arc<dyn MessageRepositoryTrait>, cache: CacheConfig) -> Self {
        Self {
            repository,
            cache: MessageCache::new(cache),
            default_limit: DEFAULT_MESSAGES_LIMIT,
        }
    }

    /// Window returned when the caller does not pass a limit.
    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit.clamp(1, MAX_MESSAGES_LIMIT);
        self
    }

    fn effective_limit(&self, limit: Option<usize>) -> usize {
        limit
            .unwrap_or(self.default_limit)
            .clamp(1, MAX_MESSAGES_LIMIT)
    }

    fn load_through_cache(&self, limit: usize) -> Result<Vec<Message>> {
        if let Some(hit) = self.cache.get(limit) {
            return Ok(hit);
        }
        let generation = self.cache.generation();
        let capacity = self.cache.config().capacity;
        let mut window = self
            .repository
            .list_messages(&MessageQuery::latest(capacity))?;
        self.cache.fill(generation, window.clone());
        window.truncate(limit);
        Ok(window)
    }
}

#[async_trait]
impl MessageServiceTrait for MessageService {
    async fn append(&self, content: &str) -> Result<Message> {
        let new_message = NewMessage::new(content)?;
        let stored = self.repository.insert_message(new_message).await?;
        self.cache.invalidate();
        debug!("Stored message {} at {}", stored.id, stored.timestamp);
        Ok(stored)
    }

    fn list_recent(
        &self,
        limit: Option<usize>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Message>> {
        let limit = self.effective_limit(limit);
        if since.is_none() && self.cache.covers(limit) {
            return self.load_through_cache(limit);
        }
        self.repository.list_messages(&MessageQuery { limit, since })
    }

    fn get(&self, message_id: i64) -> Result<Message> {
        self.repository.get_message(message_id)
    }

    async fn record_mirrors(&self, message_id: i64, results: &[MirrorResult]) -> Result<()> {
        if results.is_empty() {
            return Ok(());
        }
        self.repository
            .record_mirror_results(message_id, results.to_vec())
            .await?;
        self.cache.invalidate();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{DatabaseError, Error, ValidationError};
    use crate::messages::messages_model::{now_millis, MirrorLink};
    use crate::mirror::{MirrorError, MirrorOutcome};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    // ============== Mock Repository ==============

    #[derive(Default)]
    struct MockMessageRepository {
        messages: Mutex<Vec<Message>>,
        list_calls: AtomicUsize,
    }

    impl MockMessageRepository {
        fn list_calls(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MessageRepositoryTrait for MockMessageRepository {
        async fn insert_message(&self, new_message: NewMessage) -> Result<Message> {
            let mut messages = self.messages.lock().unwrap();
            let message = Message {
                id: messages.len() as i64 + 1,
                content: new_message.into_content(),
                timestamp: now_millis(),
                github_url: None,
                mirrors: vec![],
            };
            messages.push(message.clone());
            Ok(message)
        }

        fn list_messages(&self, query: &MessageQuery) -> Result<Vec<Message>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            let messages = self.messages.lock().unwrap();
            Ok(messages
                .iter()
                .rev()
                .filter(|m| query.since.map_or(true, |since| m.timestamp > since))
                .take(query.limit)
                .cloned()
                .collect())
        }

        fn get_message(&self, message_id: i64) -> Result<Message> {
            self.messages
                .lock()
                .unwrap()
                .iter()
                .find(|m| m.id == message_id)
                .cloned()
                .ok_or_else(|| DatabaseError::NotFound(format!("message {message_id}")).into())
        }

        async fn record_mirror_results(
            &self,
            message_id: i64,
            results: Vec<MirrorResult>,
        ) -> Result<()> {
            let mut messages = self.messages.lock().unwrap();
            let message = messages
                .iter_mut()
                .find(|m| m.id == message_id)
                .ok_or_else(|| DatabaseError::NotFound(format!("message {message_id}")))?;
            for result in results {
                if let MirrorOutcome::Mirrored { url, commit_sha } = result.outcome {
                    if message.github_url.is_none() {
                        message.github_url = Some(url.clone());
                    }
                    message.mirrors.push(MirrorLink {
                        target: result.target,
                        repository: result.repository,
                        url,
                        commit_sha,
                    });
                }
            }
            Ok(())
        }
    }

    fn service_with(cache: CacheConfig) -> (Arc<MockMessageRepository>, MessageService) {
        let repo = Arc::new(MockMessageRepository::default());
        let service = MessageService::with_cache(repo.clone(), cache);
        (repo, service)
    }

    #[tokio::test]
    async fn append_rejects_blank_content_without_writing() {
        let (repo, service) = service_with(CacheConfig::disabled());

        for blank in ["", "   "] {
            let err = service.append(blank).await.unwrap_err();
            assert!(matches!(
                err,
                Error::Validation(ValidationError::EmptyMessage)
            ));
        }
        assert!(repo.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn appended_message_is_listed_with_greater_id() {
        let (_repo, service) = service_with(CacheConfig::disabled());

        let first = service.append("first").await.unwrap();
        let second = service.append("second").await.unwrap();
        assert!(second.id > first.id);

        let listed = service.list_recent(None, None).unwrap();
        assert_eq!(listed[0].content, "second");
        assert!(listed.iter().any(|m| m.content == "first"));
    }

    #[tokio::test]
    async fn cached_reads_hit_storage_once() {
        let (repo, service) =
            service_with(CacheConfig::new(50, Duration::from_secs(60)));
        service.append("hello").await.unwrap();

        let a = service.list_recent(Some(10), None).unwrap();
        let b = service.list_recent(Some(10), None).unwrap();
        assert_eq!(a, b);
        assert_eq!(repo.list_calls(), 1);
    }

    #[tokio::test]
    async fn append_invalidates_cache() {
        let (repo, service) =
            service_with(CacheConfig::new(50, Duration::from_secs(60)));
        service.append("one").await.unwrap();
        assert_eq!(service.list_recent(None, None).unwrap().len(), 1);

        service.append("two").await.unwrap();
        let listed = service.list_recent(None, None).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].content, "two");
        assert_eq!(repo.list_calls(), 2);
    }

    #[tokio::test]
    async fn since_and_oversized_limits_bypass_cache() {
        let (repo, service) =
            service_with(CacheConfig::new(5, Duration::from_secs(60)));
        service.append("one").await.unwrap();

        service.list_recent(Some(50), None).unwrap();
        service
            .list_recent(None, Some(Utc::now() - chrono::Duration::hours(1)))
            .unwrap();
        service.list_recent(Some(50), None).unwrap();
        assert_eq!(repo.list_calls(), 3);
    }

    #[tokio::test]
    async fn limit_is_clamped() {
        let (_repo, service) = service_with(CacheConfig::disabled());
        for i in 0..3 {
            service.append(&format!("m{i}")).await.unwrap();
        }
        assert_eq!(service.list_recent(Some(0), None).unwrap().len(), 1);
        assert_eq!(service.list_recent(Some(10_000), None).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn recorded_mirrors_are_visible_after_cache_invalidation() {
        let (_repo, service) =
            service_with(CacheConfig::new(50, Duration::from_secs(60)));
        let message = service.append("mirrored").await.unwrap();
        assert!(service.list_recent(None, None).unwrap()[0]
            .github_url
            .is_none());

        let results = vec![
            MirrorResult::failed(1, "a/one", MirrorError::Network("down".into())),
            MirrorResult::mirrored(2, "b/two", "https://example.test/b", Some("abc".into())),
        ];
        service.record_mirrors(message.id, &results).await.unwrap();

        let listed = service.list_recent(None, None).unwrap();
        assert_eq!(
            listed[0].github_url.as_deref(),
            Some("https://example.test/b")
        );
        assert_eq!(listed[0].mirrors.len(), 1);
        assert_eq!(listed[0].content, "mirrored");
        assert_eq!(listed[0].timestamp, message.timestamp);
    }
}
