use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::errors::Result;
use crate::messages::{Message, MessageServiceTrait};
use crate::mirror::{MirrorResult, MirrorServiceTrait};

/// Result of posting a message: the stored message plus every mirror outcome.
#[derive(Debug, Clone)]
pub struct ChatReceipt {
    pub message: Message,
    pub mirrors: Vec<MirrorResult>,
    /// Mirroring outlived the deadline and is still running; its outcome
    /// will be recorded against the message when it settles.
    pub mirrors_pending: bool,
}

impl ChatReceipt {
    /// URL of the first target that accepted the commit, if any.
    pub fn github_url(&self) -> Option<String> {
        MirrorResult::first_url(&self.mirrors)
    }
}

/// Stateless orchestration of the message store and the repository mirror.
pub struct ChatService {
    messages: Arc<dyn MessageServiceTrait>,
    mirror: Arc<dyn MirrorServiceTrait>,
    mirror_deadline: Option<Duration>,
}

impl ChatService {
    pub fn new(
        messages: Arc<dyn MessageServiceTrait>,
        mirror: Arc<dyn MirrorServiceTrait>,
    ) -> Self {
        Self {
            messages,
            mirror,
            mirror_deadline: None,
        }
    }

    /// Bounds how long `post` waits for mirroring before answering.
    pub fn with_mirror_deadline(mut self, deadline: Duration) -> Self {
        self.mirror_deadline = Some(deadline);
        self
    }

    /// Stores `content`, then mirrors it.
    ///
    /// Only validation and store failures are errors. Once the message is
    /// stored, mirror failures and a failure to record their outcome are
    /// reported in the receipt or the log, never as an error.
    ///
    /// Mirroring runs on its own task, so neither the deadline nor a dropped
    /// caller cancels it or the recording of its outcome.
    pub async fn post(&self, content: &str) -> Result<ChatReceipt> {
        let mut message = self.messages.append(content).await?;
        let task = tokio::spawn(mirror_and_record(
            self.messages.clone(),
            self.mirror.clone(),
            message.clone(),
        ));

        let settled = match self.mirror_deadline {
            Some(deadline) => tokio::time::timeout(deadline, task).await.ok(),
            None => Some(task.await),
        };
        let (mirrors, mirrors_pending) = match settled {
            Some(Ok(mirrors)) => (mirrors, false),
            Some(Err(e)) => {
                warn!("Mirror task for message {} failed: {}", message.id, e);
                (Vec::new(), false)
            }
            None => {
                info!(
                    "Message {} stored; mirroring continues in the background",
                    message.id
                );
                (Vec::new(), true)
            }
        };

        message.github_url = MirrorResult::first_url(&mirrors);
        Ok(ChatReceipt {
            message,
            mirrors,
            mirrors_pending,
        })
    }

    pub fn history(
        &self,
        limit: Option<usize>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Message>> {
        self.messages.list_recent(limit, since)
    }
}

async fn mirror_and_record(
    messages: Arc<dyn MessageServiceTrait>,
    mirror: Arc<dyn MirrorServiceTrait>,
    message: Message,
) -> Vec<MirrorResult> {
    let mirrors = mirror.mirror(&message).await;

    if let Err(e) = messages.record_mirrors(message.id, &mirrors).await {
        warn!(
            "Message {} stored but mirror outcome not recorded: {}",
            message.id, e
        );
    }

    let succeeded = mirrors.iter().filter(|r| r.is_success()).count();
    info!(
        "Message {} posted; mirrored to {}/{} repositories",
        message.id,
        succeeded,
        mirrors.len()
    );
    mirrors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{DatabaseError, Error};
    use crate::mirror::{CommitQuery, MirrorError, RemoteCommit, TargetSyncState};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubMessages {
        stored: Mutex<Vec<Message>>,
        fail_append: bool,
        fail_record: bool,
        recorded: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl MessageServiceTrait for StubMessages {
        async fn append(&self, content: &str) -> Result<Message> {
            if self.fail_append {
                return Err(DatabaseError::QueryFailed("disk I/O error".into()).into());
            }
            crate::messages::NewMessage::new(content)?;
            let mut stored = self.stored.lock().unwrap();
            let message = Message {
                id: stored.len() as i64 + 1,
                content: content.to_string(),
                timestamp: Utc::now(),
                github_url: None,
                mirrors: vec![],
            };
            stored.push(message.clone());
            Ok(message)
        }

        fn list_recent(
            &self,
            _limit: Option<usize>,
            _since: Option<DateTime<Utc>>,
        ) -> Result<Vec<Message>> {
            Ok(self.stored.lock().unwrap().iter().rev().cloned().collect())
        }

        fn get(&self, message_id: i64) -> Result<Message> {
            self.stored
                .lock()
                .unwrap()
                .iter()
                .find(|m| m.id == message_id)
                .cloned()
                .ok_or_else(|| DatabaseError::NotFound(format!("message {message_id}")).into())
        }

        async fn record_mirrors(&self, message_id: i64, _results: &[MirrorResult]) -> Result<()> {
            if self.fail_record {
                return Err(DatabaseError::QueryFailed("locked".into()).into());
            }
            self.recorded.lock().unwrap().push(message_id);
            Ok(())
        }
    }

    struct StubMirror {
        results: Vec<MirrorResult>,
        calls: Mutex<u32>,
        stall: Option<Duration>,
    }

    impl StubMirror {
        fn returning(results: Vec<MirrorResult>) -> Self {
            Self {
                results,
                calls: Mutex::new(0),
                stall: None,
            }
        }

        fn stalling(mut self, stall: Duration) -> Self {
            self.stall = Some(stall);
            self
        }
    }

    #[async_trait]
    impl MirrorServiceTrait for StubMirror {
        async fn mirror(&self, _message: &Message) -> Vec<MirrorResult> {
            *self.calls.lock().unwrap() += 1;
            if let Some(stall) = self.stall {
                tokio::time::sleep(stall).await;
            }
            self.results.clone()
        }

        fn target_count(&self) -> usize {
            self.results.len()
        }

        fn target_states(&self) -> Result<Vec<TargetSyncState>> {
            Ok(vec![])
        }

        async fn target_commits(&self, index: usize, _: &CommitQuery) -> Result<Vec<RemoteCommit>> {
            Err(Error::NotFound(format!("repository target {index}")))
        }

        async fn all_commits(&self, _: &CommitQuery) -> Vec<RemoteCommit> {
            vec![]
        }
    }

    #[tokio::test]
    async fn post_returns_first_successful_url() {
        let mirror = Arc::new(StubMirror::returning(vec![
            MirrorResult::failed(1, "a/a", MirrorError::Network("down".into())),
            MirrorResult::mirrored(2, "b/b", "https://b/1", None),
        ]));
        let chat = ChatService::new(Arc::new(StubMessages::default()), mirror);

        let receipt = chat.post("hello").await.unwrap();
        assert_eq!(receipt.message.content, "hello");
        assert_eq!(receipt.github_url().as_deref(), Some("https://b/1"));
        assert_eq!(receipt.message.github_url.as_deref(), Some("https://b/1"));
        assert_eq!(receipt.mirrors.len(), 2);
    }

    #[tokio::test]
    async fn validation_failure_skips_mirroring() {
        let mirror = Arc::new(StubMirror::returning(vec![]));
        let chat = ChatService::new(Arc::new(StubMessages::default()), mirror.clone());

        let err = chat.post("  ").await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(*mirror.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn store_failure_is_an_error() {
        let mirror = Arc::new(StubMirror::returning(vec![]));
        let messages = Arc::new(StubMessages {
            fail_append: true,
            ..StubMessages::default()
        });
        let chat = ChatService::new(messages, mirror.clone());

        let err = chat.post("hello").await.unwrap_err();
        assert!(matches!(err, Error::Database(_)));
        assert_eq!(*mirror.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn failing_to_record_mirrors_keeps_the_post() {
        let mirror = Arc::new(StubMirror::returning(vec![MirrorResult::mirrored(
            1, "a/a", "https://a/1", None,
        )]));
        let messages = Arc::new(StubMessages {
            fail_record: true,
            ..StubMessages::default()
        });
        let chat = ChatService::new(messages, mirror);

        let receipt = chat.post("hello").await.unwrap();
        assert_eq!(receipt.github_url().as_deref(), Some("https://a/1"));
        assert_eq!(chat.history(None, None).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mirror_outcome_is_recorded_before_answering() {
        let mirror = Arc::new(StubMirror::returning(vec![MirrorResult::mirrored(
            1, "a/a", "https://a/1", None,
        )]));
        let messages = Arc::new(StubMessages::default());
        let chat = ChatService::new(messages.clone(), mirror)
            .with_mirror_deadline(Duration::from_secs(5));

        let receipt = chat.post("hello").await.unwrap();
        assert!(!receipt.mirrors_pending);
        assert_eq!(*messages.recorded.lock().unwrap(), vec![receipt.message.id]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_mirror_answers_at_deadline_and_records_later() {
        let mirror = Arc::new(
            StubMirror::returning(vec![MirrorResult::mirrored(1, "a/a", "https://a/1", None)])
                .stalling(Duration::from_secs(10)),
        );
        let messages = Arc::new(StubMessages::default());
        let chat = ChatService::new(messages.clone(), mirror)
            .with_mirror_deadline(Duration::from_secs(1));

        let receipt = chat.post("hello").await.unwrap();
        assert!(receipt.mirrors_pending);
        assert!(receipt.mirrors.is_empty());
        assert!(receipt.github_url().is_none());
        assert_eq!(chat.history(None, None).unwrap().len(), 1);
        assert!(messages.recorded.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(*messages.recorded.lock().unwrap(), vec![receipt.message.id]);
    }

    #[tokio::test]
    async fn dropped_caller_does_not_cancel_recording() {
        let mirror = Arc::new(
            StubMirror::returning(vec![]).stalling(Duration::from_millis(50)),
        );
        let messages = Arc::new(StubMessages::default());
        let chat = ChatService::new(messages.clone(), mirror);

        let abandoned =
            tokio::time::timeout(Duration::from_millis(10), chat.post("hello")).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(*messages.recorded.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn stored_messages_can_be_looked_up() {
        let messages = Arc::new(StubMessages::default());
        let chat = ChatService::new(messages.clone(), Arc::new(StubMirror::returning(vec![])));

        let receipt = chat.post("hello").await.unwrap();
        assert_eq!(messages.get(receipt.message.id).unwrap().content, "hello");
        assert!(matches!(
            messages.get(99),
            Err(Error::Database(DatabaseError::NotFound(_)))
        ));
    }
}
