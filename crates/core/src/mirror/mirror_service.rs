use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use log::{debug, info, warn};

use crate::errors::{Error, Result};
use crate::messages::Message;

use super::errors::MirrorError;
use super::mirror_model::{
    CommitQuery, MirrorPolicy, MirrorResult, RemoteCommit, RepositoryTarget, TargetSyncState,
};
use super::mirror_traits::{MirrorClient, MirrorServiceTrait, TargetStateStore};

/// Fans a message out to every configured repository target.
///
/// Targets are attempted concurrently and share no mutable state; results
/// come back in target order once every attempt has settled.
pub struct MirrorService {
    targets: Vec<RepositoryTarget>,
    client: Arc<dyn MirrorClient>,
    state_store: Option<Arc<dyn TargetStateStore>>,
    policy: MirrorPolicy,
    read_timeout: Option<Duration>,
}

impl MirrorService {
    pub fn new(targets: Vec<RepositoryTarget>, client: Arc<dyn MirrorClient>) -> Self {
        let mut targets = targets;
        targets.sort_by_key(|t| t.index);
        Self {
            targets,
            client,
            state_store: None,
            policy: MirrorPolicy::default(),
            read_timeout: None,
        }
    }

    pub fn with_state_store(mut self, store: Arc<dyn TargetStateStore>) -> Self {
        self.state_store = Some(store);
        self
    }

    pub fn with_policy(mut self, policy: MirrorPolicy) -> Self {
        self.policy = MirrorPolicy {
            max_attempts: policy.max_attempts.max(1),
            ..policy
        };
        self
    }

    /// Caps commit reads below the per-attempt timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn targets(&self) -> &[RepositoryTarget] {
        &self.targets
    }

    async fn attempt(
        &self,
        target: &RepositoryTarget,
        message: &Message,
    ) -> std::result::Result<super::MirrorReceipt, MirrorError> {
        match tokio::time::timeout(
            self.policy.attempt_timeout,
            self.client.publish(target, message),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(MirrorError::Network(format!(
                "timed out after {} ms",
                self.policy.attempt_timeout.as_millis()
            ))),
        }
    }

    async fn mirror_target(&self, target: &RepositoryTarget, message: &Message) -> MirrorResult {
        let repository = target.full_name();
        let mut attempt = 0_u32;
        loop {
            attempt += 1;
            match self.attempt(target, message).await {
                Ok(receipt) => {
                    info!(
                        "Mirrored message {} to {} (target {}): {}",
                        message.id, repository, target.index, receipt.url
                    );
                    self.mark_synced(target).await;
                    return MirrorResult::mirrored(
                        target.index,
                        repository,
                        receipt.url,
                        receipt.commit_sha,
                    );
                }
                Err(error) if error.is_retryable() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.backoff(attempt, error.retry_after());
                    debug!(
                        "Mirror attempt {}/{} to {} failed ({}); retrying in {:?}",
                        attempt, self.policy.max_attempts, repository, error, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    warn!(
                        "Failed to mirror message {} to {} (target {}): {}",
                        message.id, repository, target.index, error
                    );
                    return MirrorResult::failed(target.index, repository, error);
                }
            }
        }
    }

    async fn read_commits(
        &self,
        target: &RepositoryTarget,
        query: &CommitQuery,
    ) -> std::result::Result<Vec<RemoteCommit>, MirrorError> {
        let limit = self
            .read_timeout
            .map_or(self.policy.attempt_timeout, |t| t.min(self.policy.attempt_timeout));
        let mut commits =
            match tokio::time::timeout(limit, self.client.list_commits(target, query)).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(MirrorError::Network(format!(
                        "timed out after {} ms",
                        limit.as_millis()
                    )))
                }
            };
        commits.truncate(query.limit());
        self.mark_synced(target).await;
        debug!(
            "Read {} commits from {} (target {})",
            commits.len(),
            target.full_name(),
            target.index
        );
        Ok(commits)
    }

    async fn mark_synced(&self, target: &RepositoryTarget) {
        if let Some(store) = &self.state_store {
            if let Err(e) = store.mark_synced(target, Utc::now()).await {
                warn!("Could not record sync time for {}: {}", target.full_name(), e);
            }
        }
    }
}

#[async_trait]
impl MirrorServiceTrait for MirrorService {
    async fn mirror(&self, message: &Message) -> Vec<MirrorResult> {
        if self.targets.is_empty() {
            return Vec::new();
        }
        join_all(
            self.targets
                .iter()
                .map(|target| self.mirror_target(target, message)),
        )
        .await
    }

    fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// One entry per configured target; rows left over from earlier
    /// configurations are ignored.
    fn target_states(&self) -> Result<Vec<TargetSyncState>> {
        let stored = match &self.state_store {
            Some(store) => store.list_target_states()?,
            None => Vec::new(),
        };
        Ok(self
            .targets
            .iter()
            .map(|t| {
                let repository = t.full_name();
                let last_sync = stored
                    .iter()
                    .find(|s| s.repository == repository)
                    .and_then(|s| s.last_sync);
                TargetSyncState {
                    index: t.index,
                    repository,
                    last_sync,
                }
            })
            .collect())
    }

    async fn target_commits(
        &self,
        index: usize,
        query: &CommitQuery,
    ) -> Result<Vec<RemoteCommit>> {
        let target = self
            .targets
            .iter()
            .find(|t| t.index == index)
            .ok_or_else(|| Error::NotFound(format!("repository target {index}")))?;
        Ok(self.read_commits(target, query).await?)
    }

    async fn all_commits(&self, query: &CommitQuery) -> Vec<RemoteCommit> {
        let reads = join_all(
            self.targets
                .iter()
                .map(|target| async move { (target, self.read_commits(target, query).await) }),
        )
        .await;

        let mut commits: Vec<RemoteCommit> = Vec::new();
        for (target, read) in reads {
            match read {
                Ok(found) => commits.extend(found),
                Err(e) => warn!(
                    "Could not read commits from {} (target {}): {}",
                    target.full_name(),
                    target.index,
                    e
                ),
            }
        }
        commits.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| a.target.cmp(&b.target))
        });
        commits.truncate(query.limit());
        commits
    }
}
