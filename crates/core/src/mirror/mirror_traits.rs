use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::Result;
use crate::messages::Message;

use super::errors::MirrorError;
use super::mirror_model::{
    CommitQuery, MirrorReceipt, MirrorResult, RemoteCommit, RepositoryTarget, TargetSyncState,
};

/// A remote that can record a message as a commit.
#[async_trait]
pub trait MirrorClient: Send + Sync {
    async fn publish(
        &self,
        target: &RepositoryTarget,
        message: &Message,
    ) -> std::result::Result<MirrorReceipt, MirrorError>;

    /// Lists commits on the target's branch, newest first.
    async fn list_commits(
        &self,
        target: &RepositoryTarget,
        query: &CommitQuery,
    ) -> std::result::Result<Vec<RemoteCommit>, MirrorError> {
        let _ = (target, query);
        Err(MirrorError::rejected(501, "client cannot read commits"))
    }
}

/// Persistence for per-target sync bookkeeping.
#[async_trait]
pub trait TargetStateStore: Send + Sync {
    /// Upserts the configured targets so their state can be tracked.
    async fn register_targets(&self, targets: &[RepositoryTarget]) -> Result<()>;
    async fn mark_synced(&self, target: &RepositoryTarget, at: DateTime<Utc>) -> Result<()>;
    fn list_target_states(&self) -> Result<Vec<TargetSyncState>>;
}

/// Trait for the mirror service.
#[async_trait]
pub trait MirrorServiceTrait: Send + Sync {
    /// Attempts every configured target; never fails as a whole.
    async fn mirror(&self, message: &Message) -> Vec<MirrorResult>;
    fn target_count(&self) -> usize;
    fn target_states(&self) -> Result<Vec<TargetSyncState>>;

    /// Reads commits back from the target with `index`.
    async fn target_commits(&self, index: usize, query: &CommitQuery)
        -> Result<Vec<RemoteCommit>>;

    /// Reads commits from every target, newest first. Targets that fail are
    /// left out.
    async fn all_commits(&self, query: &CommitQuery) -> Vec<RemoteCommit>;
}
