//! Mirror domain models.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::MirrorError;
use crate::constants::{DEFAULT_COMMITS_LIMIT, MAX_COMMITS_LIMIT};

/// Access token for a repository target.
///
/// `Debug` and `Display` are redacted so the token cannot reach logs or
/// error messages by accident.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// A configured remote repository that receives a commit per message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryTarget {
    /// Positional index from configuration (1, 2, 3, ...).
    pub index: usize,
    pub owner: String,
    pub name: String,
    pub credential: Credential,
}

impl RepositoryTarget {
    pub fn new(
        index: usize,
        owner: impl Into<String>,
        name: impl Into<String>,
        credential: Credential,
    ) -> Self {
        Self {
            index,
            owner: owner.into(),
            name: name.into(),
            credential,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// What a remote returns after accepting a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorReceipt {
    pub url: String,
    pub commit_sha: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MirrorOutcome {
    Mirrored {
        url: String,
        commit_sha: Option<String>,
    },
    Failed {
        error: MirrorError,
    },
}

/// Outcome of mirroring one message into one target.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorResult {
    pub target: usize,
    pub repository: String,
    pub outcome: MirrorOutcome,
}

impl MirrorResult {
    pub fn mirrored(
        target: usize,
        repository: impl Into<String>,
        url: impl Into<String>,
        commit_sha: Option<String>,
    ) -> Self {
        Self {
            target,
            repository: repository.into(),
            outcome: MirrorOutcome::Mirrored {
                url: url.into(),
                commit_sha,
            },
        }
    }

    pub fn failed(target: usize, repository: impl Into<String>, error: MirrorError) -> Self {
        Self {
            target,
            repository: repository.into(),
            outcome: MirrorOutcome::Failed { error },
        }
    }

    pub fn url(&self) -> Option<&str> {
        match &self.outcome {
            MirrorOutcome::Mirrored { url, .. } => Some(url),
            MirrorOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&MirrorError> {
        match &self.outcome {
            MirrorOutcome::Failed { error } => Some(error),
            MirrorOutcome::Mirrored { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, MirrorOutcome::Mirrored { .. })
    }

    /// URL of the lowest-indexed successful target.
    pub fn first_url(results: &[MirrorResult]) -> Option<String> {
        results
            .iter()
            .filter(|r| r.is_success())
            .min_by_key(|r| r.target)
            .and_then(|r| r.url().map(str::to_string))
    }
}

/// Last known synchronization state of a target. Never carries the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSyncState {
    pub index: usize,
    pub repository: String,
    pub last_sync: Option<DateTime<Utc>>,
}

/// Filters for reading commits back from a target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitQuery {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// Only commits touching this path; clients fall back to their message
    /// directory when unset.
    pub path: Option<String>,
    pub max_count: Option<usize>,
}

impl CommitQuery {
    /// Requested count clamped to `1..=MAX_COMMITS_LIMIT`.
    pub fn limit(&self) -> usize {
        self.max_count
            .unwrap_or(DEFAULT_COMMITS_LIMIT)
            .clamp(1, MAX_COMMITS_LIMIT)
    }
}

/// A commit read back from a repository target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCommit {
    pub target: usize,
    pub repository: String,
    pub sha: String,
    pub message: String,
    pub author: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub url: String,
}

/// Attempt budget for a single target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorPolicy {
    /// Total attempts per target, at least 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for MirrorPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            attempt_timeout: Duration::from_secs(15),
        }
    }
}

impl MirrorPolicy {
    /// Delay before attempt `attempt + 1`, doubling from `base_delay`.
    pub fn backoff(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let exponent = attempt.saturating_sub(1).min(10);
        let computed = self.base_delay.saturating_mul(1_u32 << exponent);
        computed.max(retry_after.unwrap_or_default()).min(self.max_delay)
    }
}
