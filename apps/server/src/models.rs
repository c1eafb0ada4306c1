use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use bookchat_core::chat::ChatReceipt;
use bookchat_core::messages::{Message as CoreMessage, MirrorLink};
use bookchat_core::mirror::{
    CommitQuery, MirrorOutcome, MirrorResult, RemoteCommit, TargetSyncState,
};

#[derive(Deserialize, ToSchema, Debug, Clone)]
pub struct ChatRequest {
    pub message: String,
}

/// Per-target outcome of mirroring a freshly posted message.
#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct MirrorStatus {
    pub target: usize,
    pub repository: String,
    /// `ok` or `error`.
    pub status: String,
    pub url: Option<String>,
    pub commit_sha: Option<String>,
    /// `authentication`, `network`, `rate_limit` or `rejected`.
    pub error_kind: Option<String>,
    pub error: Option<String>,
}

impl From<&MirrorResult> for MirrorStatus {
    fn from(result: &MirrorResult) -> Self {
        let base = Self {
            target: result.target,
            repository: result.repository.clone(),
            status: "ok".to_string(),
            url: None,
            commit_sha: None,
            error_kind: None,
            error: None,
        };
        match &result.outcome {
            MirrorOutcome::Mirrored { url, commit_sha } => Self {
                url: Some(url.clone()),
                commit_sha: commit_sha.clone(),
                ..base
            },
            MirrorOutcome::Failed { error } => Self {
                status: "error".to_string(),
                error_kind: Some(error.kind().as_str().to_string()),
                error: Some(error.to_string()),
                ..base
            },
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct ChatResponse {
    /// Always `ok`; mirror failures are reported in `mirrors`.
    pub status: String,
    pub github_url: Option<String>,
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub mirrors: Vec<MirrorStatus>,
    /// Mirroring was still running when the response was sent.
    pub mirrors_pending: bool,
}

impl From<ChatReceipt> for ChatResponse {
    fn from(receipt: ChatReceipt) -> Self {
        Self {
            status: "ok".to_string(),
            github_url: receipt.github_url(),
            id: receipt.message.id,
            timestamp: receipt.message.timestamp,
            mirrors: receipt.mirrors.iter().map(MirrorStatus::from).collect(),
            mirrors_pending: receipt.mirrors_pending,
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct MessageMirror {
    pub target: usize,
    pub repository: String,
    pub url: String,
    pub commit_sha: Option<String>,
}

impl From<MirrorLink> for MessageMirror {
    fn from(link: MirrorLink) -> Self {
        Self {
            target: link.target,
            repository: link.repository,
            url: link.url,
            commit_sha: link.commit_sha,
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct Message {
    pub id: i64,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub github_url: Option<String>,
    pub mirrors: Vec<MessageMirror>,
}

impl From<CoreMessage> for Message {
    fn from(m: CoreMessage) -> Self {
        Self {
            id: m.id,
            message: m.content,
            timestamp: m.timestamp,
            github_url: m.github_url,
            mirrors: m.mirrors.into_iter().map(MessageMirror::from).collect(),
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}

#[derive(Deserialize, IntoParams, Debug, Clone, Default)]
#[into_params(parameter_in = Query)]
pub struct MessagesQuery {
    /// Maximum number of messages, newest first.
    pub limit: Option<usize>,
    /// Only messages strictly newer than this RFC 3339 instant.
    pub since: Option<DateTime<Utc>>,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct Repository {
    pub index: usize,
    pub repository: String,
    pub last_sync: Option<DateTime<Utc>>,
}

impl From<TargetSyncState> for Repository {
    fn from(s: TargetSyncState) -> Self {
        Self {
            index: s.index,
            repository: s.repository,
            last_sync: s.last_sync,
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct RepositoriesResponse {
    pub repositories: Vec<Repository>,
}

#[derive(Deserialize, IntoParams, Debug, Clone, Default)]
#[into_params(parameter_in = Query)]
pub struct CommitsQuery {
    /// Only commits after this RFC 3339 instant.
    pub since: Option<DateTime<Utc>>,
    /// Only commits before this RFC 3339 instant.
    pub until: Option<DateTime<Utc>>,
    /// Repository path to filter on; the message directory when omitted.
    pub path: Option<String>,
    /// Maximum number of commits, at most 100.
    pub limit: Option<usize>,
}

impl From<CommitsQuery> for CommitQuery {
    fn from(q: CommitsQuery) -> Self {
        Self {
            since: q.since,
            until: q.until,
            path: q.path,
            max_count: q.limit,
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct Commit {
    pub target: usize,
    pub repository: String,
    pub sha: String,
    pub message: String,
    pub author: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub url: String,
}

impl From<RemoteCommit> for Commit {
    fn from(c: RemoteCommit) -> Self {
        Self {
            target: c.target,
            repository: c.repository,
            sha: c.sha,
            message: c.message,
            author: c.author,
            timestamp: c.timestamp,
            url: c.url,
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct CommitsResponse {
    pub commits: Vec<Commit>,
}
