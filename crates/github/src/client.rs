use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER, USER_AGENT};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};

use bookchat_core::messages::Message;
use bookchat_core::mirror::{
    CommitQuery, MirrorClient, MirrorError, MirrorReceipt, RemoteCommit, RepositoryTarget,
};

use crate::payload::{commit_message, file_body, file_path};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Longest slice of an error body carried into a [`MirrorError`].
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct GithubClientConfig {
    pub api_base: String,
    /// Branch to commit to; the repository default when `None`.
    pub branch: Option<String>,
    pub path_prefix: String,
    pub timeout: Duration,
}

impl Default for GithubClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            branch: None,
            path_prefix: "messages".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateFileRequest<'a> {
    message: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CreateFileResponse {
    content: Option<HtmlLink>,
    commit: Option<CommitLink>,
}

#[derive(Debug, Deserialize)]
struct HtmlLink {
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitLink {
    sha: Option<String>,
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitEntry {
    sha: String,
    html_url: Option<String>,
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    message: String,
    author: Option<CommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    name: Option<String>,
    date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Writes one file per message through `PUT /repos/{owner}/{repo}/contents/{path}`
/// and reads them back through `GET /repos/{owner}/{repo}/commits`.
///
/// The token comes from the target, so one client serves every repository.
#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    config: GithubClientConfig,
}

impl GithubClient {
    pub fn new(config: GithubClientConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("bookchat-mirror"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert("x-github-api-version", HeaderValue::from_static("2022-11-28"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout.max(Duration::from_millis(1)))
            .build()?;

        let config = GithubClientConfig {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            ..config
        };
        Ok(Self { http, config })
    }

    fn contents_url(&self, target: &RepositoryTarget, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.config.api_base, target.owner, target.name, path
        )
    }

    fn commits_url(&self, target: &RepositoryTarget) -> String {
        format!(
            "{}/repos/{}/{}/commits",
            self.config.api_base, target.owner, target.name
        )
    }

    fn commit_params(&self, query: &CommitQuery) -> Vec<(&'static str, String)> {
        let path = query
            .path
            .clone()
            .unwrap_or_else(|| self.config.path_prefix.clone());
        let mut params = vec![("per_page", query.limit().to_string())];
        if !path.is_empty() {
            params.push(("path", path));
        }
        if let Some(branch) = &self.config.branch {
            params.push(("sha", branch.clone()));
        }
        if let Some(since) = query.since {
            params.push(("since", since.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(until) = query.until {
            params.push(("until", until.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        params
    }
}

fn bearer(target: &RepositoryTarget) -> Result<HeaderValue, MirrorError> {
    HeaderValue::from_str(&format!("Bearer {}", target.credential.expose().trim())).map_err(|_| {
        MirrorError::Authentication("token contains invalid header characters".to_string())
    })
}

#[async_trait]
impl MirrorClient for GithubClient {
    async fn publish(
        &self,
        target: &RepositoryTarget,
        message: &Message,
    ) -> Result<MirrorReceipt, MirrorError> {
        let path = file_path(&self.config.path_prefix, message);
        let payload = CreateFileRequest {
            message: commit_message(message),
            content: STANDARD.encode(file_body(message)),
            branch: self.config.branch.as_deref(),
        };

        let auth = bearer(target)?;

        debug!("Publishing message {} to {}", message.id, target.full_name());
        let response = self
            .http
            .put(self.contents_url(target, &path))
            .header(AUTHORIZATION, auth)
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(response).await);
        }

        let body: CreateFileResponse = response
            .json()
            .await
            .map_err(|e| MirrorError::Network(format!("unreadable response: {e}")))?;

        let commit_sha = body.commit.as_ref().and_then(|c| c.sha.clone());
        let url = body
            .content
            .and_then(|c| c.html_url)
            .or_else(|| body.commit.and_then(|c| c.html_url))
            .ok_or_else(|| MirrorError::rejected(status.as_u16(), "response carried no URL"))?;

        Ok(MirrorReceipt { url, commit_sha })
    }

    async fn list_commits(
        &self,
        target: &RepositoryTarget,
        query: &CommitQuery,
    ) -> Result<Vec<RemoteCommit>, MirrorError> {
        let auth = bearer(target)?;

        debug!("Listing commits of {}", target.full_name());
        let response = self
            .http
            .get(self.commits_url(target))
            .header(AUTHORIZATION, auth)
            .query(&self.commit_params(query))
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let entries: Vec<CommitEntry> = response
            .json()
            .await
            .map_err(|e| MirrorError::Network(format!("unreadable response: {e}")))?;

        let repository = target.full_name();
        Ok(entries
            .into_iter()
            .take(query.limit())
            .map(|entry| {
                let (author, timestamp) = match entry.commit.author {
                    Some(a) => (a.name, a.date),
                    None => (None, None),
                };
                RemoteCommit {
                    target: target.index,
                    repository: repository.clone(),
                    url: entry.html_url.unwrap_or_else(|| {
                        format!("https://github.com/{}/commit/{}", repository, entry.sha)
                    }),
                    sha: entry.sha,
                    message: entry.commit.message,
                    author,
                    timestamp,
                }
            })
            .collect())
    }
}

fn transport_error(err: reqwest::Error) -> MirrorError {
    if err.is_timeout() {
        MirrorError::Network("request timed out".to_string())
    } else {
        MirrorError::Network(err.to_string())
    }
}

async fn status_error(response: Response) -> MirrorError {
    let status = response.status();
    let rate_exhausted = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0");
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let detail = error_detail(&response.text().await.unwrap_or_default());

    match status {
        StatusCode::UNAUTHORIZED => MirrorError::Authentication(detail),
        StatusCode::TOO_MANY_REQUESTS => MirrorError::rate_limited(detail, retry_after),
        StatusCode::FORBIDDEN if rate_exhausted || retry_after.is_some() => {
            MirrorError::rate_limited(detail, retry_after)
        }
        StatusCode::FORBIDDEN => MirrorError::Authentication(detail),
        other => MirrorError::rejected(other.as_u16(), detail),
    }
}

/// GitHub's `message` field when present, else a bounded slice of the body.
fn error_detail(body: &str) -> String {
    if let Ok(ErrorBody {
        message: Some(message),
    }) = serde_json::from_str::<ErrorBody>(body)
    {
        return message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
