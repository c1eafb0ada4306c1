//! Mirror error types.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Why a single target could not be mirrored.
///
/// Messages are built from remote status codes and response bodies, never
/// from the credential.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MirrorError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("rejected by remote (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Coarse classification exposed over the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorErrorKind {
    Authentication,
    Network,
    RateLimit,
    Rejected,
}

impl MirrorErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MirrorErrorKind::Authentication => "authentication",
            MirrorErrorKind::Network => "network",
            MirrorErrorKind::RateLimit => "rate_limit",
            MirrorErrorKind::Rejected => "rejected",
        }
    }
}

impl MirrorError {
    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after,
        }
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> MirrorErrorKind {
        match self {
            MirrorError::Authentication(_) => MirrorErrorKind::Authentication,
            MirrorError::Network(_) => MirrorErrorKind::Network,
            MirrorError::RateLimited { .. } => MirrorErrorKind::RateLimit,
            MirrorError::Rejected { .. } => MirrorErrorKind::Rejected,
        }
    }

    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            MirrorError::Network(_) | MirrorError::RateLimited { .. } => true,
            MirrorError::Rejected { status, .. } => *status >= 500,
            MirrorError::Authentication(_) => false,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            MirrorError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
