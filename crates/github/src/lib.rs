//! GitHub contents API client used to mirror chat messages as commits.
//!
//! Each message becomes one file under a configurable prefix in every
//! configured repository. The client implements
//! [`bookchat_core::mirror::MirrorClient`]; retries and per-attempt
//! deadlines are the mirror service's concern.

mod client;
mod payload;

pub use client::{GithubClient, GithubClientConfig, DEFAULT_API_BASE};
pub use payload::{commit_message, file_body, file_path};
