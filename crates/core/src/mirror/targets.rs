//! Parsing of repository targets from configuration.
//!
//! Each target is one `GITHUB_REPO_<n>=owner/name:token` entry. Entries are
//! validated up front so a typo fails at startup rather than on the first
//! message.

use std::collections::{BTreeMap, HashMap};

use crate::constants::TARGET_ENV_PREFIX;
use crate::errors::ConfigError;

use super::mirror_model::{Credential, RepositoryTarget};

/// Parses `owner/name:token` into a target with the given index.
pub fn parse_target(
    index: usize,
    key: &str,
    raw: &str,
) -> std::result::Result<RepositoryTarget, ConfigError> {
    let malformed = || ConfigError::MalformedTarget {
        key: key.to_string(),
        value: redact(raw),
    };

    let (repo, token) = raw.trim().split_once(':').ok_or_else(malformed)?;
    let (owner, name) = repo.split_once('/').ok_or_else(malformed)?;
    let (owner, name, token) = (owner.trim(), name.trim(), token.trim());

    let valid_segment = |s: &str| {
        !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };
    if !valid_segment(owner) || !valid_segment(name) || token.is_empty() {
        return Err(malformed());
    }

    Ok(RepositoryTarget::new(
        index,
        owner,
        name,
        Credential::new(token),
    ))
}

/// Collects every `GITHUB_REPO_<n>` entry, ordered by `n`.
///
/// A repository may back only one index; GitHub names are compared
/// case-insensitively.
pub fn targets_from_vars<I, K, V>(vars: I) -> std::result::Result<Vec<RepositoryTarget>, ConfigError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut targets = BTreeMap::new();
    for (key, value) in vars {
        let key = key.as_ref();
        let Some(suffix) = key.strip_prefix(TARGET_ENV_PREFIX) else {
            continue;
        };
        let index = suffix
            .parse::<usize>()
            .ok()
            .filter(|i| *i > 0)
            .ok_or_else(|| ConfigError::InvalidTargetIndex {
                key: key.to_string(),
            })?;
        let target = parse_target(index, key, value.as_ref())?;
        if targets.insert(index, target).is_some() {
            return Err(ConfigError::DuplicateTarget(index));
        }
    }

    let mut seen: HashMap<String, usize> = HashMap::new();
    for target in targets.values() {
        let repository = target.full_name();
        if let Some(first) = seen.insert(repository.to_ascii_lowercase(), target.index) {
            return Err(ConfigError::DuplicateRepository {
                repository,
                first,
                second: target.index,
            });
        }
    }
    Ok(targets.into_values().collect())
}

/// Keeps the repository part of a raw value and hides the token.
fn redact(raw: &str) -> String {
    match raw.split_once(':') {
        Some((repo, _)) => format!("{}:***", repo.trim()),
        None => raw.trim().to_string(),
    }
}
