/// Default number of messages returned by a history read.
pub const DEFAULT_MESSAGES_LIMIT: usize = 100;

/// Hard ceiling for a single history read.
pub const MAX_MESSAGES_LIMIT: usize = 500;

/// Default size of the recent-message cache window.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Default lifetime of the recent-message cache, in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 5;

/// Environment key prefix for repository targets (`GITHUB_REPO_1=owner/name:token`).
pub const TARGET_ENV_PREFIX: &str = "GITHUB_REPO_";

/// Default number of commits read back from a repository target.
pub const DEFAULT_COMMITS_LIMIT: usize = 30;

/// One page of the commits API; reads never go past it.
pub const MAX_COMMITS_LIMIT: usize = 100;
