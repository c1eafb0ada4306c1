use std::{collections::HashMap, net::SocketAddr, str::FromStr, time::Duration};

use anyhow::Context;
use bookchat_core::constants::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL_SECS, DEFAULT_MESSAGES_LIMIT, MAX_MESSAGES_LIMIT,
};
use bookchat_core::errors::ConfigError;
use bookchat_core::messages::CacheConfig;
use bookchat_core::mirror::{targets_from_vars, MirrorPolicy, RepositoryTarget};
use bookchat_github::DEFAULT_API_BASE;

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub static_dir: String,
    pub messages_limit: usize,
    pub cache: CacheConfig,
    pub mirror: MirrorConfig,
}

/// Where and how messages are mirrored.
pub struct MirrorConfig {
    pub api_base: String,
    pub branch: Option<String>,
    pub path_prefix: String,
    pub policy: MirrorPolicy,
    /// How long POST /chat waits for mirroring; always below the request timeout.
    pub deadline: Duration,
    pub targets: Vec<RepositoryTarget>,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let listen_addr: SocketAddr = parse_or(&vars, "BOOKCHAT_LISTEN_ADDR", "0.0.0.0:8000")?;
        let db_path = get("BOOKCHAT_DB_PATH").unwrap_or("./db/chat.db").to_string();
        let cors_allow = get("BOOKCHAT_CORS_ALLOW_ORIGINS")
            .unwrap_or("*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timeout_ms: u64 = parse_or(&vars, "BOOKCHAT_REQUEST_TIMEOUT_MS", "30000")?;
        if timeout_ms < 2 {
            return Err(invalid(
                "BOOKCHAT_REQUEST_TIMEOUT_MS",
                "must be at least 2".to_string(),
            ));
        }
        let static_dir = get("BOOKCHAT_STATIC_DIR").unwrap_or("apps/web").to_string();

        let messages_limit: usize = parse_or(
            &vars,
            "BOOKCHAT_MESSAGES_LIMIT",
            &DEFAULT_MESSAGES_LIMIT.to_string(),
        )?;
        if messages_limit == 0 || messages_limit > MAX_MESSAGES_LIMIT {
            return Err(invalid(
                "BOOKCHAT_MESSAGES_LIMIT",
                format!("must be between 1 and {}", MAX_MESSAGES_LIMIT),
            ));
        }

        let cache_ttl: u64 = parse_or(
            &vars,
            "BOOKCHAT_CACHE_TTL_SECS",
            &DEFAULT_CACHE_TTL_SECS.to_string(),
        )?;
        let cache_size: usize = parse_or(
            &vars,
            "BOOKCHAT_CACHE_SIZE",
            &DEFAULT_CACHE_CAPACITY.to_string(),
        )?;
        let cache = if cache_ttl == 0 || cache_size == 0 {
            CacheConfig::disabled()
        } else {
            CacheConfig::new(cache_size, Duration::from_secs(cache_ttl))
        };

        let mirror_timeout_ms: u64 = parse_or(&vars, "BOOKCHAT_MIRROR_TIMEOUT_MS", "15000")?;
        let max_attempts: u32 = parse_or(&vars, "BOOKCHAT_MIRROR_MAX_ATTEMPTS", "1")?;
        let retry_delay_ms: u64 = parse_or(&vars, "BOOKCHAT_MIRROR_RETRY_DELAY_MS", "500")?;
        let policy = MirrorPolicy {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(retry_delay_ms),
            attempt_timeout: Duration::from_millis(mirror_timeout_ms.max(1)),
            ..MirrorPolicy::default()
        };

        let deadline_ms: u64 = parse_or(
            &vars,
            "BOOKCHAT_MIRROR_DEADLINE_MS",
            &(timeout_ms * 3 / 4).max(1).to_string(),
        )?;
        if deadline_ms == 0 || deadline_ms >= timeout_ms {
            return Err(invalid(
                "BOOKCHAT_MIRROR_DEADLINE_MS",
                format!(
                    "must be between 1 and {} (below BOOKCHAT_REQUEST_TIMEOUT_MS)",
                    timeout_ms - 1
                ),
            ));
        }

        let targets = targets_from_vars(vars.iter()).context("invalid repository target")?;

        Ok(Self {
            listen_addr,
            db_path,
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
            static_dir,
            messages_limit,
            cache,
            mirror: MirrorConfig {
                api_base: get("BOOKCHAT_GITHUB_API_URL")
                    .unwrap_or(DEFAULT_API_BASE)
                    .to_string(),
                branch: get("BOOKCHAT_MIRROR_BRANCH").map(str::to_string),
                path_prefix: get("BOOKCHAT_MIRROR_PATH_PREFIX")
                    .unwrap_or("messages")
                    .to_string(),
                policy,
                deadline: Duration::from_millis(deadline_ms),
                targets,
            },
        })
    }
}

fn parse_or<T>(vars: &HashMap<String, String>, key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = vars
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .unwrap_or(default);
    raw.parse::<T>()
        .map_err(|e| invalid(key, format!("cannot parse {:?}: {}", raw, e)))
}

fn invalid(key: &str, message: String) -> anyhow::Error {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message,
    }
    .into()
}
