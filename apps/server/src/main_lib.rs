use std::sync::Arc;

use crate::config::Config;
use bookchat_core::{
    chat::ChatService,
    messages::{MessageService, MessageServiceTrait},
    mirror::{MirrorClient, MirrorService, MirrorServiceTrait, TargetStateStore},
};
use bookchat_github::{GithubClient, GithubClientConfig};
use bookchat_storage_sqlite::{
    db::{self, write_actor},
    messages::MessageRepository,
    targets::TargetRepository,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub chat_service: Arc<ChatService>,
    pub mirror_service: Arc<dyn MirrorServiceTrait>,
}

pub fn init_tracing() {
    let log_format = std::env::var("BOOKCHAT_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

/// Wires the store and the GitHub mirror described by `config`.
pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let client = GithubClient::new(GithubClientConfig {
        api_base: config.mirror.api_base.clone(),
        branch: config.mirror.branch.clone(),
        path_prefix: config.mirror.path_prefix.clone(),
        timeout: config.mirror.policy.attempt_timeout,
    })?;
    build_state_with_client(config, Arc::new(client)).await
}

/// Same as [`build_state`] with a caller-supplied mirror client.
pub async fn build_state_with_client(
    config: &Config,
    client: Arc<dyn MirrorClient>,
) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = write_actor::spawn_writer((*pool).clone());

    let message_repository = Arc::new(MessageRepository::new(pool.clone(), writer.clone()));
    let message_service: Arc<dyn MessageServiceTrait> = Arc::new(
        MessageService::with_cache(message_repository, config.cache)
            .with_default_limit(config.messages_limit),
    );

    let target_repository = Arc::new(TargetRepository::new(pool.clone(), writer.clone()));
    target_repository
        .register_targets(&config.mirror.targets)
        .await?;
    if config.mirror.targets.is_empty() {
        tracing::warn!("No GITHUB_REPO_<n> targets configured; messages will not be mirrored");
    } else {
        for target in &config.mirror.targets {
            tracing::info!("Mirroring to target {}: {}", target.index, target.full_name());
        }
    }

    let mirror_service: Arc<dyn MirrorServiceTrait> = Arc::new(
        MirrorService::new(config.mirror.targets.clone(), client)
            .with_state_store(target_repository)
            .with_policy(config.mirror.policy)
            .with_read_timeout(config.mirror.deadline),
    );

    let chat_service = Arc::new(
        ChatService::new(message_service, mirror_service.clone())
            .with_mirror_deadline(config.mirror.deadline),
    );

    Ok(Arc::new(AppState {
        chat_service,
        mirror_service,
    }))
}
