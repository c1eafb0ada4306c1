use std::sync::Arc;

use crate::{
    config::Config,
    error::{ApiError, ApiResult, ChatResult},
    main_lib::AppState,
    models::{
        ChatRequest, ChatResponse, Commit, CommitsQuery, CommitsResponse, Message,
        MessageMirror, MessagesQuery, MessagesResponse, MirrorStatus, RepositoriesResponse,
        Repository,
    },
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::HeaderValue,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;

#[utoipa::path(get, path = "/healthz", responses((status = 200, description = "Health")))]
pub async fn healthz() -> &'static str {
    "ok"
}

/// Stores a message and mirrors it to every configured repository.
#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, body = ChatResponse),
        (status = 400, description = "Malformed body or empty message"),
        (status = 500, description = "Failed to store message"),
    )
)]
pub async fn post_chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ChatResult<Json<ChatResponse>> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let receipt = state
        .chat_service
        .post(&request.message)
        .await
        .map_err(|e| ApiError::from_core(e, "Failed to store message"))?;
    Ok(Json(ChatResponse::from(receipt)))
}

#[utoipa::path(
    get,
    path = "/messages",
    params(MessagesQuery),
    responses(
        (status = 200, body = MessagesResponse),
        (status = 400, description = "Invalid query"),
        (status = 500, description = "Failed to load messages"),
    )
)]
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    query: Result<Query<MessagesQuery>, QueryRejection>,
) -> ApiResult<Json<MessagesResponse>> {
    let Query(query) = query.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let messages = state
        .chat_service
        .history(query.limit, query.since)
        .map_err(|e| ApiError::from_core(e, "Failed to load messages"))?;
    Ok(Json(MessagesResponse {
        messages: messages.into_iter().map(Message::from).collect(),
    }))
}

#[utoipa::path(get, path = "/repositories", responses((status = 200, body = RepositoriesResponse)))]
pub async fn get_repositories(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<RepositoriesResponse>> {
    let states = state
        .mirror_service
        .target_states()
        .map_err(|e| ApiError::from_core(e, "Failed to load repositories"))?;
    Ok(Json(RepositoriesResponse {
        repositories: states.into_iter().map(Repository::from).collect(),
    }))
}

/// Reads commits back from one repository target.
#[utoipa::path(
    get,
    path = "/repositories/{index}/commits",
    params(("index" = usize, Path, description = "Target index"), CommitsQuery),
    responses(
        (status = 200, body = CommitsResponse),
        (status = 400, description = "Invalid index or query"),
        (status = 404, description = "No such target"),
        (status = 502, description = "Repository could not be read"),
    )
)]
pub async fn get_target_commits(
    State(state): State<Arc<AppState>>,
    index: Result<Path<usize>, PathRejection>,
    query: Result<Query<CommitsQuery>, QueryRejection>,
) -> ApiResult<Json<CommitsResponse>> {
    let Path(index) = index.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let Query(query) = query.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let commits = state
        .mirror_service
        .target_commits(index, &query.into())
        .await
        .map_err(|e| ApiError::from_core(e, "Failed to read commits"))?;
    Ok(Json(CommitsResponse {
        commits: commits.into_iter().map(Commit::from).collect(),
    }))
}

/// Reads commits back from every target, newest first. Unreachable targets
/// are skipped.
#[utoipa::path(
    get,
    path = "/commits",
    params(CommitsQuery),
    responses(
        (status = 200, body = CommitsResponse),
        (status = 400, description = "Invalid query"),
    )
)]
pub async fn get_commits(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CommitsQuery>, QueryRejection>,
) -> ApiResult<Json<CommitsResponse>> {
    let Query(query) = query.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let commits = state.mirror_service.all_commits(&query.into()).await;
    Ok(Json(CommitsResponse {
        commits: commits.into_iter().map(Commit::from).collect(),
    }))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        healthz,
        post_chat,
        get_messages,
        get_repositories,
        get_target_commits,
        get_commits
    ),
    components(schemas(
        ChatRequest,
        ChatResponse,
        MirrorStatus,
        Message,
        MessageMirror,
        MessagesResponse,
        Repository,
        RepositoriesResponse,
        Commit,
        CommitsResponse
    )),
    tags((name = "bookchat"))
)]
pub struct ApiDoc;

fn cors_layer(config: &Config) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.cors_allow.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }
    let origins = config
        .cors_allow
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect::<Vec<_>>();
    base.allow_origin(origins)
}

pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    let openapi = ApiDoc::openapi();

    Router::new()
        .route("/healthz", get(healthz))
        .route("/chat", post(post_chat))
        .route("/messages", get(get_messages))
        .route("/repositories", get(get_repositories))
        .route("/repositories/{index}/commits", get(get_target_commits))
        .route("/commits", get(get_commits))
        .route("/openapi.json", get(|| async { Json(openapi) }))
        .with_state(state)
        .layer(cors_layer(config))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
}
