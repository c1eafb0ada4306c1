use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bookchat_core::errors::Error as CoreError;
use serde::Serialize;
use thiserror::Error;

/// Errors returned by the read endpoints as `{"error": message}`.
///
/// Store failures carry a fixed public message; the underlying error is only
/// logged. Remote failures are already free of credentials and are passed on.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadGateway(String),
    #[error("{public}")]
    Internal {
        public: &'static str,
        #[source]
        source: CoreError,
    },
}

impl ApiError {
    pub fn from_core(err: CoreError, public: &'static str) -> Self {
        match err {
            err if err.is_validation() => ApiError::BadRequest(err.to_string()),
            CoreError::NotFound(what) => ApiError::NotFound(format!("{what} does not exist")),
            CoreError::Mirror(e) => ApiError::BadGateway(e.to_string()),
            err => ApiError::Internal { public, source: err },
        }
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
            ApiError::NotFound(reason) => (StatusCode::NOT_FOUND, reason.clone()),
            ApiError::BadGateway(reason) => {
                tracing::warn!("Remote repository failed: {}", reason);
                (StatusCode::BAD_GATEWAY, reason.clone())
            }
            ApiError::Internal { public, source } => {
                tracing::error!("{}: {}", public, source);
                (StatusCode::INTERNAL_SERVER_ERROR, public.to_string())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_message();
        (status, Json(ErrorBody { error })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Same classification as [`ApiError`], rendered in the chat endpoint's
/// `{"status": "error", "message": ...}` envelope.
#[derive(Debug)]
pub struct ChatError(pub ApiError);

impl From<ApiError> for ChatError {
    fn from(err: ApiError) -> Self {
        ChatError(err)
    }
}

#[derive(Serialize)]
struct ChatErrorBody {
    status: &'static str,
    message: String,
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let (status, message) = self.0.status_and_message();
        let body = ChatErrorBody {
            status: "error",
            message,
        };
        (status, Json(body)).into_response()
    }
}

pub type ChatResult<T> = Result<T, ChatError>;
