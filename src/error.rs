//! Request-level error type shared by every HTTP handler.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors a request handler can end with.
///
/// The rendered response never includes a filesystem path: the variants that
/// carry detail only log it.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("path is outside the shared folders")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("bad request: {0}")]
    BadRequest(&'static str),

    #[error("unsupported media type")]
    UnsupportedMediaType,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Io(e) => {
                tracing::error!("request failed: {}", e);
                "internal error".to_string()
            }
            Self::Internal(detail) => {
                tracing::error!("request failed: {}", detail);
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        (status, message).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
