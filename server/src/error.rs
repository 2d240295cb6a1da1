use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Errors returned by HTTP handlers
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] reelsim_core::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use reelsim_core::Error as CoreError;
        let status = match &self {
            ApiError::Core(CoreError::NotFound(_)) | ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            // caller mistakes; anything else from core is a broken model or I/O
            ApiError::Core(e) if e.is_recoverable() => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Core(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
