use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{analysis::AnalysisError, models::ErrorBody};

/// ApiError
///
/// Every failure a handler can surface. Rendered as `{ "error": "..." }` with the
/// status from [`ApiError::status`].
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required query or body parameter is absent or empty.
    #[error("{0} is required")]
    MissingParameter(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error("authentication required")]
    Unauthorized,
    #[error("this role cannot access the requested resource")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0} already exists")]
    Conflict(&'static str),
    #[error("analysis service unavailable")]
    Upstream(#[from] AnalysisError),
    #[error("internal storage error")]
    Storage,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingParameter(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Upstream(source) = &self {
            // Keep upstream details in the logs; clients only see the generic message.
            tracing::error!(error = %source, "analysis request failed");
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
