//! Typed API errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Error kinds surfaced by the analysis node.
///
/// Every variant carries the human-readable message rendered verbatim in
/// the `{"error": …}` response body.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    ConfigMissing(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    NotVerified(String),
    #[error("{0}")]
    UpstreamOverloaded(String),
    #[error("{0}")]
    ModelUnavailable(String),
    #[error("{0}")]
    RateLimited(String),
    #[error("{0}")]
    UpstreamUnavailable(String),
    #[error("{0}")]
    Unexpected(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::ConfigMissing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound(_) | ApiError::NotVerified(_) => StatusCode::NOT_FOUND,
            ApiError::UpstreamOverloaded(_) | ApiError::ModelUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::UpstreamUnavailable(_) | ApiError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        log::warn!("request failed ({}): {}", status, self);
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
