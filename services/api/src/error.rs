//! Custom error types for the API service

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use resolution::{ProviderError, ResolutionError, StoreError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Unauthorized access
    #[error("Unauthorized")]
    Unauthorized,

    /// Bad request with message
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// An upstream collaborator failed
    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    GatewayTimeout(String),

    /// Internal server error; the detail is logged, never returned
    #[error("Internal server error")]
    InternalServerError(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn garment_not_found() -> Self {
        ApiError::NotFound("Garment not found".to_string())
    }
}

impl From<ResolutionError> for ApiError {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::Validation(msg) => ApiError::BadRequest(msg),
            ResolutionError::Conflict(msg) => ApiError::Conflict(msg),
            ResolutionError::InvalidCredentials => ApiError::Unauthorized,
            ResolutionError::Provider(err @ ProviderError::NotFound { .. }) => {
                ApiError::NotFound(err.to_string())
            }
            ResolutionError::Provider(err @ ProviderError::Timeout { .. }) => {
                ApiError::GatewayTimeout(err.to_string())
            }
            ResolutionError::Provider(err @ ProviderError::Upstream { .. }) => {
                ApiError::BadGateway(err.to_string())
            }
            ResolutionError::Persistence(err) => ApiError::InternalServerError(err.to_string()),
            ResolutionError::Internal(msg) => ApiError::InternalServerError(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ResolutionError::from(err).into()
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::InternalServerError(detail) = &self {
            error!("Internal error: {}", detail);
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
