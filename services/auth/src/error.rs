//! HTTP error type of the authentication service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use resolution::{ProviderError, ResolutionError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Too many failed attempts, try again later")]
    TooManyRequests,

    #[error("Unknown or unconfigured provider: {0}")]
    UnknownProvider(String),

    #[error("Login state is missing or expired")]
    InvalidState,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    GatewayTimeout(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) | AuthError::InvalidState => StatusCode::BAD_REQUEST,
            AuthError::Conflict(_) => StatusCode::CONFLICT,
            AuthError::InvalidCredentials | AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AuthError::UnknownProvider(_) | AuthError::NotFound(_) => StatusCode::NOT_FOUND,
            AuthError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AuthError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ResolutionError> for AuthError {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::Validation(msg) => AuthError::Validation(msg),
            ResolutionError::Conflict(msg) => AuthError::Conflict(msg),
            ResolutionError::InvalidCredentials => AuthError::InvalidCredentials,
            ResolutionError::Provider(err @ ProviderError::NotFound { .. }) => {
                AuthError::NotFound(err.to_string())
            }
            ResolutionError::Provider(err @ ProviderError::Timeout { .. }) => {
                AuthError::GatewayTimeout(err.to_string())
            }
            ResolutionError::Provider(err @ ProviderError::Upstream { .. }) => {
                AuthError::BadGateway(err.to_string())
            }
            ResolutionError::Persistence(err) => AuthError::Internal(err.to_string()),
            ResolutionError::Internal(msg) => AuthError::Internal(msg),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let AuthError::Internal(detail) = &self {
            error!("Internal error: {}", detail);
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
