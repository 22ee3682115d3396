//! Middleware for session token validation

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use tracing::debug;

use crate::{AppState, error::AuthError};

/// Validate the bearer session token
///
/// On success the user id is inserted into the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AuthError::Unauthorized)?;

    let claims = state.sign_in.sessions().verify(bearer.token()).map_err(|e| {
        debug!("Rejected session token: {}", e);
        AuthError::Unauthorized
    })?;

    req.extensions_mut().insert(claims.sub);

    Ok(next.run(req).await)
}
