//! Authentication service routes

use std::sync::Arc;

use anyhow::Result;
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE};
use resolution::{Registration, ResolutionError, models::ProviderKind};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    AppState,
    error::AuthError,
    middleware::auth_middleware,
    models::{
        AuthResponse, LoginRequest, MobilePayload, OAuthCallbackQuery, OAuthLoginQuery,
        ProviderTokenRequest, RegisterRequest,
    },
    oauth::OAuthClient,
    state_store::PendingLogin,
    validation::{validate_redirect_uri, validate_registration},
};

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/me", get(me))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/oauth/:provider/login", get(oauth_login))
        .route("/oauth/:provider/callback", get(oauth_callback))
        .route("/oauth/:provider/token", post(oauth_token))
        .merge(protected)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

/// Local registration endpoint
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    validate_registration(&payload).map_err(AuthError::Validation)?;

    let signed_in = state
        .sign_in
        .register(Registration {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
        })
        .await?;

    info!(user_id = %signed_in.user.id, "Registered local account");
    Ok((StatusCode::CREATED, Json(AuthResponse::from(signed_in))))
}

/// Local login endpoint, rate limited per login name
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let login = payload.login.trim();
    let key = login.to_lowercase();
    if key.is_empty() || payload.password.is_empty() {
        return Err(AuthError::Validation(
            "login and password are required".to_string(),
        ));
    }

    if !state.rate_limiter.is_allowed(&key).await {
        warn!("Login blocked by rate limiter for {}", key);
        return Err(AuthError::TooManyRequests);
    }

    match state.sign_in.login(login, &payload.password).await {
        Ok(signed_in) => {
            state.rate_limiter.reset(&key).await;
            Ok((StatusCode::OK, Json(AuthResponse::from(signed_in))))
        }
        Err(ResolutionError::InvalidCredentials) => {
            state.rate_limiter.record_failure(&key).await;
            Err(AuthError::InvalidCredentials)
        }
        Err(e) => Err(e.into()),
    }
}

/// Current user endpoint
pub async fn me(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AuthError> {
    let user = state
        .users
        .find_by_id(user_id)
        .await
        .map_err(ResolutionError::from)?
        .ok_or_else(|| AuthError::NotFound("user not found".to_string()))?;

    Ok(Json(user))
}

/// Start the provider redirect flow
pub async fn oauth_login(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<OAuthLoginQuery>,
) -> Result<impl IntoResponse, AuthError> {
    let (kind, client) = configured_provider(&state, &provider)?;

    let redirect_uri = match query.redirect_uri.as_deref() {
        Some(uri) => Some(
            validate_redirect_uri(uri)
                .map_err(AuthError::Validation)?
                .to_string(),
        ),
        None => None,
    };

    let request = client.authorization_request();
    let pending = PendingLogin {
        provider: kind,
        pkce_verifier: request.pkce_verifier,
        redirect_uri,
    };

    state
        .login_states
        .save(&request.csrf_token, &pending)
        .await
        .map_err(|e| {
            error!("Failed to store login state: {}", e);
            AuthError::Internal(e.to_string())
        })?;

    Ok(Redirect::to(&request.url))
}

/// Provider redirect target
pub async fn oauth_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Result<Response, AuthError> {
    if let Some(reason) = query.error {
        return Err(AuthError::Validation(format!(
            "provider denied access: {reason}"
        )));
    }

    let (kind, client) = configured_provider(&state, &provider)?;

    let code = query
        .code
        .ok_or_else(|| AuthError::Validation("authorization code is required".to_string()))?;
    let csrf_state = query.state.ok_or(AuthError::InvalidState)?;

    let pending = state
        .login_states
        .take(&csrf_state)
        .await
        .map_err(|e| {
            error!("Failed to load login state: {}", e);
            AuthError::Internal(e.to_string())
        })?
        .ok_or(AuthError::InvalidState)?;

    if pending.provider != kind {
        warn!(
            "Login state for {} presented to {} callback",
            pending.provider, kind
        );
        return Err(AuthError::InvalidState);
    }

    let signed_in = state
        .sign_in
        .with_authorization_code(client.as_ref(), &code, Some(&pending.pkce_verifier))
        .await?;

    info!(user_id = %signed_in.user.id, provider = %kind, "Provider sign-in completed");

    match pending.redirect_uri {
        Some(redirect_uri) => {
            let payload = MobilePayload {
                token: signed_in.token,
                user_id: signed_in.user.id,
            };
            let target = mobile_redirect_url(&redirect_uri, &payload)
                .map_err(|e| AuthError::Internal(e.to_string()))?;
            Ok(Redirect::to(&target).into_response())
        }
        None => Ok(Json(AuthResponse::from(signed_in)).into_response()),
    }
}

/// Sign in with an access token obtained by a mobile provider SDK
pub async fn oauth_token(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Json(payload): Json<ProviderTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let (_, client) = configured_provider(&state, &provider)?;

    let signed_in = state
        .sign_in
        .with_access_token(client.as_ref(), &payload.access_token)
        .await?;

    Ok(Json(AuthResponse::from(signed_in)))
}

fn configured_provider(
    state: &AppState,
    provider: &str,
) -> Result<(ProviderKind, Arc<OAuthClient>), AuthError> {
    let kind: ProviderKind = provider
        .parse()
        .map_err(|_| AuthError::UnknownProvider(provider.to_string()))?;
    let client = state
        .providers
        .get(kind)
        .ok_or_else(|| AuthError::UnknownProvider(provider.to_string()))?;
    Ok((kind, client))
}

/// Append the base64url-encoded session to a mobile deep link
pub fn mobile_redirect_url(redirect_uri: &str, payload: &MobilePayload) -> Result<String> {
    let encoded = URL_SAFE.encode(serde_json::to_vec(payload)?);
    let separator = if redirect_uri.contains('?') { '&' } else { '?' };
    Ok(format!("{redirect_uri}{separator}data={encoded}"))
}
