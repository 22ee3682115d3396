//! Request and response bodies for the authentication endpoints

use chrono::{DateTime, Utc};
use resolution::models::User;
use resolution::signin::SignedIn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request for local registration
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Request for user login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    /// Username or email
    pub login: String,
    pub password: String,
}

/// Query of `/oauth/:provider/login`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthLoginQuery {
    /// Mobile deep link to send the session to after the callback
    pub redirect_uri: Option<String>,
}

/// Query the provider appends to `/oauth/:provider/callback`
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by the provider when the user declined consent
    pub error: Option<String>,
}

/// Body of `/oauth/:provider/token`
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderTokenRequest {
    pub access_token: String,
}

/// Session handed back after any successful sign-in
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub created: bool,
    pub user: User,
}

impl From<SignedIn> for AuthResponse {
    fn from(signed_in: SignedIn) -> Self {
        Self {
            token: signed_in.token,
            token_type: "Bearer",
            expires_at: signed_in.expires_at,
            created: signed_in.created,
            user: signed_in.user,
        }
    }
}

/// Payload base64url-encoded into the mobile redirect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobilePayload {
    pub token: String,
    pub user_id: Uuid,
}
