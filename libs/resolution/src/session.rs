//! Session issuer
//!
//! Stateless HS256 tokens carrying `{sub, iat, exp}`. There is no revocation
//! list; a token is good until it expires.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

/// Lifetime of an issued session, in hours
pub const SESSION_TTL_HOURS: i64 = 168;

/// Session signing configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// HMAC secret
    pub secret: String,
}

impl SessionConfig {
    /// Create a new SessionConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: HMAC signing secret (required, non-empty)
    pub fn from_env() -> Result<Self, SessionError> {
        let secret = std::env::var("JWT_SECRET")
            .ok()
            .filter(|secret| !secret.trim().is_empty())
            .ok_or_else(|| SessionError::Signing("JWT_SECRET environment variable not set".to_string()))?;

        Ok(Self { secret })
    }
}

/// Token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Issued at (unix seconds)
    pub iat: u64,
    /// Expiration (unix seconds)
    pub exp: u64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Malformed, forged or expired; callers are not told which
    #[error("invalid session token")]
    Invalid,

    #[error("session signing failed: {0}")]
    Signing(String),
}

/// A freshly signed token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl SessionIssuer {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.secret.as_bytes())
    }

    /// Sign a session for `user_id` starting now
    pub fn issue(&self, user_id: Uuid) -> Result<IssuedSession, SessionError> {
        self.issue_at(user_id, Utc::now())
    }

    /// Sign a session for `user_id` as if issued at `issued_at`
    pub fn issue_at(
        &self,
        user_id: Uuid,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedSession, SessionError> {
        let expires_at = issued_at + Duration::hours(SESSION_TTL_HOURS);
        let claims = Claims {
            sub: user_id,
            iat: unix_seconds(issued_at),
            exp: unix_seconds(expires_at),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| {
                error!("Failed to sign session token: {}", e);
                SessionError::Signing(e.to_string())
            })?;

        Ok(IssuedSession { token, expires_at })
    }

    /// Check signature and expiry and return the claims
    pub fn verify(&self, token: &str) -> Result<Claims, SessionError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Rejected session token: {}", e);
                SessionError::Invalid
            })
    }
}

fn unix_seconds(at: DateTime<Utc>) -> u64 {
    u64::try_from(at.timestamp()).unwrap_or(0)
}
