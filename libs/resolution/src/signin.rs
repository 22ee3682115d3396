//! Sign-in flows that end in an issued session
//!
//! Provider sign-in runs exchange → profile → normalize → resolve → issue.
//! Local accounts register and log in with a password.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{Collaborator, ResolutionError, ResolutionResult};
use crate::models::{LinkedProviders, NewUser, User};
use crate::normalizer::normalize_oauth;
use crate::ports::{CredentialHasher, IdentityProvider, UserStore, bounded};
use crate::resolver::UserResolver;
use crate::session::SessionIssuer;

/// Outcome of a successful sign-in
#[derive(Debug, Clone, Serialize)]
pub struct SignedIn {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
    /// True when this sign-in created the account
    pub created: bool,
}

/// Local registration request, already validated by the transport layer
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Clone)]
pub struct SignIn {
    resolver: UserResolver,
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn CredentialHasher>,
    sessions: SessionIssuer,
    timeout: Duration,
}

impl SignIn {
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn CredentialHasher>,
        sessions: SessionIssuer,
        timeout: Duration,
    ) -> Self {
        Self {
            resolver: UserResolver::new(users.clone(), hasher.clone()),
            users,
            hasher,
            sessions,
            timeout,
        }
    }

    pub fn sessions(&self) -> &SessionIssuer {
        &self.sessions
    }

    /// Complete a provider redirect: trade the code for a token, then sign in
    pub async fn with_authorization_code(
        &self,
        provider: &dyn IdentityProvider,
        code: &str,
        pkce_verifier: Option<&str>,
    ) -> ResolutionResult<SignedIn> {
        if code.trim().is_empty() {
            return Err(ResolutionError::Validation(
                "authorization code is required".to_string(),
            ));
        }

        let access_token = bounded(
            Collaborator::IdentityProvider,
            self.timeout,
            provider.exchange_code(code, pkce_verifier),
        )
        .await?;

        self.with_access_token(provider, &access_token).await
    }

    /// Sign in with a provider access token obtained by the client
    pub async fn with_access_token(
        &self,
        provider: &dyn IdentityProvider,
        access_token: &str,
    ) -> ResolutionResult<SignedIn> {
        if access_token.trim().is_empty() {
            return Err(ResolutionError::Validation(
                "access token is required".to_string(),
            ));
        }

        let kind = provider.kind();
        let profile = bounded(
            Collaborator::IdentityProvider,
            self.timeout,
            provider.fetch_profile(access_token),
        )
        .await?;

        let candidate = normalize_oauth(profile, kind)?;
        let resolved = self.resolver.resolve_user(kind, candidate).await?;
        self.finish(resolved.user, resolved.created)
    }

    /// Create a local account and sign it in
    pub async fn register(&self, registration: Registration) -> ResolutionResult<SignedIn> {
        let email = registration.email.trim().to_lowercase();
        let username = registration.username.trim().to_string();

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(ResolutionError::Conflict("email is already registered".to_string()));
        }
        if self.users.find_by_login(&username).await?.is_some() {
            return Err(ResolutionError::Conflict("username is already taken".to_string()));
        }

        let password_hash = self.hasher.hash(&registration.password)?;
        let user = self
            .users
            .create_user(&NewUser {
                username,
                email,
                first_name: registration.first_name.trim().to_string(),
                last_name: registration.last_name.trim().to_string(),
                avatar_url: None,
                providers: LinkedProviders::default(),
                password_hash: Some(password_hash),
            })
            .await?;

        info!(user_id = %user.id, "Registered local user");
        self.finish(user, true)
    }

    /// Password login by username or email
    ///
    /// Unknown accounts and wrong passwords are indistinguishable to the
    /// caller.
    pub async fn login(&self, login: &str, password: &str) -> ResolutionResult<SignedIn> {
        let Some(user) = self.users.find_by_login(login.trim()).await? else {
            warn!("Login attempt for unknown account");
            return Err(ResolutionError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &user.password_hash)? {
            warn!(user_id = %user.id, "Login attempt with wrong password");
            return Err(ResolutionError::InvalidCredentials);
        }

        info!(user_id = %user.id, "User logged in");
        self.finish(user, false)
    }

    fn finish(&self, user: User, created: bool) -> ResolutionResult<SignedIn> {
        let session = self.sessions.issue(user.id)?;
        Ok(SignedIn {
            token: session.token,
            expires_at: session.expires_at,
            user,
            created,
        })
    }
}
