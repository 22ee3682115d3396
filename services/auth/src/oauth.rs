//! OAuth2 integration for Google and Facebook
//!
//! Each configured provider gets an [`OAuthClient`] that builds the
//! authorization redirect (with PKCE), trades the returned code for an access
//! token and fetches the user profile. The clients implement
//! [`IdentityProvider`] so the sign-in flow can drive them.

use anyhow::Result;
use async_trait::async_trait;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl, basic::BasicClient,
    reqwest::async_http_client,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use resolution::error::{Collaborator, ProviderError};
use resolution::models::{ProviderKind, ProviderProfile};
use resolution::ports::IdentityProvider;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

const FACEBOOK_AUTH_URL: &str = "https://www.facebook.com/v18.0/dialog/oauth";
const FACEBOOK_TOKEN_URL: &str = "https://graph.facebook.com/v18.0/oauth/access_token";
const FACEBOOK_USERINFO_URL: &str =
    "https://graph.facebook.com/me?fields=id,email,first_name,last_name,picture.type(large)";

/// OAuth2 configuration for a provider
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub kind: ProviderKind,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    /// Create the configuration of one provider from environment variables
    ///
    /// Returns `Ok(None)` when the provider's client ID is not set, so the
    /// provider is simply not offered.
    ///
    /// # Environment Variables
    /// - `{GOOGLE,FACEBOOK}_CLIENT_ID`: OAuth client ID
    /// - `{GOOGLE,FACEBOOK}_CLIENT_SECRET`: OAuth client secret (required with the ID)
    /// - `{GOOGLE,FACEBOOK}_REDIRECT_URL`: Callback URL registered with the provider (required with the ID)
    pub fn from_env(kind: ProviderKind) -> Result<Option<Self>> {
        let (prefix, auth_url, token_url, userinfo_url, scopes) = match kind {
            ProviderKind::Google => (
                "GOOGLE",
                GOOGLE_AUTH_URL,
                GOOGLE_TOKEN_URL,
                GOOGLE_USERINFO_URL,
                &["profile", "email"],
            ),
            ProviderKind::Facebook => (
                "FACEBOOK",
                FACEBOOK_AUTH_URL,
                FACEBOOK_TOKEN_URL,
                FACEBOOK_USERINFO_URL,
                &["email", "public_profile"],
            ),
            // Twitter's v2 user endpoint exposes no email, which every
            // account needs, so there is no client for it.
            ProviderKind::Twitter => return Ok(None),
        };

        let Some(client_id) = non_empty_var(&format!("{}_CLIENT_ID", prefix)) else {
            return Ok(None);
        };
        let client_secret = non_empty_var(&format!("{}_CLIENT_SECRET", prefix))
            .ok_or_else(|| anyhow::anyhow!("{}_CLIENT_SECRET environment variable not set", prefix))?;
        let redirect_url = non_empty_var(&format!("{}_REDIRECT_URL", prefix))
            .ok_or_else(|| anyhow::anyhow!("{}_REDIRECT_URL environment variable not set", prefix))?;

        Ok(Some(Self {
            kind,
            client_id,
            client_secret,
            redirect_url,
            auth_url: auth_url.to_string(),
            token_url: token_url.to_string(),
            userinfo_url: userinfo_url.to_string(),
            scopes: scopes.iter().map(|scope| scope.to_string()).collect(),
        }))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Authorization redirect plus the secrets to keep until the callback
pub struct AuthorizationRequest {
    pub url: String,
    pub csrf_token: String,
    pub pkce_verifier: String,
}

/// OAuth2 client wrapper
#[derive(Clone)]
pub struct OAuthClient {
    kind: ProviderKind,
    client: BasicClient,
    scopes: Vec<String>,
    userinfo_url: String,
    http: reqwest::Client,
}

impl OAuthClient {
    pub fn new(config: OAuthConfig, timeout: Duration) -> Result<Self> {
        let client = BasicClient::new(
            ClientId::new(config.client_id),
            Some(ClientSecret::new(config.client_secret)),
            AuthUrl::new(config.auth_url)?,
            Some(TokenUrl::new(config.token_url)?),
        )
        .set_redirect_uri(RedirectUrl::new(config.redirect_url)?);

        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            kind: config.kind,
            client,
            scopes: config.scopes,
            userinfo_url: config.userinfo_url,
            http,
        })
    }

    /// Generate authorization URL with PKCE
    pub fn authorization_request(&self) -> AuthorizationRequest {
        info!("Generating authorization URL for {}", self.kind);

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut request = self
            .client
            .authorize_url(CsrfToken::new_random)
            .set_pkce_challenge(pkce_challenge);

        for scope in &self.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }

        let (auth_url, csrf_token) = request.url();

        AuthorizationRequest {
            url: auth_url.to_string(),
            csrf_token: csrf_token.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
        }
    }
}

#[async_trait]
impl IdentityProvider for OAuthClient {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: Option<&str>,
    ) -> Result<String, ProviderError> {
        info!("Exchanging authorization code for access token for {}", self.kind);

        let mut request = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()));
        if let Some(verifier) = pkce_verifier {
            request = request.set_pkce_verifier(PkceCodeVerifier::new(verifier.to_string()));
        }

        let token_response = request.request_async(async_http_client).await.map_err(|e| {
            error!("Token exchange with {} failed: {}", self.kind, e);
            ProviderError::upstream(Collaborator::IdentityProvider, format!("token exchange failed: {}", e))
        })?;

        Ok(token_response.access_token().secret().clone())
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, ProviderError> {
        info!("Getting user profile for {}", self.kind);

        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ProviderError::upstream(Collaborator::IdentityProvider, e))?;

        if !response.status().is_success() {
            warn!("{} userinfo answered {}", self.kind, response.status());
            return Err(ProviderError::upstream(
                Collaborator::IdentityProvider,
                format!("userinfo request failed: {}", response.status()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::upstream(Collaborator::IdentityProvider, e))?;

        parse_profile(self.kind, &body)
    }
}

/// Google `oauth2/v2/userinfo` response
#[derive(Debug, Deserialize)]
struct GoogleUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    verified_email: bool,
    given_name: Option<String>,
    family_name: Option<String>,
    picture: Option<String>,
}

/// Facebook Graph `/me` response
#[derive(Debug, Deserialize)]
struct FacebookUser {
    id: String,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    picture: Option<FacebookPicture>,
}

#[derive(Debug, Deserialize)]
struct FacebookPicture {
    data: FacebookPictureData,
}

#[derive(Debug, Deserialize)]
struct FacebookPictureData {
    url: Option<String>,
}

/// Decode a userinfo body into a provider profile
pub fn parse_profile(kind: ProviderKind, body: &str) -> Result<ProviderProfile, ProviderError> {
    let decode_error =
        |e: serde_json::Error| ProviderError::upstream(Collaborator::IdentityProvider, format!("malformed {} profile: {}", kind, e));

    match kind {
        ProviderKind::Google => {
            let user: GoogleUser = serde_json::from_str(body).map_err(decode_error)?;
            Ok(ProviderProfile {
                external_id: user.id,
                email: user.email,
                email_verified: user.verified_email,
                given_name: user.given_name,
                family_name: user.family_name,
                avatar_url: user.picture,
            })
        }
        ProviderKind::Facebook => {
            let user: FacebookUser = serde_json::from_str(body).map_err(decode_error)?;
            // Graph only returns an email once the account has confirmed it
            let email_verified = user.email.is_some();
            Ok(ProviderProfile {
                external_id: user.id,
                email: user.email,
                email_verified,
                given_name: user.first_name,
                family_name: user.last_name,
                avatar_url: user.picture.and_then(|picture| picture.data.url),
            })
        }
        ProviderKind::Twitter => Err(ProviderError::upstream(
            Collaborator::IdentityProvider,
            "twitter sign-in is not supported",
        )),
    }
}

/// Configured OAuth clients by provider
#[derive(Clone, Default)]
pub struct OAuthProviders {
    clients: HashMap<ProviderKind, Arc<OAuthClient>>,
}

impl OAuthProviders {
    /// Build a client for every provider configured in the environment
    pub fn from_env(timeout: Duration) -> Result<Self> {
        let mut clients = HashMap::new();
        for kind in ProviderKind::ALL {
            match OAuthConfig::from_env(kind)? {
                Some(config) => {
                    clients.insert(kind, Arc::new(OAuthClient::new(config, timeout)?));
                    info!("OAuth provider {} enabled", kind);
                }
                None => info!("OAuth provider {} not configured", kind),
            }
        }
        Ok(Self { clients })
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<OAuthClient>> {
        self.clients.get(&kind).cloned()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }
}
