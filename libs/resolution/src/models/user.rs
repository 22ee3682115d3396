//! User model and provider linkage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ResolutionError;

/// Third-party identity provider kinds a user can be linked to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Google,
    Facebook,
    Twitter,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Google,
        ProviderKind::Facebook,
        ProviderKind::Twitter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::Facebook => "facebook",
            ProviderKind::Twitter => "twitter",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(ProviderKind::Google),
            "facebook" => Ok(ProviderKind::Facebook),
            "twitter" => Ok(ProviderKind::Twitter),
            other => Err(ResolutionError::Validation(format!(
                "unknown identity provider: {other}"
            ))),
        }
    }
}

/// Provider account IDs linked to a user, at most one per provider kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedProviders {
    pub google_id: Option<String>,
    pub facebook_id: Option<String>,
    pub twitter_id: Option<String>,
}

impl LinkedProviders {
    pub fn get(&self, kind: ProviderKind) -> Option<&str> {
        match kind {
            ProviderKind::Google => self.google_id.as_deref(),
            ProviderKind::Facebook => self.facebook_id.as_deref(),
            ProviderKind::Twitter => self.twitter_id.as_deref(),
        }
    }

    pub fn set(&mut self, kind: ProviderKind, external_id: Option<String>) {
        let slot = match kind {
            ProviderKind::Google => &mut self.google_id,
            ProviderKind::Facebook => &mut self.facebook_id,
            ProviderKind::Twitter => &mut self.twitter_id,
        };
        *slot = external_id;
    }

    /// Build a linkage with a single provider slot filled
    pub fn single(kind: ProviderKind, external_id: impl Into<String>) -> Self {
        let mut providers = Self::default();
        providers.set(kind, Some(external_id.into()));
        providers
    }
}

/// Canonical user entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    #[serde(flatten)]
    pub providers: LinkedProviders,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Unsaved user candidate
///
/// `password_hash` is `None` when the candidate came from a provider profile;
/// the resolver fills it with the hash of a random secret before insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
    pub providers: LinkedProviders,
    pub password_hash: Option<String>,
}

/// Provider-specific profile, consumed once per resolution call
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProviderProfile {
    pub external_id: String,
    pub email: Option<String>,
    /// Whether the provider vouches that the account owns `email`
    #[serde(default)]
    pub email_verified: bool,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub avatar_url: Option<String>,
}
