//! Collaborator interfaces the resolution engine depends on
//!
//! Persistence, vision analysis, background removal, object storage, identity
//! providers, the barcode catalog and credential hashing are all reached
//! through these traits so tests can substitute in-memory fakes.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{Collaborator, CredentialError, ProviderError, StoreError};
use crate::models::{
    Garment, NewGarment, NewUser, ProductRecord, ProviderKind, ProviderProfile, User,
    VisionAnalysis,
};

/// User persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Case-insensitive exact match on email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_by_provider(
        &self,
        kind: ProviderKind,
        external_id: &str,
    ) -> Result<Option<User>, StoreError>;
    /// Match on username or (case-insensitive) email
    async fn find_by_login(&self, login: &str) -> Result<Option<User>, StoreError>;
    /// Insert; `password_hash` must already be set
    async fn create_user(&self, user: &NewUser) -> Result<User, StoreError>;
    /// Overwrite profile, avatar and provider linkage; `NotFound` if the row is gone
    async fn update_user(&self, user: &User) -> Result<(), StoreError>;
}

/// Garment persistence as seen by the resolver
#[async_trait]
pub trait GarmentStore: Send + Sync {
    /// Insert; a duplicate barcode is reported as `StoreError::Conflict`
    async fn create_garment(&self, garment: &NewGarment) -> Result<Garment, StoreError>;
}

#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    async fn analyze(&self, image: &[u8]) -> Result<VisionAnalysis, ProviderError>;
}

#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    async fn strip_background(&self, image: &[u8]) -> Result<Vec<u8>, ProviderError>;
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` under `key` and return a publicly fetchable URL
    async fn put(&self, bytes: Vec<u8>, key: &str, content_type: &str)
    -> Result<String, ProviderError>;
}

#[async_trait]
pub trait BarcodeCatalog: Send + Sync {
    async fn lookup(&self, barcode: &str) -> Result<ProductRecord, ProviderError>;
}

/// OAuth token exchange and userinfo for one provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;
    async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: Option<&str>,
    ) -> Result<String, ProviderError>;
    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, ProviderError>;
}

/// Opaque one-way hash + compare
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, CredentialError>;
    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, CredentialError>;
}

/// Per-collaborator call budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollaboratorTimeouts {
    pub vision: Duration,
    pub background_removal: Duration,
    pub object_storage: Duration,
    pub barcode_catalog: Duration,
    pub identity_provider: Duration,
}

impl Default for CollaboratorTimeouts {
    fn default() -> Self {
        let ten_seconds = Duration::from_secs(10);
        Self {
            vision: ten_seconds,
            background_removal: ten_seconds,
            object_storage: ten_seconds,
            barcode_catalog: ten_seconds,
            identity_provider: ten_seconds,
        }
    }
}

impl CollaboratorTimeouts {
    /// Create CollaboratorTimeouts from environment variables
    ///
    /// # Environment Variables
    /// - `VISION_TIMEOUT_SECS` (default: 10)
    /// - `BACKGROUND_REMOVAL_TIMEOUT_SECS` (default: 10)
    /// - `OBJECT_STORAGE_TIMEOUT_SECS` (default: 10)
    /// - `BARCODE_TIMEOUT_SECS` (default: 10)
    /// - `OAUTH_TIMEOUT_SECS` (default: 10)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            vision: secs_from_env("VISION_TIMEOUT_SECS", defaults.vision),
            background_removal: secs_from_env(
                "BACKGROUND_REMOVAL_TIMEOUT_SECS",
                defaults.background_removal,
            ),
            object_storage: secs_from_env("OBJECT_STORAGE_TIMEOUT_SECS", defaults.object_storage),
            barcode_catalog: secs_from_env("BARCODE_TIMEOUT_SECS", defaults.barcode_catalog),
            identity_provider: secs_from_env("OAUTH_TIMEOUT_SECS", defaults.identity_provider),
        }
    }

    pub fn for_collaborator(&self, collaborator: Collaborator) -> Duration {
        match collaborator {
            Collaborator::Vision => self.vision,
            Collaborator::BackgroundRemoval => self.background_removal,
            Collaborator::ObjectStorage => self.object_storage,
            Collaborator::BarcodeCatalog => self.barcode_catalog,
            Collaborator::IdentityProvider => self.identity_provider,
        }
    }
}

fn secs_from_env(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// Run a collaborator call under a timeout
///
/// On elapse the call is dropped and reported as `ProviderError::Timeout`.
/// There is no retry.
pub async fn bounded<T, F>(collaborator: Collaborator, limit: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout {
            collaborator,
            after: limit,
        }),
    }
}
