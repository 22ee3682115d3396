//! In-memory collaborators shared by the integration suites

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

use resolution::error::{Collaborator, CredentialError, ProviderError, StoreError};
use resolution::models::{
    Garment, NewGarment, NewUser, ProductRecord, ProviderKind, ProviderProfile, User,
    VisionAnalysis,
};
use resolution::ports::{
    BackgroundRemover, BarcodeCatalog, CredentialHasher, GarmentStore, IdentityProvider,
    ObjectStorage, UserStore, VisionAnalyzer,
};

#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<Vec<User>>,
    updates: AtomicUsize,
}

impl InMemoryUserStore {
    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users: Mutex::new(users),
            updates: AtomicUsize::new(0),
        }
    }

    pub fn all(&self) -> Vec<User> {
        self.users.lock().unwrap().clone()
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.id == id)
            .cloned())
    }

    async fn find_by_provider(
        &self,
        kind: ProviderKind,
        external_id: &str,
    ) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.providers.get(kind) == Some(external_id))
            .cloned())
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.username == login || user.email.eq_ignore_ascii_case(login))
            .cloned())
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users
            .iter()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::Conflict("email".to_string()));
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            avatar_url: user.avatar_url.clone(),
            bio: None,
            providers: user.providers.clone(),
            password_hash: user.password_hash.clone().unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        let slot = users
            .iter_mut()
            .find(|existing| existing.id == user.id)
            .ok_or(StoreError::NotFound)?;
        *slot = user.clone();
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// User store that gives up the executor right after each email lookup,
/// letting a concurrent caller observe the same empty result
pub struct YieldingUserStore {
    pub inner: InMemoryUserStore,
}

#[async_trait]
impl UserStore for YieldingUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let found = self.inner.find_by_email(email).await;
        tokio::task::yield_now().await;
        found
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_provider(
        &self,
        kind: ProviderKind,
        external_id: &str,
    ) -> Result<Option<User>, StoreError> {
        self.inner.find_by_provider(kind, external_id).await
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<User>, StoreError> {
        self.inner.find_by_login(login).await
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, StoreError> {
        self.inner.create_user(user).await
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        self.inner.update_user(user).await
    }
}

/// Garment store enforcing barcode uniqueness like the real schema
#[derive(Default)]
pub struct InMemoryGarmentStore {
    garments: Mutex<Vec<Garment>>,
    fail_with: Mutex<Option<StoreError>>,
}

impl InMemoryGarmentStore {
    pub fn all(&self) -> Vec<Garment> {
        self.garments.lock().unwrap().clone()
    }

    pub fn fail_next_with(&self, err: StoreError) {
        *self.fail_with.lock().unwrap() = Some(err);
    }
}

#[async_trait]
impl GarmentStore for InMemoryGarmentStore {
    async fn create_garment(&self, garment: &NewGarment) -> Result<Garment, StoreError> {
        if let Some(err) = self.fail_with.lock().unwrap().take() {
            return Err(err);
        }

        let mut garments = self.garments.lock().unwrap();
        if let Some(barcode) = garment.barcode.as_deref() {
            if garments
                .iter()
                .any(|existing| existing.barcode.as_deref() == Some(barcode))
            {
                return Err(StoreError::Conflict(format!("barcode {barcode}")));
            }
        }

        let now = Utc::now();
        let stored = Garment {
            id: garment.id,
            owner_id: garment.owner_id,
            name: garment.name.clone(),
            category: garment.category,
            color: garment.color.clone(),
            labels: garment.labels.clone(),
            brand: garment.brand.clone(),
            size: garment.size.clone(),
            image_url: garment.image_url.clone(),
            barcode: garment.barcode.clone(),
            is_verified: garment.is_verified,
            created_at: now,
            updated_at: now,
        };
        garments.push(stored.clone());
        Ok(stored)
    }
}

pub struct FakeVision {
    pub result: Mutex<Option<Result<VisionAnalysis, ProviderError>>>,
}

impl FakeVision {
    pub fn returning(analysis: VisionAnalysis) -> Self {
        Self {
            result: Mutex::new(Some(Ok(analysis))),
        }
    }

    pub fn failing(err: ProviderError) -> Self {
        Self {
            result: Mutex::new(Some(Err(err))),
        }
    }
}

#[async_trait]
impl VisionAnalyzer for FakeVision {
    async fn analyze(&self, _image: &[u8]) -> Result<VisionAnalysis, ProviderError> {
        self.result
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(VisionAnalysis::default()))
    }
}

pub enum BackgroundBehavior {
    Strip(Vec<u8>),
    Fail,
    Hang,
}

pub struct FakeBackground {
    pub behavior: BackgroundBehavior,
}

#[async_trait]
impl BackgroundRemover for FakeBackground {
    async fn strip_background(&self, _image: &[u8]) -> Result<Vec<u8>, ProviderError> {
        match &self.behavior {
            BackgroundBehavior::Strip(bytes) => Ok(bytes.clone()),
            BackgroundBehavior::Fail => Err(ProviderError::upstream(
                Collaborator::BackgroundRemoval,
                "503 Service Unavailable",
            )),
            BackgroundBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }
    }
}

/// Object storage that remembers what was put where
#[derive(Default)]
pub struct FakeStorage {
    pub objects: Mutex<Vec<(String, Vec<u8>, String)>>,
}

impl FakeStorage {
    pub fn objects(&self) -> Vec<(String, Vec<u8>, String)> {
        self.objects.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn put(
        &self,
        bytes: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> Result<String, ProviderError> {
        self.objects
            .lock()
            .unwrap()
            .push((key.to_string(), bytes, content_type.to_string()));
        Ok(format!("https://storage.test/{key}"))
    }
}

#[derive(Default)]
pub struct FakeCatalog {
    pub products: Vec<ProductRecord>,
}

#[async_trait]
impl BarcodeCatalog for FakeCatalog {
    async fn lookup(&self, barcode: &str) -> Result<ProductRecord, ProviderError> {
        self.products
            .iter()
            .find(|product| product.barcode == barcode)
            .cloned()
            .ok_or_else(|| ProviderError::not_found(Collaborator::BarcodeCatalog, barcode))
    }
}

/// Reversible stand-in for a real password hash
pub struct FakeHasher;

impl CredentialHasher for FakeHasher {
    fn hash(&self, plaintext: &str) -> Result<String, CredentialError> {
        Ok(format!("hashed:{plaintext}"))
    }

    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, CredentialError> {
        Ok(hash == format!("hashed:{plaintext}"))
    }
}

pub struct FakeProvider {
    pub kind: ProviderKind,
    pub profile: ProviderProfile,
    pub code: String,
    pub exchanges: AtomicUsize,
}

impl FakeProvider {
    pub fn google(profile: ProviderProfile) -> Self {
        Self {
            kind: ProviderKind::Google,
            profile,
            code: "good-code".to_string(),
            exchanges: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn exchange_code(
        &self,
        code: &str,
        _pkce_verifier: Option<&str>,
    ) -> Result<String, ProviderError> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        if code == self.code {
            Ok("access-token".to_string())
        } else {
            Err(ProviderError::upstream(
                Collaborator::IdentityProvider,
                "invalid_grant",
            ))
        }
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, ProviderError> {
        if access_token == "access-token" {
            Ok(self.profile.clone())
        } else {
            Err(ProviderError::upstream(
                Collaborator::IdentityProvider,
                "401 Unauthorized",
            ))
        }
    }
}

pub fn profile(id: &str, email: &str, given_name: &str) -> ProviderProfile {
    ProviderProfile {
        external_id: id.to_string(),
        email: Some(email.to_string()),
        email_verified: true,
        given_name: Some(given_name.to_string()),
        family_name: None,
        avatar_url: None,
    }
}
