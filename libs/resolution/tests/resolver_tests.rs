//! Identity and garment resolution against in-memory stores

mod common;

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use common::{FakeHasher, InMemoryGarmentStore, InMemoryUserStore, YieldingUserStore, profile};
use resolution::error::{ResolutionError, StoreError};
use resolution::models::{Category, LinkedProviders, NewGarment, ProviderKind, User};
use resolution::normalizer::normalize_oauth;
use resolution::resolver::{GarmentResolver, UserResolver};

fn existing_user(email: &str, providers: LinkedProviders) -> User {
    User {
        id: Uuid::new_v4(),
        username: email.to_string(),
        email: email.to_string(),
        first_name: "Existing".to_string(),
        last_name: String::new(),
        avatar_url: None,
        bio: None,
        providers,
        password_hash: "hashed:original".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn resolver(store: &Arc<InMemoryUserStore>) -> UserResolver {
    UserResolver::new(store.clone(), Arc::new(FakeHasher))
}

#[tokio::test]
async fn repeated_google_sign_in_resolves_to_one_user() {
    let store = Arc::new(InMemoryUserStore::default());
    let resolver = resolver(&store);
    let candidate = normalize_oauth(profile("g-1", "a@x.com", "A"), ProviderKind::Google).unwrap();

    let first = resolver
        .resolve_user(ProviderKind::Google, candidate.clone())
        .await
        .unwrap();
    let second = resolver
        .resolve_user(ProviderKind::Google, candidate)
        .await
        .unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.user.id, second.user.id);
    assert_eq!(second.user, first.user);
    assert_eq!(store.all().len(), 1);
    assert_eq!(store.update_count(), 0);
    assert_eq!(store.all()[0].providers.google_id.as_deref(), Some("g-1"));
}

#[tokio::test]
async fn concurrent_first_sign_ins_converge_on_one_user() {
    let store = Arc::new(YieldingUserStore {
        inner: InMemoryUserStore::default(),
    });
    let resolver = UserResolver::new(store.clone(), Arc::new(FakeHasher));
    let candidate = normalize_oauth(profile("g-1", "a@x.com", "A"), ProviderKind::Google).unwrap();

    let (first, second) = tokio::join!(
        resolver.resolve_user(ProviderKind::Google, candidate.clone()),
        resolver.resolve_user(ProviderKind::Google, candidate),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.user.id, second.user.id);
    assert_ne!(first.created, second.created);
    assert_eq!(store.inner.all().len(), 1);
    assert_eq!(store.inner.update_count(), 0);
}

#[tokio::test]
async fn provider_created_users_get_an_unpredictable_credential() {
    let store = Arc::new(InMemoryUserStore::default());
    let resolver = resolver(&store);

    let a = normalize_oauth(profile("g-1", "a@x.com", "A"), ProviderKind::Google).unwrap();
    let b = normalize_oauth(profile("g-2", "b@x.com", "B"), ProviderKind::Google).unwrap();
    let a = resolver.resolve_user(ProviderKind::Google, a).await.unwrap().user;
    let b = resolver.resolve_user(ProviderKind::Google, b).await.unwrap().user;

    let secret_a = a.password_hash.strip_prefix("hashed:").unwrap();
    let secret_b = b.password_hash.strip_prefix("hashed:").unwrap();
    assert_eq!(secret_a.len(), 32);
    assert_ne!(secret_a, secret_b);
}

#[tokio::test]
async fn email_match_is_case_insensitive() {
    let store = Arc::new(InMemoryUserStore::with_users(vec![existing_user(
        "A@X.com",
        LinkedProviders::default(),
    )]));
    let candidate = normalize_oauth(profile("g-1", "a@x.com", "A"), ProviderKind::Google).unwrap();

    let resolved = resolver(&store)
        .resolve_user(ProviderKind::Google, candidate)
        .await
        .unwrap();

    assert!(!resolved.created);
    assert_eq!(store.all().len(), 1);
    assert_eq!(resolved.user.providers.google_id.as_deref(), Some("g-1"));
}

#[tokio::test]
async fn existing_user_gets_second_provider_linked_and_avatar_backfilled() {
    let user = existing_user("a@x.com", LinkedProviders::single(ProviderKind::Google, "g-1"));
    let user_id = user.id;
    let store = Arc::new(InMemoryUserStore::with_users(vec![user]));

    let mut fb = profile("fb-7", "a@x.com", "A");
    fb.avatar_url = Some("https://graph.example/fb-7.jpg".to_string());
    let candidate = normalize_oauth(fb, ProviderKind::Facebook).unwrap();

    let resolved = resolver(&store)
        .resolve_user(ProviderKind::Facebook, candidate)
        .await
        .unwrap();

    assert!(!resolved.created);
    assert_eq!(resolved.user.id, user_id);
    assert_eq!(store.update_count(), 1);

    let stored = &store.all()[0];
    assert_eq!(stored.providers.google_id.as_deref(), Some("g-1"));
    assert_eq!(stored.providers.facebook_id.as_deref(), Some("fb-7"));
    assert_eq!(stored.avatar_url.as_deref(), Some("https://graph.example/fb-7.jpg"));
    // the existing credential is never replaced
    assert_eq!(stored.password_hash, "hashed:original");
}

#[tokio::test]
async fn existing_avatar_is_not_overwritten() {
    let mut user = existing_user("a@x.com", LinkedProviders::single(ProviderKind::Google, "g-1"));
    user.avatar_url = Some("https://img.example/mine.png".to_string());
    let store = Arc::new(InMemoryUserStore::with_users(vec![user]));

    let mut google = profile("g-1", "a@x.com", "A");
    google.avatar_url = Some("https://img.example/theirs.png".to_string());
    let candidate = normalize_oauth(google, ProviderKind::Google).unwrap();

    let resolved = resolver(&store)
        .resolve_user(ProviderKind::Google, candidate)
        .await
        .unwrap();

    assert_eq!(resolved.user.avatar_url.as_deref(), Some("https://img.example/mine.png"));
    assert_eq!(store.update_count(), 0);
}

#[tokio::test]
async fn provider_id_held_by_someone_else_is_a_conflict() {
    let holder = existing_user("holder@x.com", LinkedProviders::single(ProviderKind::Google, "g-1"));
    let other = existing_user("other@x.com", LinkedProviders::default());
    let store = Arc::new(InMemoryUserStore::with_users(vec![holder, other]));
    let resolver = resolver(&store);

    // existing account trying to claim the id
    let candidate =
        normalize_oauth(profile("g-1", "other@x.com", "O"), ProviderKind::Google).unwrap();
    let err = resolver
        .resolve_user(ProviderKind::Google, candidate)
        .await
        .unwrap_err();
    assert!(matches!(err, ResolutionError::Conflict(_)));

    // brand-new account trying to claim the id
    let candidate = normalize_oauth(profile("g-1", "new@x.com", "N"), ProviderKind::Google).unwrap();
    let err = resolver
        .resolve_user(ProviderKind::Google, candidate)
        .await
        .unwrap_err();
    assert!(matches!(err, ResolutionError::Conflict(_)));

    assert_eq!(store.all().len(), 2);
    assert_eq!(store.update_count(), 0);
}

#[tokio::test]
async fn barcode_garment_is_verified_and_duplicate_barcode_conflicts() {
    let store = Arc::new(InMemoryGarmentStore::default());
    let resolver = GarmentResolver::new(store.clone());
    let owner = Uuid::new_v4();

    let mut scanned = NewGarment::new(owner, "Levi's 501");
    scanned.category = Category::Bottom;
    scanned.barcode = Some("0123456789012".to_string());
    scanned.is_verified = true;

    let garment = resolver.resolve_garment(scanned.clone()).await.unwrap();
    assert!(garment.is_verified);
    assert_eq!(garment.id, scanned.id);

    let mut again = scanned;
    again.id = Uuid::new_v4();
    let err = resolver.resolve_garment(again).await.unwrap_err();
    assert!(matches!(err, ResolutionError::Conflict(_)));
    assert_eq!(store.all().len(), 1);
}

#[tokio::test]
async fn manual_garment_without_barcode_is_unverified() {
    let store = Arc::new(InMemoryGarmentStore::default());
    let garment = GarmentResolver::new(store.clone())
        .resolve_garment(NewGarment::new(Uuid::new_v4(), "Grey hoodie"))
        .await
        .unwrap();

    assert!(!garment.is_verified);
    assert!(garment.barcode.is_none());
}

#[tokio::test]
async fn backend_failure_is_a_persistence_error() {
    let store = Arc::new(InMemoryGarmentStore::default());
    store.fail_next_with(StoreError::Backend("connection reset".to_string()));

    let err = GarmentResolver::new(store)
        .resolve_garment(NewGarment::new(Uuid::new_v4(), "Scarf"))
        .await
        .unwrap_err();

    assert!(matches!(err, ResolutionError::Persistence(StoreError::Backend(_))));
}
