use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod error;
mod middleware;
mod models;
mod oauth;
mod password;
mod rate_limiter;
mod repositories;
mod routes;
mod state_store;
mod validation;

use common::{cache, database};
use resolution::{CollaboratorTimeouts, SessionConfig, SessionIssuer, SignIn, ports::UserStore};

use crate::{
    oauth::OAuthProviders,
    password::Argon2Hasher,
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::UserRepository,
    state_store::LoginStateStore,
};

/// Seconds a started provider login may take before its state expires
const LOGIN_STATE_TTL_SECONDS: u64 = 600;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sign_in: SignIn,
    pub users: Arc<dyn UserStore>,
    pub providers: OAuthProviders,
    pub login_states: LoginStateStore,
    pub rate_limiter: RateLimiter,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting authentication service");

    // Initialize database connection pool
    let db_config = database::DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    // Check database connectivity
    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    database::run_migrations(&pool).await?;

    // Initialize Redis connection pool
    let redis_config = cache::RedisConfig::from_env()?;
    let redis_pool = cache::RedisPool::new(&redis_config).await?;

    let session_config = SessionConfig::from_env()?;
    let timeouts = CollaboratorTimeouts::from_env();

    let users: Arc<dyn UserStore> = Arc::new(UserRepository::new(pool));
    let sign_in = SignIn::new(
        users.clone(),
        Arc::new(Argon2Hasher),
        SessionIssuer::from_config(&session_config),
        timeouts.identity_provider,
    );
    let providers = OAuthProviders::from_env(timeouts.identity_provider)?;
    info!("{} OAuth provider(s) configured", providers.len());

    let app_state = AppState {
        sign_in,
        users,
        providers,
        login_states: LoginStateStore::new(redis_pool, LOGIN_STATE_TTL_SECONDS),
        rate_limiter: RateLimiter::new(RateLimiterConfig::from_env()),
    };

    info!("Authentication service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let bind_addr = std::env::var("AUTH_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Authentication service listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
