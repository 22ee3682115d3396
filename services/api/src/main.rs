use anyhow::Result;
use aws_config::BehaviorVersion;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod error;
mod middleware;
mod models;
mod providers;
mod repositories;
mod routes;
mod state;

use common::database::{self, DatabaseConfig, init_pool};
use resolution::{
    Collaborators, CollaboratorTimeouts, IngestionPipeline, SessionConfig, SessionIssuer, Taxonomy,
};

use crate::{
    providers::{
        BackgroundRemovalClient, BarcodeLookupClient, GoogleVision, S3Storage, StorageConfig,
        VisionConfig,
    },
    repositories::GarmentRepository,
    state::AppState,
};

/// Wire the external adapters and the garment store into the ingestion pipeline
pub fn build_pipeline(
    garments: GarmentRepository,
    s3_client: aws_sdk_s3::Client,
    timeouts: CollaboratorTimeouts,
) -> Result<IngestionPipeline> {
    let collaborators = Collaborators {
        vision: Arc::new(GoogleVision::new(VisionConfig::from_env(), timeouts.vision)?),
        background: Arc::new(BackgroundRemovalClient::from_env(timeouts.background_removal)?),
        storage: Arc::new(S3Storage::new(s3_client, StorageConfig::from_env())),
        catalog: Arc::new(BarcodeLookupClient::from_env(timeouts.barcode_catalog)?),
        garments: Arc::new(garments),
    };

    Ok(IngestionPipeline::new(
        collaborators,
        Arc::new(Taxonomy::vision()),
        Arc::new(Taxonomy::catalog()),
        timeouts,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting API service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    database::run_migrations(&pool).await?;

    // Initialize AWS S3 client
    let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let s3_client = aws_sdk_s3::Client::new(&aws_config);

    let timeouts = CollaboratorTimeouts::from_env();
    let garments = GarmentRepository::new(pool);
    let pipeline = build_pipeline(garments.clone(), s3_client, timeouts)?;

    let session_config = SessionConfig::from_env()?;

    let app_state = AppState {
        pipeline,
        garments,
        sessions: SessionIssuer::from_config(&session_config),
    };

    info!("API service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let bind_addr = std::env::var("API_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("API service listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
