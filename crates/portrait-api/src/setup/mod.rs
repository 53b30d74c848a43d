//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod storage;

use crate::auth::JwtVerifier;
use crate::state::AppState;
use anyhow::{Context, Result};
use portrait_core::Config;
use portrait_db::{ProfileRepository, ReferenceRepository};
use portrait_processing::ImageValidator;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.log_format())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;
    let gateway = storage::setup_storage(&config).await?;

    let state = Arc::new(AppState {
        jwt: JwtVerifier::new(config.jwt_secret()),
        validator: ImageValidator::default(),
        profiles: Arc::new(ProfileRepository::new(pool.clone())),
        reference: Arc::new(ReferenceRepository::new(pool.clone())),
        gateway,
        db_pool: Some(pool),
        config,
    });

    let router = routes::setup_routes(&state.config, state.clone())?;

    Ok((state, router))
}
