//! Storage backend and gateway setup

use anyhow::{Context, Result};
use portrait_core::Config;
use portrait_storage::{create_storage, ObjectStorageGateway};
use std::sync::Arc;

/// Build the configured backend and wrap it in the gateway for the public URL space.
pub async fn setup_storage(config: &Config) -> Result<Arc<ObjectStorageGateway>> {
    let storage = create_storage(config)
        .await
        .context("Failed to initialize storage backend")?;

    let gateway = ObjectStorageGateway::new(storage, config.public_base_url())
        .context("Invalid public storage URL")?;

    match gateway.public_base_url() {
        Some(base) => tracing::info!(
            backend = %gateway.backend_type(),
            bucket = config.s3_bucket().unwrap_or("-"),
            public_base_url = %base,
            environment = %config.environment(),
            "Storage initialized"
        ),
        None => tracing::warn!(
            backend = %gateway.backend_type(),
            environment = %config.environment(),
            "No public storage URL configured; uploads will fail"
        ),
    }

    Ok(Arc::new(gateway))
}
